//! Terminal implementation of `orch_core::HumanReviewSource`. Prints each
//! variable flagged `human_decision_required` with its offered options,
//! reads a line from stdin per variable, and lets the operator approve,
//! approve-with-changes, or reject the draft with free-text comments.
//!
//! Grounded on the teacher's `comfy-table`-based summary rendering
//! (`sdtm-cli::summary`) for how findings are listed to an operator; the
//! prompt loop itself is plain `std::io` since the stack carries no
//! interactive-prompt crate.

use std::io::{self, BufRead, Write};

use orch_agents::{HumanDecisionInput, ReviewVerdict};
use orch_core::{HumanReviewSource, HumanReviewSubmission};
use orch_model::SpecDocument;

pub struct TerminalReview;

impl HumanReviewSource for TerminalReview {
    fn collect(&self, spec: &SpecDocument) -> HumanReviewSubmission {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        let decision_required: Vec<_> = spec.variables.iter().filter(|v| v.human_decision_required).collect();

        println!(
            "\nDraft spec for {}/{} has {} variable(s) awaiting a decision:",
            spec.study_id,
            spec.domain,
            decision_required.len()
        );

        let mut decisions = Vec::new();
        for variable in decision_required {
            println!("\n  {} ({})", variable.target_variable, variable.mapping_logic);
            for option in &variable.decision_options {
                println!("    [{}] {}", option.id, option.description);
                for pro in &option.pros {
                    println!("        + {pro}");
                }
                for con in &option.cons {
                    println!("        - {con}");
                }
            }
            print!("    choose an option id, or type free text, then Enter: ");
            let _ = io::stdout().flush();
            let line = lines.next().and_then(Result::ok).unwrap_or_default();
            let trimmed = line.trim();
            let is_listed = variable.decision_options.iter().any(|o| o.id == trimmed);
            decisions.push(HumanDecisionInput {
                variable: variable.target_variable.clone(),
                option_id: is_listed.then(|| trimmed.to_string()),
                rationale: if trimmed.is_empty() {
                    "accepted default".to_string()
                } else {
                    trimmed.to_string()
                },
            });
        }

        print!("\nApprove this spec? [y]es / [c]hanges / [n]o: ");
        let _ = io::stdout().flush();
        let verdict_line = lines.next().and_then(Result::ok).unwrap_or_default();
        let verdict = match verdict_line.trim().to_lowercase().as_str() {
            "n" | "no" => {
                print!("    rejection comments, one per line, blank line to finish:\n");
                let mut comments = Vec::new();
                loop {
                    print!("    > ");
                    let _ = io::stdout().flush();
                    let comment = lines.next().and_then(Result::ok).unwrap_or_default();
                    if comment.trim().is_empty() {
                        break;
                    }
                    comments.push(comment.trim().to_string());
                }
                ReviewVerdict::Reject { comments }
            }
            "c" | "changes" => ReviewVerdict::ApproveWithChanges,
            _ => ReviewVerdict::Approve,
        };

        HumanReviewSubmission { verdict, decisions }
    }
}
