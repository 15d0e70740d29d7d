//! Renders a finished or checkpointed [`PipelineState`] as a table,
//! grounded on the teacher's `sdtm-cli::summary` table styling.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use orch_model::{PipelineState, Stage, StageStatus};

pub fn print_state(state: &PipelineState) {
    println!("\nStudy {} / domain {}", state.study_id, state.domain);
    println!("Current stage: {:?}", state.current_phase);
    println!("Spec status:   {:?}", state.spec_status);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).apply_modifier(UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![header_cell("Stage"), header_cell("Status")]);

    for stage in Stage::sequence() {
        let status = stage_status(state, *stage);
        table.add_row(vec![Cell::new(format!("{stage:?}")), status_cell(status)]);
    }
    println!("{table}");

    if !state.artifacts.is_empty() {
        let mut artifacts = Table::new();
        artifacts
            .load_preset(UTF8_FULL_CONDENSED)
            .apply_modifier(UTF8_ROUND_CORNERS);
        artifacts.set_content_arrangement(ContentArrangement::Dynamic);
        artifacts.set_header(vec![header_cell("Artifact"), header_cell("Path")]);
        for (role, path) in &state.artifacts {
            artifacts.add_row(vec![Cell::new(role), Cell::new(path)]);
        }
        println!("{artifacts}");
    }

    if !state.error_log.is_empty() {
        let mut errors = Table::new();
        errors.load_preset(UTF8_FULL_CONDENSED).apply_modifier(UTF8_ROUND_CORNERS);
        errors.set_content_arrangement(ContentArrangement::Dynamic);
        errors.set_header(vec![
            header_cell("Stage"),
            header_cell("Kind"),
            header_cell("Message"),
        ]);
        for record in &state.error_log {
            errors.add_row(vec![
                Cell::new(format!("{:?}", record.stage)),
                Cell::new(format!("{:?}", record.kind)),
                Cell::new(&record.message).fg(Color::Red),
            ]);
        }
        println!("{errors}");
    }
}

fn stage_status(state: &PipelineState, stage: Stage) -> StageStatus {
    match stage {
        Stage::Production => return state.production_status,
        Stage::Qc => return state.qc_status,
        Stage::Validation => return state.validation_status,
        _ => {}
    }
    if state.current_phase == Stage::Complete || stage < state.current_phase {
        StageStatus::Succeeded
    } else if stage == state.current_phase {
        StageStatus::InProgress
    } else {
        StageStatus::NotStarted
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).fg(Color::Cyan).add_attribute(Attribute::Bold)
}

fn status_cell(status: StageStatus) -> Cell {
    match status {
        StageStatus::Succeeded => Cell::new("ok").fg(Color::Green),
        StageStatus::InProgress => Cell::new("in progress").fg(Color::Yellow),
        StageStatus::Failed => Cell::new("failed").fg(Color::Red).add_attribute(Attribute::Bold),
        StageStatus::NotStarted => Cell::new("-").fg(Color::DarkGrey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_model::ids::{DomainCode, StudyId};

    fn state_at(phase: Stage) -> PipelineState {
        let mut state = PipelineState::new(StudyId::new("S1").unwrap(), DomainCode::new("DM").unwrap(), chrono::Utc::now());
        state.current_phase = phase;
        state
    }

    #[test]
    fn stages_before_the_current_one_are_succeeded() {
        let state = state_at(Stage::HumanReview);
        assert_eq!(stage_status(&state, Stage::SpecBuilding), StageStatus::Succeeded);
        assert_eq!(stage_status(&state, Stage::SpecReview), StageStatus::Succeeded);
    }

    #[test]
    fn the_current_stage_is_in_progress() {
        let state = state_at(Stage::HumanReview);
        assert_eq!(stage_status(&state, Stage::HumanReview), StageStatus::InProgress);
    }

    #[test]
    fn stages_after_the_current_one_have_not_started() {
        let state = state_at(Stage::HumanReview);
        assert_eq!(stage_status(&state, Stage::Production), StageStatus::NotStarted);
    }

    #[test]
    fn production_qc_and_validation_report_their_own_dedicated_status_regardless_of_phase() {
        let mut state = state_at(Stage::Qc);
        state.production_status = StageStatus::Failed;
        state.qc_status = StageStatus::InProgress;
        state.validation_status = StageStatus::NotStarted;
        assert_eq!(stage_status(&state, Stage::Production), StageStatus::Failed);
        assert_eq!(stage_status(&state, Stage::Qc), StageStatus::InProgress);
        assert_eq!(stage_status(&state, Stage::Validation), StageStatus::NotStarted);
    }

    #[test]
    fn every_stage_is_succeeded_once_the_pipeline_is_complete() {
        let state = state_at(Stage::Complete);
        assert_eq!(stage_status(&state, Stage::SpecBuilding), StageStatus::Succeeded);
        assert_eq!(stage_status(&state, Stage::Validation), state.validation_status);
    }
}
