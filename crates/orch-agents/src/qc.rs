//! QC-programmer agent (`SPEC_FULL.md` §4.4.5): independently implements
//! the same approved spec as the production-programmer agent, under the
//! P9 independence invariant — its [`ContextPack`] is built by
//! [`ContextPack::for_qc`], whose signature has no parameter a
//! production artifact path could flow through. The resulting dataset
//! must share column names/types/lengths and row identity with
//! production's output; it is never the same script.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::Command;

use orch_llm::{CompletionKind, CompletionRequest, LlmClient};
use orch_model::SpecDocument;
use orch_registry::FunctionRegistry;

use crate::agent::Agent;
use crate::context::ContextPack;
use crate::error::{AgentError, Result};
use crate::production::GeneratedDataset;

pub struct QcProgrammerAgent<'a> {
    pub llm: &'a LlmClient,
    pub registry: &'a FunctionRegistry,
    pub ctx: &'a ContextPack,
    pub spec: &'a SpecDocument,
    pub python_interpreter: &'a str,
}

impl QcProgrammerAgent<'_> {
    fn script_path(&self) -> PathBuf {
        self.ctx.study_root.join(&self.ctx.domain).join("qc.py")
    }

    fn output_path(&self) -> PathBuf {
        self.ctx.study_root.join(&self.ctx.domain).join("qc.parquet")
    }

    fn build_prompt(&self) -> CompletionRequest {
        let mut user_prompt = String::new();
        let _ = writeln!(user_prompt, "Domain: {}", self.ctx.domain);
        let _ = writeln!(user_prompt, "Function registry:\n{}", self.ctx.registry_catalog);
        let _ = writeln!(user_prompt, "Approved variables:");
        for variable in &self.spec.variables {
            let _ = writeln!(
                user_prompt,
                "- {} <- {:?} via {:?} params {:?}",
                variable.target_variable, variable.source_variable, variable.macro_used, variable.function_parameters
            );
        }
        if let Ok(order) = self.registry.topological_order() {
            let _ = writeln!(user_prompt, "Apply registered functions in this order: {order:?}");
        }
        if let Some(report) = &self.ctx.previous_mismatch_report {
            let _ = writeln!(
                user_prompt,
                "A prior comparison against production disagreed on these columns: {:?}",
                report.column_diffs.iter().map(|d| d.column.clone()).collect::<Vec<_>>()
            );
        }
        CompletionRequest {
            domain: self.ctx.domain.clone(),
            kind: CompletionKind::QcScript,
            system_prompt: "Independently write a standalone Python script that reads the raw \
                 CSV data and applies the approved mapping spec using the registered functions, \
                 producing a parquet file with the same column names, types, lengths and row \
                 identity as any correct implementation. Do not assume access to any other \
                 implementation of this spec."
                .to_string(),
            user_prompt,
        }
    }

    fn execute(&self, script_path: &std::path::Path, output_path: &std::path::Path) -> Result<()> {
        let result = Command::new(self.python_interpreter)
            .arg(script_path)
            .arg(&self.ctx.raw_data_root)
            .arg(output_path)
            .current_dir(&self.ctx.study_root)
            .output();
        let output = match result {
            Ok(output) => output,
            Err(source) => {
                return Err(AgentError::ScriptSpawn {
                    path: script_path.to_path_buf(),
                    source,
                });
            }
        };
        if !output.status.success() {
            return Err(AgentError::ScriptExecution {
                path: script_path.to_path_buf(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

impl Agent for QcProgrammerAgent<'_> {
    type Output = GeneratedDataset;

    fn name(&self) -> &'static str {
        "qc-programmer"
    }

    fn invoke(&self) -> Result<Self::Output> {
        let request = self.build_prompt();
        let response = self.llm.complete(&request)?;
        if response.text.trim().is_empty() {
            return Err(AgentError::SchemaViolation {
                message: "qc-programmer returned an empty script".to_string(),
            });
        }

        let script_path = self.script_path();
        if let Some(parent) = script_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| AgentError::ScriptWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&script_path, &response.text).map_err(|source| AgentError::ScriptWrite {
            path: script_path.clone(),
            source,
        })?;

        let output_path = self.output_path();
        self.execute(&script_path, &output_path)?;

        Ok(GeneratedDataset { script_path, output_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_llm::LlmMode;
    use orch_registry::FunctionRegistry;

    fn registry() -> FunctionRegistry {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.toml");
        std::fs::write(
            &path,
            "[manifest]\nschema = \"sdtm-orchestrator.function-registry\"\nschema_version = 1\n",
        )
        .unwrap();
        FunctionRegistry::load(&path).unwrap()
    }

    #[test]
    fn the_qc_script_path_is_distinct_from_production() {
        let study_dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let llm = LlmClient::new(LlmMode::Template).unwrap();
        let ctx = ContextPack::for_qc(
            "DM".to_string(),
            registry.format_for_prompt(),
            Vec::new(),
            study_dir.path().join("raw"),
            study_dir.path().to_path_buf(),
            None,
        );
        let spec = SpecDocument {
            study_id: "STUDY01".to_string(),
            domain: "DM".to_string(),
            spec_version: "0.3".to_string(),
            created_by: "human-review-gate".to_string(),
            created_at: chrono::Utc::now(),
            variables: Vec::new(),
        };
        let agent = QcProgrammerAgent {
            llm: &llm,
            registry: &registry,
            ctx: &ctx,
            spec: &spec,
            python_interpreter: "this-interpreter-does-not-exist",
        };

        assert_eq!(agent.script_path(), study_dir.path().join("DM").join("qc.py"));
        let _ = agent.invoke();
        assert!(study_dir.path().join("DM").join("qc.py").exists());
    }
}
