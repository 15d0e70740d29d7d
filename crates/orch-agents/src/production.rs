//! Production-programmer agent (`SPEC_FULL.md` §4.4.4): turns an
//! approved spec into a Python script that applies the registered
//! functions in dependency order, runs it as a subprocess rooted at the
//! study directory, and hands back the parquet artifact it wrote. A
//! nonzero exit is fatal — there is no partial-success notion for a
//! generated script (`SPEC_FULL.md` §7: `ScriptExecution` is not
//! retryable by the orchestrator's default policy, only by a full
//! comparison-loop re-attempt).

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::Command;

use orch_llm::{CompletionKind, CompletionRequest, LlmClient};
use orch_model::SpecDocument;
use orch_registry::FunctionRegistry;

use crate::agent::Agent;
use crate::context::ContextPack;
use crate::error::{AgentError, Result};

#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    pub script_path: PathBuf,
    pub output_path: PathBuf,
}

pub struct ProductionProgrammerAgent<'a> {
    pub llm: &'a LlmClient,
    pub registry: &'a FunctionRegistry,
    pub ctx: &'a ContextPack,
    pub spec: &'a SpecDocument,
    /// Interpreter used to execute the generated script, e.g. `"python3"`
    /// — injected rather than hardcoded so tests and air-gapped runners
    /// can substitute a stub.
    pub python_interpreter: &'a str,
}

impl ProductionProgrammerAgent<'_> {
    fn script_path(&self) -> PathBuf {
        self.ctx.study_root.join(&self.ctx.domain).join("production.py")
    }

    fn output_path(&self) -> PathBuf {
        self.ctx.study_root.join(&self.ctx.domain).join("production.parquet")
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
                "Previous comparison against QC disagreed on these columns: {:?}",
                report.column_diffs.iter().map(|d| d.column.clone()).collect::<Vec<_>>()
            );
        }
        CompletionRequest {
            domain: self.ctx.domain.clone(),
            kind: CompletionKind::ProductionScript,
            system_prompt: "Write a standalone Python script that reads the raw CSV data, \
                 applies the approved mapping spec using the registered functions in \
                 dependency order, and writes a parquet file with one row per subject/record."
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

impl Agent for ProductionProgrammerAgent<'_> {
    type Output = GeneratedDataset;

    fn name(&self) -> &'static str {
        "production-programmer"
    }

    fn invoke(&self) -> Result<Self::Output> {
        let request = self.build_prompt();
        let response = self.llm.complete(&request)?;
        if response.text.trim().is_empty() {
            return Err(AgentError::SchemaViolation {
                message: "production-programmer returned an empty script".to_string(),
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
    use std::collections::BTreeMap;

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

    fn spec() -> SpecDocument {
        SpecDocument {
            study_id: "STUDY01".to_string(),
            domain: "DM".to_string(),
            spec_version: "0.3".to_string(),
            created_by: "human-review-gate".to_string(),
            created_at: chrono::Utc::now(),
            variables: vec![orch_model::VariableMapping {
                target_variable: "AGE".to_string(),
                target_domain: "DM".to_string(),
                source_variable: Some("AGE".to_string()),
                source_dataset: Some("dm.csv".to_string()),
                data_type: orch_model::DataType::Num,
                length: 3,
                codelist_code: None,
                codelist_name: None,
                controlled_terms: Vec::new(),
                mapping_logic: "copy".to_string(),
                macro_used: None,
                function_parameters: BTreeMap::new(),
                assumptions: Vec::new(),
                human_decision_required: false,
                decision_options: Vec::new(),
            }],
        }
    }

    #[test]
    fn writes_the_generated_script_before_attempting_execution() {
        let study_dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let spec = spec();
        let llm = LlmClient::new(LlmMode::Template).unwrap();
        let ctx = ContextPack::for_production(
            "DM".to_string(),
            registry.format_for_prompt(),
            Vec::new(),
            study_dir.path().join("raw"),
            study_dir.path().to_path_buf(),
            None,
        );
        let agent = ProductionProgrammerAgent {
            llm: &llm,
            registry: &registry,
            ctx: &ctx,
            spec: &spec,
            // deliberately not a real interpreter: asserts the script is written
            // to disk even though execution itself will fail in this sandbox.
            python_interpreter: "this-interpreter-does-not-exist",
        };

        let result = agent.invoke();
        assert!(result.is_err());
        assert!(study_dir.path().join("DM").join("production.py").exists());
    }
}
