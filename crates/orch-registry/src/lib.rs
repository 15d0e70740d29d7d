//! Function Registry: a loader that reads the transformation-function
//! catalog, validates it as a DAG, and renders it for injection into agent
//! prompts (`SPEC_FULL.md` §4.5).

pub mod error;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub use error::{RegistryError, Result};
use orch_model::{FunctionRegistryEntry, ParameterSpec};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct ManifestHeader {
    schema: String,
    schema_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestFile {
    manifest: ManifestHeader,
    #[serde(default)]
    functions: Vec<RawFunction>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFunction {
    name: String,
    purpose: String,
    #[serde(default)]
    when_to_use: Vec<String>,
    #[serde(default)]
    parameters: Vec<RawParameter>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    usage_examples: Vec<String>,
    #[serde(default)]
    supported_codelists: Vec<String>,
    #[serde(default)]
    notes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawParameter {
    name: String,
    #[serde(default, rename = "type")]
    type_tag: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    description: String,
}

const SUPPORTED_SCHEMA: &str = "sdtm-orchestrator.function-registry";
const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// The loaded, validated function catalog for one pipeline run.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    entries: BTreeMap<String, FunctionRegistryEntry>,
}

impl FunctionRegistry {
    /// Loads the manifest, checks for duplicate names and dangling
    /// dependencies, and fails at load time on a dependency cycle (§4.5
    /// invariant: "attempts to register a cycle fail at load time").
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ManifestFile = toml::from_str(&text).map_err(|source| RegistryError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        if file.manifest.schema != SUPPORTED_SCHEMA
            || file.manifest.schema_version != SUPPORTED_SCHEMA_VERSION
        {
            return Err(RegistryError::UnsupportedSchema {
                schema: file.manifest.schema,
                schema_version: file.manifest.schema_version,
            });
        }

        let mut entries = BTreeMap::new();
        for raw in file.functions {
            if entries.contains_key(&raw.name) {
                return Err(RegistryError::DuplicateFunction { name: raw.name });
            }
            let entry = FunctionRegistryEntry {
                name: raw.name.clone(),
                purpose: raw.purpose,
                when_to_use: raw.when_to_use,
                parameters: raw
                    .parameters
                    .into_iter()
                    .map(|p| ParameterSpec {
                        name: p.name,
                        type_tag: p.type_tag,
                        required: p.required,
                        default: p.default,
                        example: p.example,
                        description: p.description,
                    })
                    .collect(),
                dependencies: raw.dependencies,
                usage_examples: raw.usage_examples,
                supported_codelists: raw.supported_codelists,
                notes: raw.notes,
            };
            entries.insert(raw.name, entry);
        }

        for entry in entries.values() {
            for dep in &entry.dependencies {
                if !entries.contains_key(dep) {
                    return Err(RegistryError::UnknownDependency {
                        name: entry.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let registry = Self { entries };
        registry.topological_order()?;
        Ok(registry)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FunctionRegistryEntry> {
        self.entries.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&FunctionRegistryEntry> {
        self.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    /// Deterministic dependency order via Kahn's algorithm, ties broken by
    /// name. Dependencies are required to precede dependents in the
    /// returned order.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut indegree: BTreeMap<&str, usize> = self
            .entries
            .keys()
            .map(|name| (name.as_str(), 0usize))
            .collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for entry in self.entries.values() {
            *indegree.get_mut(entry.name.as_str()).unwrap() += entry.dependencies.len();
            for dep in &entry.dependencies {
                dependents.entry(dep.as_str()).or_default().push(&entry.name);
            }
        }

        let mut ready: BTreeSet<&str> = indegree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut order = Vec::with_capacity(self.entries.len());
        while let Some(name) = ready.iter().next().copied() {
            ready.remove(name);
            order.push(name.to_string());
            if let Some(children) = dependents.get(name) {
                for child in children {
                    let deg = indegree.get_mut(child).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(child);
                    }
                }
            }
        }

        if order.len() != self.entries.len() {
            let mut remaining: Vec<String> = indegree
                .into_iter()
                .filter(|(name, deg)| *deg > 0 && !order.contains(&(*name).to_string()))
                .map(|(name, _)| name.to_string())
                .collect();
            remaining.sort();
            return Err(RegistryError::CyclicDependency { cycle: remaining });
        }

        Ok(order)
    }

    /// Compact per-entry text block for prompt injection: name, purpose,
    /// when-to-use bullets, and a parameter table — textual instead of
    /// `comfy-table`'s terminal rendering, since this is consumed by an
    /// LLM prompt rather than a human terminal.
    #[must_use]
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::new();
        for entry in self.entries.values() {
            let _ = writeln!(out, "## {}", entry.name);
            let _ = writeln!(out, "{}", entry.purpose);
            if !entry.when_to_use.is_empty() {
                let _ = writeln!(out, "When to use:");
                for bullet in &entry.when_to_use {
                    let _ = writeln!(out, "- {bullet}");
                }
            }
            if !entry.parameters.is_empty() {
                let _ = writeln!(out, "Parameters:");
                for param in &entry.parameters {
                    let marker = if param.required { "required" } else { "optional" };
                    let type_tag = if param.type_tag.is_empty() { "any" } else { &param.type_tag };
                    let _ = write!(out, "- {} ({marker}, {type_tag}): {}", param.name, param.description);
                    if let Some(default) = &param.default {
                        let _ = write!(out, " [default: {default}]");
                    }
                    if let Some(example) = &param.example {
                        let _ = write!(out, " [example: {example}]");
                    }
                    out.push('\n');
                }
            }
            if !entry.dependencies.is_empty() {
                let _ = writeln!(out, "Depends on: {}", entry.dependencies.join(", "));
            }
            if !entry.supported_codelists.is_empty() {
                let _ = writeln!(out, "Supported codelists: {}", entry.supported_codelists.join(", "));
            }
            if !entry.usage_examples.is_empty() {
                let _ = writeln!(out, "Usage examples:");
                for example in &entry.usage_examples {
                    let _ = writeln!(out, "- {example}");
                }
            }
            if !entry.notes.is_empty() {
                let _ = writeln!(out, "Notes:");
                for note in &entry.notes {
                    let _ = writeln!(out, "- {note}");
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("manifest.toml");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    const HEADER: &str = r#"
        [manifest]
        schema = "sdtm-orchestrator.function-registry"
        schema_version = 1
    "#;

    #[test]
    fn loads_and_topologically_orders_a_simple_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            &format!(
                "{HEADER}
                [[functions]]
                name = \"impute_partial_date\"
                purpose = \"fills partial dates\"

                [[functions]]
                name = \"derive_age\"
                purpose = \"computes age at reference date\"
                dependencies = [\"impute_partial_date\"]
                "
            ),
        );

        let registry = FunctionRegistry::load(&path).unwrap();
        let order = registry.topological_order().unwrap();
        let impute_pos = order.iter().position(|n| n == "impute_partial_date").unwrap();
        let derive_pos = order.iter().position(|n| n == "derive_age").unwrap();
        assert!(impute_pos < derive_pos);
    }

    #[test]
    fn rejects_a_cycle_at_load_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            &format!(
                "{HEADER}
                [[functions]]
                name = \"a\"
                purpose = \"a\"
                dependencies = [\"b\"]

                [[functions]]
                name = \"b\"
                purpose = \"b\"
                dependencies = [\"a\"]
                "
            ),
        );

        let result = FunctionRegistry::load(&path);
        assert!(matches!(result, Err(RegistryError::CyclicDependency { .. })));
    }

    #[test]
    fn rejects_a_dependency_on_an_unknown_function() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            &format!(
                "{HEADER}
                [[functions]]
                name = \"a\"
                purpose = \"a\"
                dependencies = [\"does_not_exist\"]
                "
            ),
        );

        let result = FunctionRegistry::load(&path);
        assert!(matches!(result, Err(RegistryError::UnknownDependency { .. })));
    }

    #[test]
    fn rejects_duplicate_function_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(
            &dir,
            &format!(
                "{HEADER}
                [[functions]]
                name = \"a\"
                purpose = \"first\"

                [[functions]]
                name = \"a\"
                purpose = \"second\"
                "
            ),
        );

        let result = FunctionRegistry::load(&path);
        assert!(matches!(result, Err(RegistryError::DuplicateFunction { .. })));
    }
}
