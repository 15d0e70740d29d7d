//! IG Client: a domain-agnostic read API over Implementation Guide content
//! (`SPEC_FULL.md` §4.6). Two interchangeable backends share the
//! [`IgClient`] trait: a file-based parser of the heading+summary-table
//! text layout, and a vector-store-shaped stub for semantic retrieval.

pub mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub use error::{IgError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Requirement {
    Req,
    Exp,
    Cond,
    Perm,
}

impl Requirement {
    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Req" => Some(Self::Req),
            "Exp" => Some(Self::Exp),
            "Cond" => Some(Self::Cond),
            "Perm" => Some(Self::Perm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableDetail {
    pub name: String,
    pub label: String,
    pub data_type: String,
    pub ct_flag: bool,
    pub requirement: Requirement,
    /// Free-text body under the variable's heading, for agent prompts.
    pub detail_text: String,
}

/// Domain-agnostic IG retrieval contract. Both backends must return the
/// same keys for the same domain (§4.6).
pub trait IgClient {
    fn get_domain_variables(&self, domain: &str) -> Result<Vec<String>>;
    fn get_required_variables(&self, domain: &str) -> Result<Vec<String>>;
    fn get_conditional_variables(&self, domain: &str) -> Result<Vec<String>>;
    fn get_ct_variables(&self, domain: &str) -> Result<Vec<String>>;
    fn get_variable_detail(&self, domain: &str, variable: &str) -> Result<Option<VariableDetail>>;
    fn is_available(&self) -> bool;
}

/// Parses per-domain text files: a `## <VARIABLE>` heading per variable
/// with free-text detail, terminated by a `| Variable | Label | Type | CT |
/// Requirement |` markdown table that is authoritative for the structured
/// fields (§4.6).
pub struct FileIgClient {
    root: PathBuf,
}

impl FileIgClient {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn domain_path(&self, domain: &str) -> PathBuf {
        self.root.join(format!("{domain}.md"))
    }

    /// Missing domain content is an empty result, not an error (§4.6:
    /// "Missing domain → empty results, not failure").
    fn load_domain(&self, domain: &str) -> Result<BTreeMap<String, VariableDetail>> {
        let path = self.domain_path(domain);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&path).map_err(|source| IgError::Io {
            path: path.clone(),
            source,
        })?;
        parse_domain_content(&text, &path)
    }
}

impl IgClient for FileIgClient {
    fn get_domain_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self.load_domain(domain)?.into_keys().collect())
    }

    fn get_required_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self
            .load_domain(domain)?
            .into_iter()
            .filter(|(_, v)| v.requirement == Requirement::Req)
            .map(|(name, _)| name)
            .collect())
    }

    fn get_conditional_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self
            .load_domain(domain)?
            .into_iter()
            .filter(|(_, v)| v.requirement == Requirement::Cond)
            .map(|(name, _)| name)
            .collect())
    }

    fn get_ct_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self
            .load_domain(domain)?
            .into_iter()
            .filter(|(_, v)| v.ct_flag)
            .map(|(name, _)| name)
            .collect())
    }

    fn get_variable_detail(&self, domain: &str, variable: &str) -> Result<Option<VariableDetail>> {
        Ok(self.load_domain(domain)?.remove(variable))
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }
}

/// Pluggable embedder for the semantic-store backend, substitutable
/// without touching `IgClient` callers (§4.6: "optional/interchangeable").
pub trait EmbeddingBackend {
    fn embed(&self, text: &str) -> Vec<f32>;
    fn nearest(&self, query: &[f32], top_k: usize) -> Vec<String>;
}

/// Same API served from a vector store populated by an offline chunker +
/// embedder. Variable-name lookups are exact; free-form detail queries
/// fall back to nearest-neighbor search over the configured backend.
pub struct VectorStoreIgClient<B: EmbeddingBackend> {
    chunks_by_domain: BTreeMap<String, BTreeMap<String, VariableDetail>>,
    backend: B,
}

impl<B: EmbeddingBackend> VectorStoreIgClient<B> {
    #[must_use]
    pub fn new(chunks_by_domain: BTreeMap<String, BTreeMap<String, VariableDetail>>, backend: B) -> Self {
        Self {
            chunks_by_domain,
            backend,
        }
    }
}

impl<B: EmbeddingBackend> IgClient for VectorStoreIgClient<B> {
    fn get_domain_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self
            .chunks_by_domain
            .get(domain)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn get_required_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self
            .chunks_by_domain
            .get(domain)
            .map(|m| {
                m.iter()
                    .filter(|(_, v)| v.requirement == Requirement::Req)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_conditional_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self
            .chunks_by_domain
            .get(domain)
            .map(|m| {
                m.iter()
                    .filter(|(_, v)| v.requirement == Requirement::Cond)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_ct_variables(&self, domain: &str) -> Result<Vec<String>> {
        Ok(self
            .chunks_by_domain
            .get(domain)
            .map(|m| {
                m.iter()
                    .filter(|(_, v)| v.ct_flag)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_variable_detail(&self, domain: &str, variable: &str) -> Result<Option<VariableDetail>> {
        if let Some(detail) = self.chunks_by_domain.get(domain).and_then(|m| m.get(variable)) {
            return Ok(Some(detail.clone()));
        }
        let query = self.backend.embed(variable);
        let candidates = self.backend.nearest(&query, 1);
        Ok(candidates
            .first()
            .and_then(|name| self.chunks_by_domain.get(domain).and_then(|m| m.get(name)))
            .cloned())
    }

    fn is_available(&self) -> bool {
        !self.chunks_by_domain.is_empty()
    }
}

fn parse_domain_content(
    text: &str,
    path: &std::path::Path,
) -> Result<BTreeMap<String, VariableDetail>> {
    let mut sections: BTreeMap<String, String> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut body = String::new();
    let mut in_summary_table = false;
    let mut table_rows: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        if line.starts_with("## ") {
            if let Some(name) = current.take() {
                sections.insert(name, std::mem::take(&mut body));
            }
            current = Some(line.trim_start_matches("## ").trim().to_string());
            continue;
        }
        if line.trim_start().starts_with('|') {
            in_summary_table = true;
            let cells: Vec<String> = line
                .trim()
                .trim_matches('|')
                .split('|')
                .map(|c| c.trim().to_string())
                .collect();
            let is_separator = cells.iter().all(|c| c.chars().all(|ch| ch == '-' || ch == ':'));
            if !is_separator {
                table_rows.push(cells);
            }
            continue;
        }
        if in_summary_table {
            continue;
        }
        if current.is_some() {
            body.push_str(line);
            body.push('\n');
        }
    }
    if let Some(name) = current.take() {
        sections.insert(name, body);
    }

    if table_rows.is_empty() {
        return Err(IgError::Malformed {
            path: path.to_path_buf(),
            message: "no summary table found".to_string(),
        });
    }

    let header = &table_rows[0];
    let col = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));
    let idx_var = col("Variable").ok_or_else(|| IgError::Malformed {
        path: path.to_path_buf(),
        message: "summary table missing Variable column".to_string(),
    })?;
    let idx_label = col("Label");
    let idx_type = col("Type");
    let idx_ct = col("CT");
    let idx_req = col("Requirement").ok_or_else(|| IgError::Malformed {
        path: path.to_path_buf(),
        message: "summary table missing Requirement column".to_string(),
    })?;

    let mut variables = BTreeMap::new();
    for row in &table_rows[1..] {
        let name = row.get(idx_var).cloned().unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let requirement_text = row.get(idx_req).cloned().unwrap_or_default();
        let requirement = Requirement::parse(&requirement_text).ok_or_else(|| IgError::Malformed {
            path: path.to_path_buf(),
            message: format!("unrecognized requirement {requirement_text:?} for {name}"),
        })?;
        let detail = VariableDetail {
            name: name.clone(),
            label: idx_label.and_then(|i| row.get(i)).cloned().unwrap_or_default(),
            data_type: idx_type.and_then(|i| row.get(i)).cloned().unwrap_or_default(),
            ct_flag: idx_ct
                .and_then(|i| row.get(i))
                .map(|v| v.eq_ignore_ascii_case("Y"))
                .unwrap_or(false),
            requirement,
            detail_text: sections.get(&name).cloned().unwrap_or_default(),
        };
        variables.insert(name, detail);
    }

    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
## STUDYID
Unique study identifier, copied verbatim from the site export.

## DOMAIN
Constant two-character domain abbreviation.

| Variable | Label | Type | CT | Requirement |
|---|---|---|---|---|
| STUDYID | Study Identifier | Char | N | Req |
| DOMAIN | Domain Abbreviation | Char | N | Req |
";

    fn write_domain_file(dir: &tempfile::TempDir, domain: &str, content: &str) {
        let path = dir.path().join(format!("{domain}.md"));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn parses_required_variables_and_detail_text() {
        let dir = tempfile::tempdir().unwrap();
        write_domain_file(&dir, "DM", SAMPLE);
        let client = FileIgClient::new(dir.path().to_path_buf());

        let mut required = client.get_required_variables("DM").unwrap();
        required.sort();
        assert_eq!(required, vec!["DOMAIN".to_string(), "STUDYID".to_string()]);

        let detail = client.get_variable_detail("DM", "STUDYID").unwrap().unwrap();
        assert!(detail.detail_text.contains("Unique study identifier"));
        assert_eq!(detail.data_type, "Char");
    }

    #[test]
    fn missing_domain_returns_empty_results_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = FileIgClient::new(dir.path().to_path_buf());

        assert_eq!(client.get_domain_variables("ZZ").unwrap(), Vec::<String>::new());
        assert!(client.get_variable_detail("ZZ", "STUDYID").unwrap().is_none());
    }

    #[test]
    fn both_backends_return_the_same_keys_for_the_same_domain() {
        let dir = tempfile::tempdir().unwrap();
        write_domain_file(&dir, "DM", SAMPLE);
        let file_client = FileIgClient::new(dir.path().to_path_buf());
        let mut file_vars = file_client.get_domain_variables("DM").unwrap();
        file_vars.sort();

        struct NoopBackend;
        impl EmbeddingBackend for NoopBackend {
            fn embed(&self, _text: &str) -> Vec<f32> {
                Vec::new()
            }
            fn nearest(&self, _query: &[f32], _top_k: usize) -> Vec<String> {
                Vec::new()
            }
        }

        let parsed = parse_domain_content(SAMPLE, std::path::Path::new("DM.md")).unwrap();
        let mut chunks = BTreeMap::new();
        chunks.insert("DM".to_string(), parsed);
        let vector_client = VectorStoreIgClient::new(chunks, NoopBackend);
        let mut vector_vars = vector_client.get_domain_variables("DM").unwrap();
        vector_vars.sort();

        assert_eq!(file_vars, vector_vars);
    }
}
