//! CT Resolver: resolves a codelist code to its allowed submission values,
//! extensibility flag, and synonym map, combining an external vocabulary
//! service with a local overlay table (`SPEC_FULL.md` §4.7).

pub mod error;
pub mod overlay;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

pub use error::{CtError, Result};
pub use overlay::OverlayTable;
use serde::Deserialize;

/// User agent sent with vocabulary-service requests, following the
/// teacher's `tss_updater::github::client` convention of identifying the
/// calling tool rather than using reqwest's default.
const USER_AGENT_VALUE: &str = concat!("sdtm-orchestrator/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct CodelistMetadata {
    pub name: String,
    pub extensible: bool,
    pub submission_values: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceCodelistResponse {
    name: String,
    #[serde(rename = "Extensible_List")]
    extensible_list: bool,
    submission_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceSynonymEntry {
    synonym: String,
    submission_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Exact,
    ServiceSynonym,
    OverlaySynonym,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub submission_value: Option<String>,
    pub source: Option<ResolutionSource>,
}

impl Resolution {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.submission_value.is_some()
    }
}

/// HTTP client over the vocabulary service plus a local overlay table,
/// modeled on `tss_updater::github::client::GitHubClient` (one
/// `reqwest::blocking::Client` with default headers, one method per
/// endpoint, status-code branching) — the async GitHub client is adapted
/// to `reqwest::blocking` to match this workspace's synchronous model
/// (`SPEC_FULL.md` §5).
pub struct CtResolver {
    client: reqwest::blocking::Client,
    base_url: Option<String>,
    overlay: OverlayTable,
}

impl CtResolver {
    pub fn new(base_url: Option<String>, overlay: OverlayTable) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| CtError::Network {
                code: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            base_url,
            overlay,
        })
    }

    fn endpoint(&self, suffix: &str) -> Option<String> {
        self.base_url.as_ref().map(|base| format!("{base}{suffix}"))
    }

    /// `fetch_codelist(code)` (§4.7): codelist metadata including the
    /// `Extensible_List` property.
    pub fn fetch_codelist(&self, code: &str) -> Result<CodelistMetadata> {
        let Some(url) = self.endpoint(&format!("/codelists/{code}")) else {
            return Err(CtError::NotFound { code: code.to_string() });
        };
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| CtError::Network {
                code: code.to_string(),
                source,
            })?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CtError::NotFound { code: code.to_string() });
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CtError::Service {
                code: code.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ServiceCodelistResponse =
            response.json().map_err(|source| CtError::Network {
                code: code.to_string(),
                source,
            })?;
        Ok(CodelistMetadata {
            name: parsed.name,
            extensible: parsed.extensible_list,
            submission_values: parsed
                .submission_values
                .into_iter()
                .map(|v| v.to_uppercase())
                .collect(),
        })
    }

    /// `synonym_map(code)` (§4.7): known-name (standard term, synonym,
    /// sponsor mapping) to canonical submission value, sourced from the
    /// service's member endpoint.
    pub fn synonym_map(&self, code: &str) -> Result<BTreeMap<String, String>> {
        let Some(url) = self.endpoint(&format!("/codelists/{code}/synonyms")) else {
            return Ok(BTreeMap::new());
        };
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| CtError::Network {
                code: code.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(CtError::Service {
                code: code.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let entries: Vec<ServiceSynonymEntry> =
            response.json().map_err(|source| CtError::Network {
                code: code.to_string(),
                source,
            })?;
        Ok(entries
            .into_iter()
            .map(|e| (e.synonym.to_uppercase(), e.submission_value.to_uppercase()))
            .collect())
    }

    /// `is_approved_value(code, value)` (§4.7): exact submission-value
    /// membership check only, no synonym expansion.
    pub fn is_approved_value(&self, code: &str, value: &str) -> Result<bool> {
        let metadata = self.fetch_codelist(code)?;
        Ok(metadata.submission_values.contains(&value.to_uppercase()))
    }

    /// Resolution precedence: exact submission value > service synonym >
    /// overlay synonym. Service unreachable falls back to overlay only
    /// (B2); an overlay miss against a non-extensible codelist is
    /// returned as unresolved rather than guessed.
    pub fn resolve(&self, code: &str, raw_value: &str) -> Resolution {
        let upper = raw_value.to_uppercase();

        match self.fetch_codelist(code) {
            Ok(metadata) => {
                if metadata.submission_values.contains(&upper) {
                    return Resolution {
                        submission_value: Some(upper),
                        source: Some(ResolutionSource::Exact),
                    };
                }
                if let Ok(synonyms) = self.synonym_map(code) {
                    if let Some(canonical) = synonyms.get(&upper) {
                        return Resolution {
                            submission_value: Some(canonical.clone()),
                            source: Some(ResolutionSource::ServiceSynonym),
                        };
                    }
                }
            }
            Err(err) => {
                tracing::warn!(codelist = code, error = %err, "vocabulary service unreachable, falling back to overlay");
            }
        }

        match self.overlay.lookup(code, raw_value) {
            Some(value) => Resolution {
                submission_value: Some(value.to_uppercase()),
                source: Some(ResolutionSource::OverlaySynonym),
            },
            None => Resolution {
                submission_value: None,
                source: None,
            },
        }
    }

    /// Whether `code` resolves at all, via the service or the overlay.
    /// Used by spec validation rule 1 (every referenced codelist resolves).
    #[must_use]
    pub fn codelist_resolves(&self, code: &str) -> bool {
        self.fetch_codelist(code).is_ok() || self.overlay.has_codelist(code)
    }
}
