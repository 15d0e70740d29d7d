//! Adapter over a remote language-model service with three interchangeable
//! modes (§4.8). Agents call [`LlmClient::complete`] and cannot observe
//! which mode ran except through latency — the return contract is
//! identical across `live`, `log-only`, and `template`.

pub mod error;
mod templates;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

pub use error::{LlmError, Result};

const USER_AGENT_VALUE: &str = "sdtm-orchestrator-llm-client/0.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// What an agent is asking the model to produce, so `template` mode can
/// render something shaped like the right answer instead of one canned
/// response for every caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    SpecDraft,
    SpecReview,
    ProductionScript,
    QcScript,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub domain: String,
    pub kind: CompletionKind,
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl LiveConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogOnlyConfig {
    pub log_path: PathBuf,
}

/// The three modes of §4.8, as a tagged union so callers cannot construct
/// an invalid combination (e.g. a live config without credentials).
pub enum LlmMode {
    Live(LiveConfig),
    LogOnly(LogOnlyConfig),
    Template,
}

pub struct LlmClient {
    mode: LlmMode,
    http: Option<reqwest::blocking::Client>,
}

impl LlmClient {
    pub fn new(mode: LlmMode) -> Result<Self> {
        let http = match &mode {
            LlmMode::Live(config) => Some(
                reqwest::blocking::Client::builder()
                    .user_agent(USER_AGENT_VALUE)
                    .timeout(config.timeout)
                    .build()
                    .map_err(|source| LlmError::Network {
                        endpoint: config.endpoint.clone(),
                        source,
                    })?,
            ),
            LlmMode::LogOnly(_) | LlmMode::Template => None,
        };
        Ok(Self { mode, http })
    }

    pub fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        match &self.mode {
            LlmMode::Live(config) => self.complete_live(config, request),
            LlmMode::LogOnly(config) => self.complete_log_only(config, request),
            LlmMode::Template => self.complete_template(request),
        }
    }

    fn complete_live(&self, config: &LiveConfig, request: &CompletionRequest) -> Result<CompletionResponse> {
        let http = self.http.as_ref().expect("live mode always builds an http client");
        let body = serde_json::json!({
            "model": config.model,
            "system": request.system_prompt,
            "prompt": request.user_prompt,
        });
        let response = http
            .post(&config.endpoint)
            .bearer_auth(&config.api_key)
            .json(&body)
            .send()
            .map_err(|source| LlmError::Network {
                endpoint: config.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Service {
                endpoint: config.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: LiveResponseBody = response.json().map_err(|source| LlmError::Network {
            endpoint: config.endpoint.clone(),
            source,
        })?;
        Ok(CompletionResponse { text: parsed.text })
    }

    /// Writes the would-be prompt to the log artifact and returns a canned
    /// minimal structure — enough for an agent's schema parser to accept,
    /// never enough to look like a real mapping decision.
    fn complete_log_only(&self, config: &LogOnlyConfig, request: &CompletionRequest) -> Result<CompletionResponse> {
        if let Some(parent) = config.log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LlmError::LogWrite {
                path: config.log_path.clone(),
                source,
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_path)
            .map_err(|source| LlmError::LogWrite {
                path: config.log_path.clone(),
                source,
            })?;
        writeln!(
            file,
            "--- domain={} ---\nSYSTEM:\n{}\nUSER:\n{}\n",
            request.domain, request.system_prompt, request.user_prompt
        )
        .map_err(|source| LlmError::LogWrite {
            path: config.log_path.clone(),
            source,
        })?;
        Ok(CompletionResponse {
            text: canned_log_only_text(request.kind),
        })
    }

    fn complete_template(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let text = templates::render(request.kind, &request.domain)?;
        Ok(CompletionResponse { text })
    }
}

/// A structure an agent's own parser accepts without ever resembling a
/// real mapping decision or a runnable program.
fn canned_log_only_text(kind: CompletionKind) -> String {
    match kind {
        CompletionKind::SpecDraft => r#"{"variables": []}"#.to_string(),
        CompletionKind::SpecReview => r#"{"findings": []}"#.to_string(),
        CompletionKind::ProductionScript | CompletionKind::QcScript => {
            "# log-only mode: no script generated\nraise SystemExit(\"log-only placeholder, not executable\")\n"
                .to_string()
        }
    }
}

#[derive(serde::Deserialize)]
struct LiveResponseBody {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(domain: &str) -> CompletionRequest {
        request_of_kind(domain, CompletionKind::SpecDraft)
    }

    fn request_of_kind(domain: &str, kind: CompletionKind) -> CompletionRequest {
        CompletionRequest {
            domain: domain.to_string(),
            kind,
            system_prompt: "you are a spec builder".to_string(),
            user_prompt: "map the raw columns".to_string(),
        }
    }

    #[test]
    fn template_mode_returns_the_dm_template() {
        let client = LlmClient::new(LlmMode::Template).unwrap();
        let response = client.complete(&request("DM")).unwrap();
        assert!(response.text.contains("USUBJID"));
    }

    #[test]
    fn template_mode_renders_a_script_for_production_kind() {
        let client = LlmClient::new(LlmMode::Template).unwrap();
        let response = client
            .complete(&request_of_kind("DM", CompletionKind::ProductionScript))
            .unwrap();
        assert!(response.text.contains("import"));
    }

    #[test]
    fn log_only_mode_writes_the_prompt_and_returns_a_canned_structure() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("prompts.log");
        let client = LlmClient::new(LlmMode::LogOnly(LogOnlyConfig {
            log_path: log_path.clone(),
        }))
        .unwrap();

        let response = client.complete(&request("AE")).unwrap();
        assert_eq!(response.text, r#"{"variables": []}"#);

        let logged = std::fs::read_to_string(&log_path).unwrap();
        assert!(logged.contains("domain=AE"));
        assert!(logged.contains("map the raw columns"));
    }

    #[test]
    fn all_three_modes_share_the_same_return_shape() {
        let template = LlmClient::new(LlmMode::Template).unwrap().complete(&request("DM")).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let log_only = LlmClient::new(LlmMode::LogOnly(LogOnlyConfig {
            log_path: dir.path().join("p.log"),
        }))
        .unwrap()
        .complete(&request("DM"))
        .unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&template.text).is_ok());
        assert!(serde_json::from_str::<serde_json::Value>(&log_only.text).is_ok());
    }
}
