//! Anthropic Messages API oracle.
//!
//! Extraction is a single request with a forced `record_propositions` tool
//! call. Checking runs an agent loop: the model reads the repository through
//! [`tools::RepoTools`], optionally searches the web through server-side
//! tools, and finishes by calling `report_verdict`.

pub mod config;
pub mod retry;
pub mod tools;
pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use semkon_core::prompts::{self, RECORD_PROPOSITIONS_TOOL, REPORT_VERDICT_TOOL};
use semkon_core::{
    schema, CheckRequest, CorrectnessExplanation, ExtractionRequest, Oracle, OracleError,
    OracleErrorKind, OracleResult, Proposition, ToolContract,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub use config::{AnthropicConfig, AUTH_ENV_VAR, DEFAULT_CHECK_MODEL, DEFAULT_EXTRACT_MODEL};
use config::{ANTHROPIC_VERSION, WEB_FETCH_BETA};
use retry::send_with_retry;
use tools::RepoTools;
use wire::{tool_result, user_message, MessagesResponse};

/// Per-request cap on each server-side web tool.
const WEB_TOOL_MAX_USES: u32 = 5;

/// [`Oracle`] backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicOracle {
    config: AnthropicConfig,
    http: Client,
}

impl std::fmt::Debug for AnthropicOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicOracle")
            .field("config", &self.config)
            .finish()
    }
}

impl AnthropicOracle {
    /// Validate settings and build the HTTP client. No request is made and
    /// no API key is needed until the first call.
    pub fn new(config: AnthropicConfig) -> OracleResult<Self> {
        config.validate()?;
        let http = build_http_client(config.request_timeout())?;
        Ok(Self { config, http })
    }

    async fn send(
        &self,
        body: &Value,
        beta: Option<&str>,
        context: &str,
    ) -> OracleResult<MessagesResponse> {
        let api_key = self.config.auth_token()?;
        let response = send_with_retry(
            &self.http,
            |client| {
                let request = client
                    .post(&self.config.endpoint)
                    .header("x-api-key", &api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(body);
                match beta {
                    Some(beta) => request.header("anthropic-beta", beta),
                    None => request,
                }
            },
            self.config.max_retries,
            self.config.retry_backoff(),
            context,
        )
        .await?;

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            OracleError::new(
                OracleErrorKind::Api,
                format!("{context}: invalid anthropic response: {e}"),
            )
        })?;
        if let Some(usage) = &parsed.usage {
            debug!(
                context,
                id = parsed.id.as_deref().unwrap_or_default(),
                input_tokens = usage.input_tokens.unwrap_or_default(),
                output_tokens = usage.output_tokens.unwrap_or_default(),
                stop_reason = parsed.stop_reason.as_deref().unwrap_or_default(),
                "anthropic response"
            );
        }
        Ok(parsed)
    }

    fn check_tools(&self) -> Vec<Value> {
        let mut tools = RepoTools::contracts()
            .iter()
            .chain(std::iter::once(&prompts::report_verdict_tool()))
            .map(tool_json)
            .collect::<Vec<_>>();
        if self.config.web_tools {
            tools.push(json!({
                "type": "web_search_20250305",
                "name": "web_search",
                "max_uses": WEB_TOOL_MAX_USES,
            }));
            tools.push(json!({
                "type": "web_fetch_20250910",
                "name": "web_fetch",
                "max_uses": WEB_TOOL_MAX_USES,
            }));
        }
        tools
    }
}

#[async_trait]
impl Oracle for AnthropicOracle {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn extract(&self, request: &ExtractionRequest) -> OracleResult<Vec<Proposition>> {
        let context = format!("extract {}", request.rel_path.display());
        let body = json!({
            "model": self.config.extract_model,
            "max_tokens": self.config.max_tokens,
            "messages": [user_message(request.prompt.as_str())],
            "tools": [tool_json(&prompts::record_propositions_tool())],
            "tool_choice": {"type": "tool", "name": RECORD_PROPOSITIONS_TOOL},
        });

        let response = self.send(&body, None, &context).await?;
        let input = response.tool_input(RECORD_PROPOSITIONS_TOOL).ok_or_else(|| {
            OracleError::no_structured_output(format!(
                "{context}: no {RECORD_PROPOSITIONS_TOOL} call (stop reason {:?})",
                response.stop_reason
            ))
        })?;
        Ok(schema::parse_propositions(&input)?)
    }

    async fn check(&self, request: &CheckRequest) -> OracleResult<CorrectnessExplanation> {
        let context = format!("check {}", request.location);
        let repo = RepoTools::new(&request.root)
            .map_err(|e| OracleError::invalid_config(format!("{context}: {e}")))?;
        let tools = self.check_tools();
        let beta = self.config.web_tools.then_some(WEB_FETCH_BETA);
        let mut messages = vec![user_message(request.prompt.as_str())];

        for turn in 1..=self.config.check_max_turns {
            let body = json!({
                "model": self.config.check_model,
                "max_tokens": self.config.max_tokens,
                "system": prompts::checker_system_prompt(),
                "messages": messages,
                "tools": tools,
            });
            let response = self.send(&body, beta, &context).await?;

            if let Some(input) = response.tool_input(REPORT_VERDICT_TOOL) {
                let verdict = schema::parse_verdict(&input)?;
                info!(location = %request.location, turn, verdict = %verdict.correctness, "verdict reported");
                return Ok(verdict);
            }

            match response.stop_reason.as_deref() {
                Some("tool_use") => {
                    let results = response
                        .tool_calls(REPORT_VERDICT_TOOL)
                        .into_iter()
                        .map(|(id, name, input)| run_tool(&repo, &id, &name, &input))
                        .collect::<Vec<_>>();
                    if results.is_empty() {
                        return Err(OracleError::no_structured_output(format!(
                            "{context}: tool_use stop without a client tool call"
                        )));
                    }
                    messages.push(response.assistant_message());
                    messages.push(user_message(results));
                }
                Some("pause_turn") => {
                    debug!(location = %request.location, turn, "server tool paused, resuming");
                    messages.push(response.assistant_message());
                }
                other => {
                    return Err(OracleError::no_structured_output(format!(
                        "{context}: conversation ended without {REPORT_VERDICT_TOOL} \
                         (stop reason {other:?}): {}",
                        retry::truncate(&response.text(), 320)
                    )));
                }
            }
        }

        Err(OracleError::new(
            OracleErrorKind::TurnLimit,
            format!(
                "{context}: no verdict after {} turns",
                self.config.check_max_turns
            ),
        ))
    }
}

fn run_tool(repo: &RepoTools, id: &str, name: &str, input: &Value) -> Value {
    debug!(tool = name, %input, "tool call");
    match repo.execute(name, input) {
        Ok(output) => tool_result(id, &output, false),
        Err(e) => {
            warn!(tool = name, error = %e, "tool call failed");
            tool_result(id, &e.to_string(), true)
        }
    }
}

fn tool_json(contract: &ToolContract) -> Value {
    json!({
        "name": contract.name,
        "description": contract.description,
        "input_schema": contract.input_schema,
    })
}

fn build_http_client(timeout: Duration) -> OracleResult<Client> {
    let mut builder = Client::builder().timeout(timeout);
    let allow_system_proxy = std::env::var("SEMKON_USE_SYSTEM_PROXY")
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if !allow_system_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|e| OracleError::invalid_config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_tools_follow_config() {
        let with = AnthropicOracle::new(AnthropicConfig::default()).unwrap();
        let names = with
            .check_tools()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "read_file",
                "list_directory",
                "search_files",
                "report_verdict",
                "web_search",
                "web_fetch"
            ]
        );

        let without = AnthropicOracle::new(AnthropicConfig {
            web_tools: false,
            ..AnthropicConfig::default()
        })
        .unwrap();
        assert_eq!(without.check_tools().len(), 4);
    }

    #[test]
    fn construction_needs_no_key() {
        let oracle = AnthropicOracle::new(AnthropicConfig::default()).unwrap();
        assert_eq!(oracle.name(), "anthropic");
    }
}
