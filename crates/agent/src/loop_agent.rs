//! Step loop: drives one user turn from query to OUTPUT

use std::time::Duration;
use tracing::{debug, info, warn};

use stepwise_config::{AgentConfig, Config};
use stepwise_provider::{ChatParams, Provider, ResponseFormat};

use crate::context::ContextBuilder;
use crate::history::History;
use crate::step::{response_schema, Step, ToolName, SCHEMA_NAME};
use crate::tools::ToolRegistry;
use crate::transcript::{MemoryTranscript, Transcript};
use crate::{AgentError, Result};

/// Per-turn limits and request options
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Empty means the provider's default model
    pub model: String,
    /// Model queries allowed per turn
    pub max_steps: u32,
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
    /// Rejected replies fed back to the model before the turn fails
    pub schema_retries: u32,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Strict JSON schema when set, plain JSON mode otherwise
    pub structured_output: bool,
}

impl LoopSettings {
    pub fn from_config(agent: &AgentConfig) -> Self {
        Self {
            model: agent.model.clone(),
            max_steps: agent.max_steps,
            model_timeout: Duration::from_secs(agent.model_timeout_secs),
            tool_timeout: Duration::from_secs(agent.tool_timeout_secs),
            schema_retries: agent.schema_retries,
            max_tokens: agent.max_tokens,
            temperature: agent.temperature,
            structured_output: agent.structured_output,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

enum TurnState {
    AwaitingModel,
    Dispatching { tool: ToolName, input: String },
    Done(String),
    Failed(AgentError),
}

/// Result of one turn
#[derive(Debug)]
pub struct Turn {
    /// Everything exchanged during the turn, in order
    pub history: History,
    /// OUTPUT content, or why the turn failed
    pub outcome: Result<String>,
    pub model_queries: u32,
}

impl Turn {
    pub fn is_done(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&AgentError> {
        self.outcome.as_ref().err()
    }
}

/// The orchestrator. Owns the provider and the tools; each call to
/// [`run_turn`](Self::run_turn) builds a fresh history.
pub struct StepLoop<P: Provider> {
    provider: P,
    tools: ToolRegistry,
    context: ContextBuilder,
    settings: LoopSettings,
    response_format: ResponseFormat,
}

impl<P: Provider> StepLoop<P> {
    pub fn new(
        provider: P,
        tools: ToolRegistry,
        context: ContextBuilder,
        settings: LoopSettings,
    ) -> Self {
        let response_format = if settings.structured_output {
            ResponseFormat::json_schema(SCHEMA_NAME, response_schema(&tools.names()))
        } else {
            ResponseFormat::JsonObject
        };
        Self {
            provider,
            tools,
            context,
            settings,
            response_format,
        }
    }

    /// Built-in tools, workspace and limits taken from `config`
    pub fn from_config(provider: P, config: &Config) -> Self {
        Self::new(
            provider,
            ToolRegistry::from_config(config),
            ContextBuilder::new(config.workspace_path()),
            LoopSettings::from_config(&config.agent),
        )
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Run a turn without a display and return only its outcome
    pub async fn process_direct(&self, query: &str) -> Result<String> {
        let mut transcript = MemoryTranscript::default();
        self.run_turn(query, &mut transcript).await.outcome
    }

    /// Run one user turn to DONE or FAILED.
    ///
    /// Model queries and tool calls strictly alternate with their results;
    /// nothing runs concurrently. Every appended step is shown to
    /// `transcript` first.
    pub async fn run_turn(&self, query: &str, transcript: &mut dyn Transcript) -> Turn {
        info!("turn started ({} chars)", query.len());

        let system_prompt = self.context.build_system_prompt(&self.tools).await;
        let mut history = History::seeded(system_prompt, query);
        let mut queries = 0u32;
        let mut retries_left = self.settings.schema_retries;
        let mut state = TurnState::AwaitingModel;

        let outcome = loop {
            state = match state {
                TurnState::AwaitingModel => {
                    if queries >= self.settings.max_steps {
                        TurnState::Failed(AgentError::StepLimit(self.settings.max_steps))
                    } else {
                        queries += 1;
                        debug!("model query {}/{}", queries, self.settings.max_steps);
                        match self.query_model(&history).await {
                            Err(e) => TurnState::Failed(e),
                            Ok(raw) => match Step::parse_emitted(&raw) {
                                Ok(step) => {
                                    transcript.step(&step);
                                    let next = Self::after_step(&step);
                                    history.push_step(step);
                                    next
                                }
                                Err(e) if retries_left > 0 => {
                                    retries_left -= 1;
                                    warn!("rejected model reply ({} retries left): {}", retries_left, e);
                                    history.push_rejected(raw, &e);
                                    TurnState::AwaitingModel
                                }
                                Err(e) => TurnState::Failed(e.into()),
                            },
                        }
                    }
                }
                TurnState::Dispatching { tool, input } => match self.dispatch(tool, &input).await {
                    Ok(output) => {
                        let observed = Step::observe(tool, input, output);
                        transcript.step(&observed);
                        history.push_step(observed);
                        TurnState::AwaitingModel
                    }
                    Err(e) => TurnState::Failed(e),
                },
                TurnState::Done(content) => break Ok(content),
                TurnState::Failed(e) => {
                    transcript.failed(&e);
                    break Err(e);
                }
            };
        };

        match &outcome {
            Ok(_) => info!("turn done after {} model queries", queries),
            Err(e) => info!("turn failed after {} model queries: {}", queries, e),
        }

        Turn {
            history,
            outcome,
            model_queries: queries,
        }
    }

    fn after_step(step: &Step) -> TurnState {
        match step {
            Step::Start { .. } | Step::Plan { .. } => TurnState::AwaitingModel,
            Step::Tool { tool, input } => TurnState::Dispatching {
                tool: *tool,
                input: input.clone(),
            },
            Step::Output { content } => TurnState::Done(content.clone()),
            // parse_emitted never yields OBSERVE
            Step::Observe { .. } => TurnState::Failed(AgentError::Schema(
                crate::step::SchemaError::ObserveFromModel,
            )),
        }
    }

    async fn query_model(&self, history: &History) -> Result<String> {
        let params = ChatParams {
            model: self.settings.model.clone(),
            messages: history.to_messages(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            response_format: Some(self.response_format.clone()),
        };

        let response = tokio::time::timeout(self.settings.model_timeout, self.provider.chat(params))
            .await
            .map_err(|_| AgentError::ModelTimeout(self.settings.model_timeout.as_secs()))??;

        // A reply without content fails validation as empty
        Ok(response.content.unwrap_or_default())
    }

    async fn dispatch(&self, tool: ToolName, input: &str) -> Result<String> {
        debug!("dispatching {}", tool);
        tokio::time::timeout(self.settings.tool_timeout, self.tools.invoke(tool, input))
            .await
            .map_err(|_| AgentError::ToolTimeout {
                tool,
                secs: self.settings.tool_timeout.as_secs(),
            })
    }
}
