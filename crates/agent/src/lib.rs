//! Step-protocol agent core
//!
//! The model answers every query with exactly one structured step
//! (START, PLAN, TOOL or OUTPUT). TOOL steps are dispatched through the
//! [`ToolRegistry`] and their results are fed back as OBSERVE steps until
//! the model produces OUTPUT.

use thiserror::Error;

pub mod context;
pub mod history;
pub mod loop_agent;
pub mod step;
pub mod tools;
pub mod transcript;

pub use context::ContextBuilder;
pub use history::{Content, Entry, History, Role};
pub use loop_agent::{LoopSettings, StepLoop, Turn};
pub use step::{SchemaError, Step, StepKind, ToolName};
pub use tools::{ToolError, ToolRegistry, ToolTrait};
pub use transcript::{MemoryTranscript, StdoutTranscript, Transcript};

/// Reasons a turn ends in FAILED
///
/// Tool errors are not listed here: they are handed back to the model as
/// OBSERVE text. Only a tool call that outlives its timeout ends the turn.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("model broke the step protocol: {0}")]
    Schema(#[from] SchemaError),

    #[error("model request failed: {0}")]
    Transport(#[from] stepwise_provider::ProviderError),

    #[error("no OUTPUT after {0} model queries")]
    StepLimit(u32),

    #[error("model did not answer within {0} seconds")]
    ModelTimeout(u64),

    #[error("tool {tool} did not finish within {secs} seconds")]
    ToolTimeout { tool: ToolName, secs: u64 },
}

pub type Result<T> = std::result::Result<T, AgentError>;
