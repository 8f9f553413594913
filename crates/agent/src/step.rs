//! Step schema
//!
//! Wire form of a step is a JSON object with a `step` discriminator:
//!
//! ```json
//! { "step": "TOOL", "tool": "list_files", "input": "." }
//! ```
//!
//! Which other fields are allowed is fixed by the kind. A field whose value
//! is `null` counts as absent.

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Every field name the wire format knows about
const WIRE_FIELDS: [&str; 5] = ["step", "content", "tool", "input", "output"];

/// Name of the structured-output schema sent with each model query
pub const SCHEMA_NAME: &str = "agent_step";

/// Tools the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    ReadFile,
    WriteFile,
    CreateDirectory,
    ListFiles,
    ExecuteCommand,
    SearchCode,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::ReadFile,
        ToolName::WriteFile,
        ToolName::CreateDirectory,
        ToolName::ListFiles,
        ToolName::ExecuteCommand,
        ToolName::SearchCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ReadFile => "read_file",
            ToolName::WriteFile => "write_file",
            ToolName::CreateDirectory => "create_directory",
            ToolName::ListFiles => "list_files",
            ToolName::ExecuteCommand => "execute_command",
            ToolName::SearchCode => "search_code",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownTool(s.to_string()))
    }
}

/// Step discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Start,
    Plan,
    Tool,
    Observe,
    Output,
}

impl StepKind {
    /// Kinds the model is allowed to emit
    pub const EMITTED: [StepKind; 4] = [
        StepKind::Start,
        StepKind::Plan,
        StepKind::Tool,
        StepKind::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Start => "START",
            StepKind::Plan => "PLAN",
            StepKind::Tool => "TOOL",
            StepKind::Observe => "OBSERVE",
            StepKind::Output => "OUTPUT",
        }
    }

    fn parse(s: &str) -> Result<Self, SchemaError> {
        match s {
            "START" => Ok(StepKind::Start),
            "PLAN" => Ok(StepKind::Plan),
            "TOOL" => Ok(StepKind::Tool),
            "OBSERVE" => Ok(StepKind::Observe),
            "OUTPUT" => Ok(StepKind::Output),
            other => Err(SchemaError::UnknownKind(other.to_string())),
        }
    }

    /// Fields this kind must carry, besides `step`
    fn required_fields(&self) -> &'static [&'static str] {
        match self {
            StepKind::Start | StepKind::Plan | StepKind::Output => &["content"],
            StepKind::Tool => &["tool", "input"],
            StepKind::Observe => &["tool", "input", "output"],
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ways a model reply can violate the step contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("reply is not valid JSON: {0}")]
    Malformed(String),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("reply has no \"step\" field")]
    MissingKind,

    #[error("unknown step kind \"{0}\"")]
    UnknownKind(String),

    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    #[error("field \"{0}\" must be a string")]
    WrongType(String),

    #[error("{kind} step is missing required field \"{field}\"")]
    MissingField { kind: StepKind, field: &'static str },

    #[error("{kind} step must not carry field \"{field}\"")]
    UnexpectedField { kind: StepKind, field: &'static str },

    #[error("unknown tool \"{0}\"")]
    UnknownTool(String),

    #[error("OBSERVE steps come from tool results and cannot be emitted by the model")]
    ObserveFromModel,
}

/// One unit of the model/system protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Start { content: String },
    Plan { content: String },
    Tool { tool: ToolName, input: String },
    Observe {
        tool: ToolName,
        input: String,
        output: String,
    },
    Output { content: String },
}

impl Step {
    pub fn observe(tool: ToolName, input: impl Into<String>, output: impl Into<String>) -> Self {
        Step::Observe {
            tool,
            input: input.into(),
            output: output.into(),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Step::Start { .. } => StepKind::Start,
            Step::Plan { .. } => StepKind::Plan,
            Step::Tool { .. } => StepKind::Tool,
            Step::Observe { .. } => StepKind::Observe,
            Step::Output { .. } => StepKind::Output,
        }
    }

    /// Validate any step, OBSERVE included
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        parse_step(raw)
    }

    /// Validate a step produced by the model
    pub fn parse_emitted(raw: &str) -> Result<Self, SchemaError> {
        parse_emitted(raw)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Step::Start { content } => json!({ "step": "START", "content": content }),
            Step::Plan { content } => json!({ "step": "PLAN", "content": content }),
            Step::Tool { tool, input } => {
                json!({ "step": "TOOL", "tool": tool.as_str(), "input": input })
            }
            Step::Observe {
                tool,
                input,
                output,
            } => json!({
                "step": "OBSERVE",
                "tool": tool.as_str(),
                "input": input,
                "output": output
            }),
            Step::Output { content } => json!({ "step": "OUTPUT", "content": content }),
        }
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Compact JSON wire form
impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Validate a raw step. All-or-nothing: the first violation is returned and
/// no partial step is ever produced.
pub fn parse_step(raw: &str) -> Result<Step, SchemaError> {
    let (kind, fields) = read_fields(raw)?;
    build_step(kind, fields)
}

/// Like [`parse_step`], but OBSERVE is refused before any of its fields are
/// looked at.
pub fn parse_emitted(raw: &str) -> Result<Step, SchemaError> {
    let (kind, fields) = read_fields(raw)?;
    if kind == StepKind::Observe {
        return Err(SchemaError::ObserveFromModel);
    }
    build_step(kind, fields)
}

fn read_fields(raw: &str) -> Result<(StepKind, Map<String, Value>), SchemaError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(SchemaError::EmptyReply);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| SchemaError::Malformed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(SchemaError::NotAnObject);
    };

    let kind = match fields.get("step") {
        None | Some(Value::Null) => return Err(SchemaError::MissingKind),
        Some(Value::String(s)) => StepKind::parse(s)?,
        Some(_) => return Err(SchemaError::WrongType("step".to_string())),
    };

    Ok((kind, fields))
}

fn build_step(kind: StepKind, mut fields: Map<String, Value>) -> Result<Step, SchemaError> {
    fields.remove("step");

    let mut present = Map::new();
    for (name, value) in fields {
        if !WIRE_FIELDS.contains(&name.as_str()) {
            return Err(SchemaError::UnknownField(name));
        }
        match value {
            Value::Null => {}
            Value::String(_) => {
                present.insert(name, value);
            }
            _ => return Err(SchemaError::WrongType(name)),
        }
    }

    for name in present.keys() {
        if !kind.required_fields().contains(&name.as_str()) {
            let field = WIRE_FIELDS
                .into_iter()
                .find(|f| *f == name.as_str())
                .unwrap_or("step");
            return Err(SchemaError::UnexpectedField { kind, field });
        }
    }

    let mut take = |field: &'static str| -> Result<String, SchemaError> {
        match present.remove(field) {
            Some(Value::String(s)) => Ok(s),
            _ => Err(SchemaError::MissingField { kind, field }),
        }
    };

    let step = match kind {
        StepKind::Start => Step::Start {
            content: take("content")?,
        },
        StepKind::Plan => Step::Plan {
            content: take("content")?,
        },
        StepKind::Output => Step::Output {
            content: take("content")?,
        },
        StepKind::Tool => {
            let tool = take("tool")?.parse()?;
            Step::Tool {
                tool,
                input: take("input")?,
            }
        }
        StepKind::Observe => {
            let tool = take("tool")?.parse()?;
            Step::Observe {
                tool,
                input: take("input")?,
                output: take("output")?,
            }
        }
    };

    Ok(step)
}

/// Unwrap a reply wrapped in a Markdown code fence
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// JSON Schema for one model-emitted step, restricted to `tools`
pub fn response_schema(tools: &[ToolName]) -> Value {
    let kinds: Vec<&str> = StepKind::EMITTED.iter().map(|k| k.as_str()).collect();
    let mut tool_names: Vec<Value> = tools.iter().map(|t| json!(t.as_str())).collect();
    tool_names.push(Value::Null);

    json!({
        "type": "object",
        "properties": {
            "step": { "type": "string", "enum": kinds },
            "content": { "type": ["string", "null"] },
            "tool": { "type": ["string", "null"], "enum": tool_names },
            "input": { "type": ["string", "null"] }
        },
        "required": ["step", "content", "tool", "input"],
        "additionalProperties": false
    })
}
