//! Per-turn conversation history

use stepwise_provider::Message;

use crate::step::{SchemaError, Step};

/// Who produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    /// Tool result synthesized by the orchestrator
    Observation,
}

impl Role {
    /// Chat role used on the wire; observations travel as user messages
    pub fn wire_role(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User | Role::Observation => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Step(Step),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub role: Role,
    pub content: Content,
}

impl Entry {
    pub fn to_message(&self) -> Message {
        let content = match &self.content {
            Content::Text(text) => text.clone(),
            Content::Step(step) => step.to_string(),
        };
        Message {
            role: self.role.wire_role().to_string(),
            content,
        }
    }
}

/// Append-only, totally ordered log for one user turn
///
/// There is no way to remove or reorder entries; the log is dropped with the
/// turn.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<Entry>,
}

impl History {
    /// Start a turn: system prompt followed by the user's query
    pub fn seeded(system_prompt: impl Into<String>, query: impl Into<String>) -> Self {
        let mut history = Self::default();
        history.push(Role::System, Content::Text(system_prompt.into()));
        history.push(Role::User, Content::Text(query.into()));
        history
    }

    fn push(&mut self, role: Role, content: Content) {
        self.entries.push(Entry { role, content });
    }

    /// Append a validated step. OBSERVE is recorded as an observation, every
    /// other kind as an assistant message.
    pub fn push_step(&mut self, step: Step) {
        let role = match step {
            Step::Observe { .. } => Role::Observation,
            _ => Role::Assistant,
        };
        self.push(role, Content::Step(step));
    }

    /// Record a reply that failed validation together with the correction
    /// sent back to the model. A blank reply leaves no assistant entry.
    pub fn push_rejected(&mut self, raw: impl Into<String>, error: &SchemaError) {
        let raw = raw.into();
        if !raw.trim().is_empty() {
            self.push(Role::Assistant, Content::Text(raw));
        }
        self.push(
            Role::User,
            Content::Text(format!(
                "Your last reply was rejected: {}. Reply with exactly one valid step object.",
                error
            )),
        );
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.entries.iter().filter_map(|e| match &e.content {
            Content::Step(step) => Some(step),
            Content::Text(_) => None,
        })
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.steps().last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_messages(&self) -> Vec<Message> {
        self.entries.iter().map(Entry::to_message).collect()
    }
}
