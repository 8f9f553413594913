//! Human-readable rendering of a turn

use crate::step::Step;
use crate::AgentError;

const INPUT_PREVIEW: usize = 50;
const OUTPUT_PREVIEW: usize = 200;

/// Receives every step of a turn as it is appended, plus the reason when the
/// turn fails. Purely observational.
pub trait Transcript: Send {
    fn step(&mut self, step: &Step);
    fn failed(&mut self, error: &AgentError);
}

/// Display line for one step
pub fn render_step(step: &Step) -> String {
    match step {
        Step::Start { content } => format!("▶ {}", content),
        Step::Plan { content } => format!("◇ {}", content),
        Step::Tool { tool, input } => format!("◆ {}({})", tool, preview(input, INPUT_PREVIEW)),
        Step::Observe { output, .. } => {
            if is_error_output(output) {
                format!("✗ {}", preview(output, OUTPUT_PREVIEW))
            } else {
                format!("◆ → {}", preview(output, OUTPUT_PREVIEW))
            }
        }
        Step::Output { content } => format!("■ {}", content),
    }
}

/// Closing line of a failed turn
pub fn render_failure(error: &AgentError) -> String {
    format!("✗ Turn failed: {}", error)
}

/// Tool results report failure with a leading `Error:` marker
pub fn is_error_output(output: &str) -> bool {
    output.starts_with("Error:")
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Prints each line to stdout as the turn progresses
#[derive(Debug, Default)]
pub struct StdoutTranscript;

impl Transcript for StdoutTranscript {
    fn step(&mut self, step: &Step) {
        println!("{}", render_step(step));
    }

    fn failed(&mut self, error: &AgentError) {
        println!("{}", render_failure(error));
    }
}

/// Collects rendered lines in memory
#[derive(Debug, Default)]
pub struct MemoryTranscript {
    pub lines: Vec<String>,
}

impl Transcript for MemoryTranscript {
    fn step(&mut self, step: &Step) {
        self.lines.push(render_step(step));
    }

    fn failed(&mut self, error: &AgentError) {
        self.lines.push(render_failure(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::ToolName;

    #[test]
    fn test_each_kind_has_its_marker() {
        let lines = [
            render_step(&Step::Start {
                content: "a".into(),
            }),
            render_step(&Step::Plan {
                content: "b".into(),
            }),
            render_step(&Step::Tool {
                tool: ToolName::ReadFile,
                input: "main.rs".into(),
            }),
            render_step(&Step::observe(ToolName::ReadFile, "main.rs", "fn main() {}")),
            render_step(&Step::Output {
                content: "c".into(),
            }),
        ];

        assert_eq!(lines[0], "▶ a");
        assert_eq!(lines[1], "◇ b");
        assert_eq!(lines[2], "◆ read_file(main.rs)");
        assert_eq!(lines[3], "◆ → fn main() {}");
        assert_eq!(lines[4], "■ c");
    }

    #[test]
    fn test_long_tool_input_is_truncated() {
        let input = format!("big.txt|||{}", "x".repeat(100));
        let line = render_step(&Step::Tool {
            tool: ToolName::WriteFile,
            input,
        });
        assert!(line.ends_with("...)"));
        assert!(line.chars().count() < 80);
    }

    #[test]
    fn test_error_observation_marker() {
        let line = render_step(&Step::observe(
            ToolName::ExecuteCommand,
            "exit 1",
            "Error: Command exited with code 1",
        ));
        assert_eq!(line, "✗ Error: Command exited with code 1");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let text = "é".repeat(60);
        let shown = preview(&text, 50);
        assert_eq!(shown.chars().count(), 53);
    }

    #[test]
    fn test_memory_transcript_records_failure() {
        let mut transcript = MemoryTranscript::default();
        transcript.failed(&AgentError::StepLimit(3));
        assert_eq!(
            transcript.lines,
            vec!["✗ Turn failed: no OUTPUT after 3 model queries".to_string()]
        );
    }
}
