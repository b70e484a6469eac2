//! Input line classification.

/// A recognized line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// End the session.
    Exit,
    /// Ask with retrieved context for the given text.
    Recall(String),
    /// Drop the most recent user/assistant pair.
    Forget,
    /// Store the given text as a memory without asking the model.
    Memorize(String),
    /// Plain chat turn.
    Chat(String),
}

const RECALL: &str = "/recall";
const MEMORIZE: &str = "/memorize";

impl Command {
    /// Classify a raw input line. Blank lines yield `None`.
    ///
    /// `exit` and `/forget` must match the whole line; `/recall` and
    /// `/memorize` are prefixes whose remainder is the argument. All
    /// keywords are case-insensitive.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let command = if trimmed.eq_ignore_ascii_case("exit") {
            Self::Exit
        } else if trimmed.eq_ignore_ascii_case("/forget") {
            Self::Forget
        } else if let Some(rest) = strip_prefix_ignore_case(trimmed, RECALL) {
            Self::Recall(rest.trim().to_string())
        } else if let Some(rest) = strip_prefix_ignore_case(trimmed, MEMORIZE) {
            Self::Memorize(rest.trim().to_string())
        } else {
            Self::Chat(trimmed.to_string())
        };
        Some(command)
    }

    /// Whether handling this command sends a task to the inference worker.
    pub fn submits_task(&self) -> bool {
        matches!(self, Self::Recall(_) | Self::Chat(_))
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}
