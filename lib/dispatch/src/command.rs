//! Chat command parsing.
//!
//! Reset and recap match the whole trimmed, lowercased token exactly; the
//! sticker command accepts trailing text after its prefix.

/// Commands the dispatcher intercepts before the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clear the conversation context.
    Reset,
    /// Start the guided recap dialogue.
    Recap,
    /// Render the message media into a sticker directly.
    Sticker,
}

/// Matches a command against an utterance.
#[must_use]
pub fn parse_command(text: &str) -> Option<Command> {
    let token = text.trim().to_lowercase();
    match token.as_str() {
        ".newchat" => Some(Command::Reset),
        ".recap" => Some(Command::Recap),
        _ if token.starts_with(".sticker") || token.starts_with(".stiker") => {
            Some(Command::Sticker)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_commands_match_case_insensitively() {
        assert_eq!(parse_command(".newchat"), Some(Command::Reset));
        assert_eq!(parse_command("  .NewChat  "), Some(Command::Reset));
        assert_eq!(parse_command(".RECAP"), Some(Command::Recap));
    }

    #[test]
    fn exact_commands_reject_trailing_text() {
        assert_eq!(parse_command(".newchat please"), None);
        assert_eq!(parse_command(".recap monthly"), None);
    }

    #[test]
    fn sticker_accepts_both_spellings_and_suffixes() {
        assert_eq!(parse_command(".sticker"), Some(Command::Sticker));
        assert_eq!(parse_command(".stiker round"), Some(Command::Sticker));
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert_eq!(parse_command("tell me about recaps"), None);
        assert_eq!(parse_command(""), None);
    }
}
