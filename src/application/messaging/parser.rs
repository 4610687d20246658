//! Command parser - Recognizes `<prefix><verb>[ <argument>]` messages

use crate::domain::entities::Command;

/// Default command prefix, used when the configuration leaves it empty
pub const DEFAULT_CMD_PREFIX: &str = "!";

/// Extracts commands from message text
#[derive(Debug, Clone)]
pub struct CommandParser {
    command_prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            command_prefix: if prefix.is_empty() {
                DEFAULT_CMD_PREFIX.to_string()
            } else {
                prefix
            },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Parse message text into a command.
    ///
    /// The text is split on its first whitespace. The head must start with
    /// the prefix and carry at least one more character; the tail, trimmed,
    /// becomes the argument.
    pub fn parse(&self, text: &str) -> Option<Command> {
        if text.is_empty() {
            return None;
        }

        let (head, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));

        let verb = head.strip_prefix(self.command_prefix.as_str())?;
        if verb.is_empty() {
            return None;
        }

        Some(Command::new(verb, rest.trim()))
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_with_argument() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("!oncall east-team"), Some(Command::new("oncall", "east-team")));
    }

    #[test]
    fn test_command_without_argument() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("!oncall"), Some(Command::new("oncall", "")));
    }

    #[test]
    fn test_bare_prefix_is_not_a_command() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("!"), None);
        assert_eq!(parser.parse("! oncall"), None);
    }

    #[test]
    fn test_text_without_prefix_is_not_a_command() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("hello"), None);
        assert_eq!(parser.parse("hello !oncall"), None);
        assert_eq!(parser.parse(""), None);
    }

    #[test]
    fn test_argument_is_trimmed() {
        let parser = CommandParser::default();
        assert_eq!(
            parser.parse("!oncall    platform  team  "),
            Some(Command::new("oncall", "platform  team"))
        );
        assert_eq!(parser.parse("!ping\tnow"), Some(Command::new("ping", "now")));
    }

    #[test]
    fn test_multi_character_prefix() {
        let parser = CommandParser::new("bot.");
        assert_eq!(parser.parse("bot.ping"), Some(Command::new("ping", "")));
        assert_eq!(parser.parse("bot."), None);
        assert_eq!(parser.parse("!ping"), None);
    }

    #[test]
    fn test_empty_prefix_falls_back_to_default() {
        let parser = CommandParser::new("");
        assert_eq!(parser.prefix(), "!");
    }
}
