//! Command filter: literal prefix match and payload extraction.

/// What a message means to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Text does not start with the prefix.
    NotCommand,
    /// Prefix present but nothing left after trimming.
    Empty,
    /// Content to publish, already trimmed.
    Forward(&'a str),
}

/// Match `text` against `prefix` (exact, case-sensitive, at the very start, no trimming
/// before the test) and return the trimmed remainder.
pub fn parse_command<'a>(text: &'a str, prefix: &str) -> Command<'a> {
    match text.strip_prefix(prefix) {
        None => Command::NotCommand,
        Some(rest) => {
            let content = rest.trim();
            if content.is_empty() {
                Command::Empty
            } else {
                Command::Forward(content)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn forwards_trimmed_payload() {
        assert_eq!(
            parse_command("!post hello world", "!post"),
            Command::Forward("hello world")
        );
        assert_eq!(
            parse_command("!post\n  multi\nline \t", "!post"),
            Command::Forward("multi\nline")
        );
        // no separator required after the prefix
        assert_eq!(parse_command("!posthello", "!post"), Command::Forward("hello"));
    }

    #[test]
    fn whitespace_only_payload_is_empty() {
        assert_eq!(parse_command("!post   ", "!post"), Command::Empty);
        assert_eq!(parse_command("!post", "!post"), Command::Empty);
    }

    #[test]
    fn prefix_must_be_at_start_and_case_sensitive() {
        assert_eq!(parse_command("hi !post x", "!post"), Command::NotCommand);
        assert_eq!(parse_command(" !post x", "!post"), Command::NotCommand);
        assert_eq!(parse_command("!POST x", "!post"), Command::NotCommand);
        assert_eq!(parse_command("", "!post"), Command::NotCommand);
    }

    proptest! {
        #[test]
        fn property_text_without_prefix_is_never_a_command(text in ".*", prefix in "[!/#][a-z]{1,8}") {
            prop_assume!(!text.starts_with(&prefix));
            prop_assert_eq!(parse_command(&text, &prefix), Command::NotCommand);
        }

        #[test]
        fn property_prefix_plus_whitespace_is_empty(ws in "[ \t\r\n]{0,12}", prefix in "[!/#][a-z]{1,8}") {
            let text = format!("{}{}", prefix, ws);
            prop_assert_eq!(parse_command(&text, &prefix), Command::Empty);
        }

        #[test]
        fn property_prefix_plus_payload_forwards_trimmed(payload in ".*", prefix in "[!/#][a-z]{1,8}") {
            prop_assume!(!payload.trim().is_empty());
            let text = format!("{}{}", prefix, payload);
            prop_assert_eq!(parse_command(&text, &prefix), Command::Forward(payload.trim()));
        }
    }
}
