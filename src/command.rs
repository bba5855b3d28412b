//! Inbound command language
//!
//! Every inbound line is parsed exactly once into a [`Command`]. A line
//! starting with `/` is a command whose first token selects the kind;
//! anything else is plain chat text.
//!
//! Message bodies are sliced out of the original line by position, so
//! internal whitespace and punctuation survive untouched.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::ParseError;

/// `chrono` format accepted by `/delay <date> <time>`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A parsed inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/public`
    PublicJoin,
    /// `/pm <nickname> <text...>`
    PrivateMessage { target: String, body: String },
    /// `/nickname <nickname>`
    SetNickname { nick: String },
    /// `/ban <nickname>`
    Report { target: String },
    /// `/delay <date> <time> <text...>`
    Delay { when: DateTime<Utc>, body: String },
    /// Any line without a leading `/`
    PlainText { body: String },
    /// Anything that starts with `/` but is not a well-formed command
    Unknown(ParseError),
}

/// Parse one inbound line.
pub fn parse(line: &str) -> Command {
    let Some(rest) = line.strip_prefix('/') else {
        return Command::PlainText {
            body: line.to_string(),
        };
    };

    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (name, args) = rest.split_at(name_end);

    let parsed = match name {
        "" => Err(ParseError::Empty),
        "public" => Ok(Command::PublicJoin),
        "pm" => parse_private_message(args),
        "nickname" => parse_nickname(args),
        "ban" => parse_report(args),
        "delay" => parse_delay(args),
        other => Err(ParseError::UnknownCommand(other.to_string())),
    };

    parsed.unwrap_or_else(Command::Unknown)
}

fn parse_private_message(args: &str) -> Result<Command, ParseError> {
    let (target, body) = split_token(args).ok_or_else(|| missing("pm", "nickname"))?;
    if body.is_empty() {
        return Err(missing("pm", "message"));
    }
    Ok(Command::PrivateMessage {
        target: target.to_string(),
        body: body.to_string(),
    })
}

fn parse_nickname(args: &str) -> Result<Command, ParseError> {
    let (nick, _) = split_token(args).ok_or_else(|| missing("nickname", "nickname"))?;
    Ok(Command::SetNickname {
        nick: nick.to_string(),
    })
}

fn parse_report(args: &str) -> Result<Command, ParseError> {
    let (target, _) = split_token(args).ok_or_else(|| missing("ban", "nickname"))?;
    Ok(Command::Report {
        target: target.to_string(),
    })
}

fn parse_delay(args: &str) -> Result<Command, ParseError> {
    let (date, rest) = split_token(args).ok_or_else(|| missing("delay", "date"))?;
    let (time, body) = split_token(rest).ok_or_else(|| missing("delay", "time"))?;

    let input = format!("{date} {time}");
    let when = NaiveDateTime::parse_from_str(&input, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::InvalidTimestamp { input })?
        .and_utc();

    if body.is_empty() {
        return Err(missing("delay", "message"));
    }
    Ok(Command::Delay {
        when,
        body: body.to_string(),
    })
}

fn missing(command: &'static str, argument: &'static str) -> ParseError {
    ParseError::MissingArgument { command, argument }
}

/// Split off the first whitespace-delimited token.
///
/// The remainder starts right after the whitespace run following the
/// token and is otherwise returned verbatim.
fn split_token(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], input[end..].trim_start())),
        None => Some((input, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse("hello there"),
            Command::PlainText {
                body: "hello there".to_string()
            }
        );
    }

    #[test]
    fn test_public() {
        assert_eq!(parse("/public"), Command::PublicJoin);
        assert_eq!(parse("/public now please"), Command::PublicJoin);
    }

    #[test]
    fn test_private_message_preserves_spacing() {
        assert_eq!(
            parse("/pm bob hello   world"),
            Command::PrivateMessage {
                target: "bob".to_string(),
                body: "hello   world".to_string(),
            }
        );
    }

    #[test]
    fn test_private_message_missing_body() {
        assert_eq!(
            parse("/pm bob"),
            Command::Unknown(ParseError::MissingArgument {
                command: "pm",
                argument: "message"
            })
        );
        assert!(matches!(parse("/pm"), Command::Unknown(_)));
    }

    #[test]
    fn test_nickname() {
        assert_eq!(
            parse("/nickname alice"),
            Command::SetNickname {
                nick: "alice".to_string()
            }
        );
        assert!(matches!(parse("/nickname   "), Command::Unknown(_)));
    }

    #[test]
    fn test_ban() {
        assert_eq!(
            parse("/ban mallory"),
            Command::Report {
                target: "mallory".to_string()
            }
        );
    }

    #[test]
    fn test_delay() {
        let cmd = parse("/delay 2023-01-23 22:26 Hi, i here.");
        let expected = Utc.with_ymd_and_hms(2023, 1, 23, 22, 26, 0).unwrap();
        assert_eq!(
            cmd,
            Command::Delay {
                when: expected,
                body: "Hi, i here.".to_string(),
            }
        );
    }

    #[test]
    fn test_delay_invalid_timestamp_keeps_input() {
        match parse("/delay not-a-date oops hi") {
            Command::Unknown(err @ ParseError::InvalidTimestamp { .. }) => {
                assert_eq!(
                    err,
                    ParseError::InvalidTimestamp {
                        input: "not-a-date oops".to_string()
                    }
                );
                assert!(err.to_string().contains("not-a-date oops"));
            }
            other => panic!("Wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_delay_missing_time() {
        assert_eq!(
            parse("/delay 2023-01-23"),
            Command::Unknown(ParseError::MissingArgument {
                command: "delay",
                argument: "time"
            })
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse("/timer 5 hi"),
            Command::Unknown(ParseError::UnknownCommand("timer".to_string()))
        );
        assert_eq!(parse("/"), Command::Unknown(ParseError::Empty));
        assert_eq!(parse("/ public"), Command::Unknown(ParseError::Empty));
    }

    #[test]
    fn test_split_token() {
        assert_eq!(split_token("  a  b  c "), Some(("a", "b  c ")));
        assert_eq!(split_token("single"), Some(("single", "")));
        assert_eq!(split_token("   "), None);
    }
}
