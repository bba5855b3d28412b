//! Outbound text protocol
//!
//! Everything the server writes is plain UTF-8 text, one message per
//! line. Chat lines have the form `nickname: text` for both public
//! and private delivery.

/// Banner written to every new connection, one line at a time
pub const WELCOME: &str = "Welcome to chat\n\
Choose a nickname: /nickname <name>\n\
Send a private message: /pm <user> <message>\n\
Report a user: /ban <user>\n\
Delay a public message: /delay <date> <time> <message> (date as YYYY-MM-DD, time as HH:MM, UTC)\n\
Join public chat: /public";

/// Separator between the nickname and the text of a chat line
const SEPARATOR: &str = ": ";

/// Format a chat line as delivered to recipients.
pub fn chat_line(nickname: &str, text: &str) -> String {
    format!("{nickname}{SEPARATOR}{text}")
}

/// Recover the text of a chat line written by `nickname`.
///
/// Returns None if the line was not written by `nickname`.
pub fn strip_sender<'a>(nickname: &str, line: &'a str) -> Option<&'a str> {
    line.strip_prefix(nickname)?.strip_prefix(SEPARATOR)
}
