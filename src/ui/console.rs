//! Line-oriented stand-in for the chat window.
//!
//! `/open <contactId>` selects a conversation, `/log` prints the connection
//! status and recent notices, `/quit` exits, any other non-empty line is sent
//! to the selected contact.

use std::io;

use crate::common::{ContactId, UserId};

use super::app::UiUpdate;
use super::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Open(ContactId),
    Send(String),
    Log,
    Quit,
}

/// One read from stdin, after parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(UiCommand),
    /// Shown to the user; the loop keeps reading.
    Invalid(String),
    Nothing,
    Closed,
}

/// Only end of input stops the loop. A line that cannot be read (e.g. not
/// UTF-8) is reported like a bad command.
pub fn read_input(read: io::Result<Option<String>>) -> ConsoleInput {
    match read {
        Ok(None) => ConsoleInput::Closed,
        Ok(Some(line)) => match parse_line(&line) {
            Ok(Some(command)) => ConsoleInput::Command(command),
            Ok(None) => ConsoleInput::Nothing,
            Err(err) => ConsoleInput::Invalid(err),
        },
        Err(err) => {
            log::warn!("Unreadable input line: {err}");
            ConsoleInput::Invalid(format!("could not read line: {err}"))
        }
    }
}

pub fn parse_line(line: &str) -> Result<Option<UiCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(UiCommand::Send(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("open"), Some(id)) => id
            .parse::<ContactId>()
            .map(|id| Some(UiCommand::Open(id)))
            .map_err(|err| format!("invalid contact id `{id}`: {err}")),
        (Some("log"), None) => Ok(Some(UiCommand::Log)),
        (Some("quit"), None) => Ok(Some(UiCommand::Quit)),
        _ => Err(format!("unknown command `/{command}`")),
    }
}

pub fn render(update: &UiUpdate, local_user: UserId) -> String {
    match update {
        UiUpdate::Conversation { contact_id, messages } => {
            let mut out = format!("── chat with {contact_id} ({} messages)", messages.len());
            for message in messages {
                let who = if message.sender_id == local_user {
                    "me".to_string()
                } else {
                    message.sender_id.to_string()
                };
                out.push_str(&format!(
                    "\n[{}] {who}: {}",
                    message.sent_at.format("%H:%M:%S"),
                    message.content
                ));
            }
            out
        }
        UiUpdate::Loading(contact_id) => format!("loading chat with {contact_id}..."),
        UiUpdate::LoadFailed { contact_id, reason } => {
            format!("could not load chat with {contact_id} ({reason}); /open {contact_id} to retry")
        }
        UiUpdate::InboxPreview { contact_id, message } => {
            format!("* new message from {contact_id}: {}", message.content)
        }
        UiUpdate::Notice(message) => format!("! {message}"),
    }
}

pub fn render_notices(state: &AppState) -> String {
    let status = if state.connected { "connected" } else { "offline" };
    let mut out = format!("── {status}, {} notices", state.notices.len());
    for notice in &state.notices {
        out.push_str(&format!(
            "\n[{}] {}: {}",
            notice.timestamp.format("%H:%M:%S"),
            notice.kind,
            notice.message
        ));
    }
    out
}
