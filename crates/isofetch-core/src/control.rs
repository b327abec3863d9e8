//! Control protocol for a running `isofetch run`: one command per line over a
//! Unix socket, one reply line per command.
//!
//! ```text
//! cancel 42   ->  ok | inactive
//! ```
//! Anything else gets `error <reason>`.

use std::path::PathBuf;

use crate::store::JobId;

pub const REPLY_OK: &str = "ok";
pub const REPLY_INACTIVE: &str = "inactive";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Cancel(JobId),
}

impl ControlCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("cancel"), Some(id), None) => id
                .parse::<JobId>()
                .map(ControlCommand::Cancel)
                .map_err(|_| format!("bad job id: {id}")),
            (Some(cmd), _, _) => Err(format!("unknown command: {cmd}")),
            (None, _, _) => Err("empty command".to_string()),
        }
    }

    /// Wire form, newline included.
    pub fn to_line(self) -> String {
        match self {
            ControlCommand::Cancel(id) => format!("cancel {id}\n"),
        }
    }
}

/// Reply line for a cancel request.
pub fn cancel_reply(fired: bool) -> &'static str {
    if fired {
        REPLY_OK
    } else {
        REPLY_INACTIVE
    }
}

/// Default path for the control socket (same XDG state dir as the DB).
pub fn default_control_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("isofetch")?.get_state_home();
    Ok(dir.join("control.sock"))
}
