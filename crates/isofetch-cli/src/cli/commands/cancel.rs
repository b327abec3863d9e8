//! `isofetch cancel <id>` – ask the running dispatcher to cancel a job.

use anyhow::{bail, Context, Result};
use isofetch_core::control::{self, REPLY_INACTIVE, REPLY_OK};

use crate::cli::control_socket;

pub async fn run_cancel(id: i64) -> Result<()> {
    let socket = control::default_control_socket_path()?;
    if !socket.exists() {
        bail!("no `isofetch run` is active (no control socket at {})", socket.display());
    }
    let reply = control_socket::send_cancel(&socket, id)
        .await
        .with_context(|| format!("control socket {}", socket.display()))?;
    match reply.as_str() {
        REPLY_OK => println!("Cancelled job {id}"),
        REPLY_INACTIVE => println!("Job {id} is not running"),
        other => bail!("unexpected reply from control socket: {other}"),
    }
    Ok(())
}
