//! Control socket: server (during `isofetch run`) and client (`isofetch cancel`).
//! One command line in, one reply line out; see `isofetch_core::control`.

use anyhow::{Context, Result};
use isofetch_core::control::{cancel_reply, ControlCommand};
use isofetch_core::dispatcher::Dispatcher;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Binds `path` (replacing a stale socket) and answers cancel requests
/// against `dispatcher` until the returned task is aborted.
pub fn spawn_control_listener(
    dispatcher: Arc<Dispatcher>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(path);
    let listener = UnixListener::bind(path)
        .with_context(|| format!("bind control socket {}", path.display()))?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    tokio::spawn(serve_connection(stream, dispatcher));
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn serve_connection(stream: UnixStream, dispatcher: Arc<Dispatcher>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let reply = match ControlCommand::parse(&line) {
            Ok(ControlCommand::Cancel(id)) => cancel_reply(dispatcher.cancel(id)).to_string(),
            Err(reason) => format!("error {reason}"),
        };
        if write.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
            break;
        }
    }
}

/// Sends `cancel <job_id>` and returns the trimmed reply line.
pub async fn send_cancel(socket_path: &Path, job_id: i64) -> Result<String> {
    let stream = UnixStream::connect(socket_path).await?;
    let (read, mut write) = stream.into_split();
    write
        .write_all(ControlCommand::Cancel(job_id).to_line().as_bytes())
        .await?;
    let mut reply = String::new();
    BufReader::new(read).read_line(&mut reply).await?;
    Ok(reply.trim().to_string())
}
