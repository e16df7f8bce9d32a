//! Host collaborators backed by a line-delimited JSON channel.
//!
//! Requests go out as `EngineMessage`s tagged with a `request_id`; the
//! session loop feeds the host's replies back through [`StdioBridge::resolve`].

use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use smartpanel_core::{
    ContentObserver, HostCommand, HostError, MessageLevel, Notifier, PanelHost,
};
use smartpanel_protocol::{encode_message, EngineMessage, HostEvent};

#[derive(Debug)]
enum Reply {
    Command(Result<(), String>),
    Count(usize),
}

type PendingRequests = RefCell<HashMap<u64, oneshot::Sender<Reply>>>;

pub struct StdioBridge {
    outgoing: mpsc::UnboundedSender<EngineMessage>,
    pending: PendingRequests,
    next_id: Cell<u64>,
    request_timeout: Duration,
}

impl StdioBridge {
    pub fn new(outgoing: mpsc::UnboundedSender<EngineMessage>, request_timeout: Duration) -> Self {
        Self {
            outgoing,
            pending: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            request_timeout,
        }
    }

    /// Route a reply to whoever is waiting on it. Returns `false` if the
    /// event is not a reply at all.
    pub fn resolve(&self, event: &HostEvent) -> bool {
        let (request_id, reply) = match event {
            HostEvent::CommandResult {
                request_id,
                ok,
                error,
            } => {
                let result = if *ok {
                    Ok(())
                } else {
                    Err(error
                        .clone()
                        .unwrap_or_else(|| "command failed".to_string()))
                };
                (*request_id, Reply::Command(result))
            }
            HostEvent::SurfaceCount { request_id, count } => (*request_id, Reply::Count(*count)),
            _ => return false,
        };

        match self.pending.borrow_mut().remove(&request_id) {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => log::debug!("Reply for unknown or expired request {}", request_id),
        }
        true
    }

    /// Fail every outstanding request, e.g. once the host has gone away.
    pub fn fail_pending(&self) {
        let drained: Vec<_> = self.pending.borrow_mut().drain().collect();
        if !drained.is_empty() {
            log::warn!("Dropping {} pending host request(s)", drained.len());
        }
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    async fn request(
        &self,
        label: &str,
        build: impl FnOnce(u64) -> EngineMessage,
    ) -> Result<Reply, HostError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().insert(id, tx);

        if self.outgoing.send(build(id)).is_err() {
            self.pending.borrow_mut().remove(&id);
            return Err(HostError::Disconnected);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(HostError::Disconnected),
            Err(_) => {
                self.pending.borrow_mut().remove(&id);
                Err(HostError::TimedOut {
                    request: label.to_string(),
                    timeout: self.request_timeout,
                })
            }
        }
    }
}

#[async_trait(?Send)]
impl PanelHost for StdioBridge {
    async fn execute(&self, command: HostCommand) -> Result<(), HostError> {
        let reply = self
            .request(command.id(), |request_id| EngineMessage::ExecuteCommand {
                request_id,
                command,
            })
            .await?;
        match reply {
            Reply::Command(result) => result.map_err(HostError::Rejected),
            Reply::Count(_) => Err(HostError::Rejected(format!(
                "host answered `{}` with a surface count",
                command
            ))),
        }
    }
}

#[async_trait(?Send)]
impl ContentObserver for StdioBridge {
    async fn open_surface_count(&self) -> Result<usize, HostError> {
        let reply = self
            .request("count-surfaces", |request_id| EngineMessage::CountSurfaces {
                request_id,
            })
            .await?;
        match reply {
            Reply::Count(count) => Ok(count),
            Reply::Command(_) => Err(HostError::Rejected(
                "host answered a surface count with a command result".to_string(),
            )),
        }
    }
}

impl Notifier for StdioBridge {
    fn notify(&self, level: MessageLevel, message: &str) {
        let msg = EngineMessage::ShowMessage {
            level,
            message: message.to_string(),
        };
        if self.outgoing.send(msg).is_err() {
            log::warn!("Host gone, message not shown: {}", message);
        }
    }
}

/// Drain `rx` onto `out`, one JSON line per message, until the channel
/// closes or the output breaks.
pub async fn write_messages<W: AsyncWrite + Unpin>(
    mut out: W,
    mut rx: mpsc::UnboundedReceiver<EngineMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let line = match encode_message(&msg) {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to encode {:?}: {}", msg, e);
                continue;
            }
        };
        if out.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if out.flush().await.is_err() {
            break;
        }
    }
}
