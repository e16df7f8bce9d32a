//! Latest-wins coalescing of change notifications.
//!
//! Callers post `Schedule` messages; a single consumer task keeps at most one
//! pending deadline and runs the action once the channel has been quiet
//! until that deadline. The action reads live state when it runs, so
//! anything that changed during the burst is seen.

use std::cell::RefCell;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceMsg {
    Schedule(Duration),
    Cancel,
}

pub struct Debouncer {
    tx: RefCell<mpsc::UnboundedSender<DebounceMsg>>,
    rx: RefCell<Option<mpsc::UnboundedReceiver<DebounceMsg>>>,
    task: RefCell<Option<JoinHandle<()>>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: RefCell::new(tx),
            rx: RefCell::new(Some(rx)),
            task: RefCell::new(None),
        }
    }

    /// Spawn the consumer on the current `LocalSet`. Notifications sent
    /// before this are not lost. No effect while a consumer is running.
    pub fn start<F, Fut>(&self, action: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let Some(rx) = self.rx.borrow_mut().take() else {
            log::debug!("Debouncer already started");
            return;
        };
        let handle = tokio::task::spawn_local(run(rx, action));
        *self.task.borrow_mut() = Some(handle);
    }

    /// Replace any pending run with one `delay` from now.
    pub fn notify(&self, delay: Duration) {
        if self.tx.borrow().send(DebounceMsg::Schedule(delay)).is_err() {
            log::debug!("Debouncer stopped, dropping notification");
        }
    }

    /// Drop the pending run, if any, without running it.
    pub fn cancel(&self) {
        let _ = self.tx.borrow().send(DebounceMsg::Cancel);
    }

    /// Stop the consumer. A pass already running is aborted at its next
    /// await point. Anything scheduled so far is discarded; a later `start`
    /// begins from an empty channel.
    pub fn shutdown(&self) {
        if let Some(handle) = self.task.borrow_mut().take() {
            handle.abort();
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *self.tx.borrow_mut() = tx;
        *self.rx.borrow_mut() = Some(rx);
    }
}

async fn run<F, Fut>(mut rx: mpsc::UnboundedReceiver<DebounceMsg>, action: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut deadline: Option<Instant> = None;
    let mut superseded: u32 = 0;

    loop {
        let msg = match deadline {
            None => match rx.recv().await {
                Some(msg) => msg,
                None => return,
            },
            Some(at) => {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(msg) => msg,
                        None => return,
                    },
                    _ = tokio::time::sleep_until(at) => {
                        deadline = None;
                        if superseded > 0 {
                            log::debug!("Coalesced {} change notification(s)", superseded);
                        }
                        superseded = 0;
                        action().await;
                        continue;
                    }
                }
            }
        };

        match msg {
            DebounceMsg::Schedule(delay) => {
                if deadline.is_some() {
                    superseded += 1;
                }
                deadline = Some(Instant::now() + delay);
            }
            DebounceMsg::Cancel => {
                if deadline.take().is_some() {
                    log::debug!("Pending reconciliation cancelled");
                }
                superseded = 0;
            }
        }
    }
}
