use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

use crate::host::{self, Notifier, PanelHost};
use crate::state::HostCommand;

/// Re-entrancy guard around host commands.
///
/// Held while a command is in flight and for `cooldown` after it finishes,
/// so panel events echoed back by our own command don't start another one.
pub struct OperationLock {
    in_flight: Cell<bool>,
    cooling_until: Cell<Option<Instant>>,
    cooldown: Duration,
    /// Bumped by `force_release`; guards from an older epoch are inert.
    epoch: Cell<u64>,
}

impl OperationLock {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            in_flight: Cell::new(false),
            cooling_until: Cell::new(None),
            cooldown,
            epoch: Cell::new(0),
        }
    }

    pub fn is_held(&self) -> bool {
        if self.in_flight.get() {
            return true;
        }
        match self.cooling_until.get() {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                self.cooling_until.set(None);
                log::debug!("Operation lock released");
                false
            }
            None => false,
        }
    }

    /// Take the lock, or `None` if someone else holds it. Dropping the guard
    /// starts the cool-down.
    pub fn try_acquire(&self) -> Option<LockGuard<'_>> {
        if self.is_held() {
            return None;
        }
        self.in_flight.set(true);
        Some(LockGuard {
            lock: self,
            epoch: self.epoch.get(),
        })
    }

    /// Clear the lock immediately, skipping any remaining cool-down. A guard
    /// still alive at this point no longer affects the lock when dropped.
    pub fn force_release(&self) {
        self.epoch.set(self.epoch.get() + 1);
        self.in_flight.set(false);
        self.cooling_until.set(None);
    }
}

pub struct LockGuard<'a> {
    lock: &'a OperationLock,
    epoch: u64,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.lock.epoch.get() != self.epoch {
            return;
        }
        self.lock.in_flight.set(false);
        self.lock
            .cooling_until
            .set(Some(Instant::now() + self.lock.cooldown));
    }
}

/// Issues host commands one at a time and turns every failure into `false`.
pub struct CommandExecutor {
    host: Rc<dyn PanelHost>,
    notifier: Rc<dyn Notifier>,
    lock: OperationLock,
}

impl CommandExecutor {
    pub fn new(host: Rc<dyn PanelHost>, notifier: Rc<dyn Notifier>, cooldown: Duration) -> Self {
        Self {
            host,
            notifier,
            lock: OperationLock::new(cooldown),
        }
    }

    pub fn lock(&self) -> &OperationLock {
        &self.lock
    }

    /// Run `command` unless another one holds the lock. Concurrent callers
    /// are dropped, not queued.
    pub async fn execute(&self, command: HostCommand, failure_message: &str) -> bool {
        let Some(_guard) = self.lock.try_acquire() else {
            log::debug!("Operation already in progress, skipping {}", command);
            return false;
        };

        match self.host.execute(command).await {
            Ok(()) => {
                log::debug!("Successfully executed command: {}", command);
                true
            }
            Err(e) => {
                log::error!("{} [{}]: {}", failure_message, command, e);
                host::warn(self.notifier.as_ref(), failure_message);
                false
            }
        }
    }
}
