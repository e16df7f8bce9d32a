//! Traits for everything the engine consumes from, or issues to, the host.
//!
//! The engine runs on a single-threaded `LocalSet`, so none of these require
//! `Send`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::state::HostCommand;

/// Runs one panel primitive in the host.
#[async_trait(?Send)]
pub trait PanelHost {
    async fn execute(&self, command: HostCommand) -> Result<(), HostError>;
}

/// Reports how many editor surfaces are open, summed over every tab group.
#[async_trait(?Send)]
pub trait ContentObserver {
    async fn open_surface_count(&self) -> Result<usize, HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warning,
}

/// Transient user-facing messages.
pub trait Notifier {
    fn notify(&self, level: MessageLevel, message: &str);
}

pub(crate) const MESSAGE_PREFIX: &str = "Smart Panel: ";

pub(crate) fn info(notifier: &dyn Notifier, message: &str) {
    notifier.notify(MessageLevel::Info, &format!("{}{}", MESSAGE_PREFIX, message));
}

pub(crate) fn warn(notifier: &dyn Notifier, message: &str) {
    notifier.notify(
        MessageLevel::Warning,
        &format!("{}{}", MESSAGE_PREFIX, message),
    );
}
