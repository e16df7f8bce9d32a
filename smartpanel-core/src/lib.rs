//! Keeps a tri-state bottom panel (hidden / normal / maximized) in step with
//! the editors open in a host application.
//!
//! Host change events are coalesced by [`debounce::Debouncer`], turned into a
//! target state by [`reconcile`], and applied through
//! [`executor::CommandExecutor`], which lets one host command run at a time.
//! [`engine::SmartPanel`] ties these together with the manual commands.

pub mod debounce;
pub mod engine;
pub mod error;
pub mod executor;
pub mod host;
pub mod reconcile;
pub mod settings;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{
    Collaborators, ManualOutcome, ReconcileOutcome, SmartPanel, Timings, UserCommand,
    WorkspaceEvent,
};
pub use error::{HostError, SettingsError};
pub use host::{ContentObserver, MessageLevel, Notifier, PanelHost};
pub use settings::{ConfigSource, PanelSettings, SettingsStore};
pub use state::{EditorOpenBehavior, HostCommand, PanelState};
