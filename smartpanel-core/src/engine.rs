use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::debounce::Debouncer;
use crate::error::SettingsError;
use crate::executor::CommandExecutor;
use crate::host::{self, ContentObserver, Notifier, PanelHost};
use crate::reconcile::{self, Decision, Transition};
use crate::settings::ConfigSource;
use crate::state::PanelState;

/// Host notifications that may change what should be on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceEvent {
    TabsChanged,
    VisibleEditorsChanged,
    /// Fires mid-way through editor switches, so it waits an extra
    /// `editor_settle` before being considered.
    ActiveEditorChanged,
}

/// Commands a user can bind to keys or run from a palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    #[serde(rename = "smartPanel.maximizePanel")]
    ForceMaximize,
    #[serde(rename = "smartPanel.restorePanel")]
    ForceRestore,
    #[serde(rename = "smartPanel.toggleAutoMaximize")]
    ToggleAutoMaximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How long the operation lock stays held after a command completes.
    pub lock_cooldown: Duration,
    pub editor_settle: Duration,
    /// Delay before the first pass after activation.
    pub workspace_load: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            lock_cooldown: Duration::from_millis(150),
            editor_settle: Duration::from_millis(100),
            workspace_load: Duration::from_millis(500),
        }
    }
}

/// Everything the engine needs from the host.
#[derive(Clone)]
pub struct Collaborators {
    pub host: Rc<dyn PanelHost>,
    pub observer: Rc<dyn ContentObserver>,
    pub config: Rc<dyn ConfigSource>,
    pub notifier: Rc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A command was in flight or cooling down; the pass was skipped.
    Busy,
    Disabled,
    InSync(PanelState),
    /// The content count could not be read; nothing was changed.
    ObserverUnavailable,
    Applied(Transition),
    /// The command failed or was refused by the lock; state is unchanged.
    NotApplied(Transition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualOutcome {
    AlreadyThere,
    Applied(Transition),
    NotApplied(Transition),
}

/// The panel reconciliation engine.
///
/// Cheap to clone; all clones share one state. Runs on a single-threaded
/// `LocalSet`: `activate` must be called from inside one. After
/// `deactivate` no host command is issued until `activate` is called again.
#[derive(Clone)]
pub struct SmartPanel {
    inner: Rc<Inner>,
}

struct Inner {
    state: Cell<PanelState>,
    shut_down: Cell<bool>,
    /// Bumped on every deactivation so commands started before it cannot
    /// record their result afterwards.
    session: Cell<u64>,
    executor: CommandExecutor,
    debouncer: Debouncer,
    observer: Rc<dyn ContentObserver>,
    config: Rc<dyn ConfigSource>,
    notifier: Rc<dyn Notifier>,
    timings: Timings,
}

impl SmartPanel {
    pub fn new(collaborators: Collaborators, timings: Timings) -> Self {
        let Collaborators {
            host,
            observer,
            config,
            notifier,
        } = collaborators;
        Self {
            inner: Rc::new(Inner {
                state: Cell::new(PanelState::Normal),
                shut_down: Cell::new(false),
                session: Cell::new(0),
                executor: CommandExecutor::new(host, notifier.clone(), timings.lock_cooldown),
                debouncer: Debouncer::new(),
                observer,
                config,
                notifier,
                timings,
            }),
        }
    }

    pub fn state(&self) -> PanelState {
        self.inner.state.get()
    }

    /// Start processing events and schedule the initial probe once the
    /// host workspace has had time to load.
    pub fn activate(&self) {
        self.inner.shut_down.set(false);
        log::info!("Smart Panel is now active");
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        self.inner.debouncer.start(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    SmartPanel { inner }.reconcile_now().await;
                }
            }
        });

        let delay = self.inner.timings.workspace_load + self.inner.config.snapshot().debounce();
        log::info!("Initial reconciliation scheduled in {:?}", delay);
        self.inner.debouncer.notify(delay);
    }

    pub fn handle_event(&self, event: WorkspaceEvent) {
        if self.inner.shut_down.get() {
            log::debug!("{:?} ignored, not active", event);
            return;
        }
        let mut delay = self.inner.config.snapshot().debounce();
        if event == WorkspaceEvent::ActiveEditorChanged {
            delay += self.inner.timings.editor_settle;
        }
        log::debug!("{:?}: reconciliation in {:?}", event, delay);
        self.inner.debouncer.notify(delay);
    }

    /// One full pass: read settings and content, then move the panel if it
    /// is not where it should be.
    pub async fn reconcile_now(&self) -> ReconcileOutcome {
        let inner = &self.inner;
        if inner.executor.lock().is_held() {
            log::debug!("Skipping reconciliation - operation in progress");
            return ReconcileOutcome::Busy;
        }

        let settings = inner.config.snapshot();
        if !settings.enable_auto_maximize {
            log::info!("Auto-maximize disabled");
            return ReconcileOutcome::Disabled;
        }

        let total = match inner.observer.open_surface_count().await {
            Ok(total) => total,
            Err(e) => {
                log::warn!("Could not count open editors, skipping: {}", e);
                return ReconcileOutcome::ObserverUnavailable;
            }
        };
        let current = inner.state.get();
        log::debug!(
            "totalTabs={}, hasContent={}, currentState={}, behavior={:?}",
            total,
            total > 0,
            current,
            settings.editor_open_behavior
        );

        match reconcile::reconcile(
            current,
            total > 0,
            settings.editor_open_behavior,
            settings.enable_auto_maximize,
        ) {
            Decision::Disabled => ReconcileOutcome::Disabled,
            Decision::InSync(state) => {
                log::debug!("No action needed - already in target state: {}", state);
                ReconcileOutcome::InSync(state)
            }
            Decision::Transition(transition) => {
                log::info!(
                    "State change required: {} → {}",
                    transition.from,
                    transition.to
                );
                if self.apply(transition, "auto").await {
                    ReconcileOutcome::Applied(transition)
                } else {
                    ReconcileOutcome::NotApplied(transition)
                }
            }
        }
    }

    pub async fn force_maximize(&self) -> ManualOutcome {
        self.force(PanelState::Maximized).await
    }

    pub async fn force_restore(&self) -> ManualOutcome {
        self.force(PanelState::Normal).await
    }

    /// Flip the auto-maximize setting. Does not reconcile; the next content
    /// change picks the new value up.
    pub fn toggle_auto_maximize(&self) -> Result<bool, SettingsError> {
        let enabled = !self.inner.config.snapshot().enable_auto_maximize;
        if let Err(e) = self.inner.config.set_enable_auto_maximize(enabled) {
            log::error!("Failed to update enableAutoMaximize: {}", e);
            host::warn(
                self.inner.notifier.as_ref(),
                "Failed to update auto-maximize setting",
            );
            return Err(e);
        }
        let status = if enabled { "enabled" } else { "disabled" };
        log::info!("Auto-maximize {}", status);
        host::info(
            self.inner.notifier.as_ref(),
            &format!("Auto-maximize {}", status),
        );
        Ok(enabled)
    }

    pub async fn run_user_command(&self, command: UserCommand) {
        match command {
            UserCommand::ForceMaximize => {
                self.force_maximize().await;
            }
            UserCommand::ForceRestore => {
                self.force_restore().await;
            }
            UserCommand::ToggleAutoMaximize => {
                // Failures are already logged and shown to the user.
                if self.toggle_auto_maximize().is_err() {
                    log::debug!("enableAutoMaximize left unchanged");
                }
            }
        }
    }

    /// Cancel pending work and forget everything we know about the panel.
    pub fn deactivate(&self) {
        let inner = &self.inner;
        inner.shut_down.set(true);
        inner.session.set(inner.session.get() + 1);
        inner.debouncer.shutdown();
        inner.executor.lock().force_release();
        inner.state.set(PanelState::Normal);
        log::info!("Smart Panel is now inactive");
    }

    async fn force(&self, target: PanelState) -> ManualOutcome {
        let current = self.inner.state.get();
        log::info!(
            "Manual {} requested, current state: {}",
            target,
            current
        );
        let notifier = self.inner.notifier.as_ref();

        let Some(transition) = Transition::plan(current, target) else {
            let message = match target {
                PanelState::Maximized => "Panel is already maximized",
                _ => "Panel is already in normal size",
            };
            host::info(notifier, message);
            return ManualOutcome::AlreadyThere;
        };

        if !self.apply(transition, "manual").await {
            return ManualOutcome::NotApplied(transition);
        }
        let message = match target {
            PanelState::Maximized => "Panel maximized",
            _ => "Panel restored to normal size",
        };
        host::info(notifier, message);
        ManualOutcome::Applied(transition)
    }

    /// Issue the transition's command and, on success, record its target
    /// as the confirmed state.
    async fn apply(&self, transition: Transition, reason: &str) -> bool {
        let inner = &self.inner;
        if inner.shut_down.get() {
            log::debug!("Not active, {} not issued", transition.command);
            return false;
        }
        let session = inner.session.get();
        let ok = inner
            .executor
            .execute(transition.command, &transition.failure_message())
            .await;
        if !ok {
            return false;
        }
        if inner.session.get() != session {
            log::debug!("Deactivated while {} was running", transition.command);
            return false;
        }
        let old = inner.state.replace(transition.to);
        log::debug!(
            "State changed from {} → {} ({}, after {})",
            old,
            transition.to,
            reason,
            transition.command
        );
        true
    }

    #[cfg(test)]
    fn seed_state(&self, state: PanelState) {
        self.inner.state.set(state);
    }
}
