//! Decision core: which panel state we want, and the one host command that
//! gets us there from where we are.

use crate::state::{EditorOpenBehavior, HostCommand, PanelState};

/// A single step from the last confirmed state to a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PanelState,
    pub to: PanelState,
    pub command: HostCommand,
}

impl Transition {
    /// Plan the step `from -> to`, or `None` if there is nothing to do.
    pub fn plan(from: PanelState, to: PanelState) -> Option<Self> {
        command_for(from, to).map(|command| Transition { from, to, command })
    }

    /// Text used in warnings when the host rejects the command.
    pub fn failure_message(&self) -> String {
        let action = match (self.from, self.to) {
            (_, PanelState::Maximized) => "maximize panel",
            (PanelState::Hidden, PanelState::Normal) => "show panel",
            (_, PanelState::Normal) => "restore panel",
            (_, PanelState::Hidden) => "close panel",
        };
        format!("Failed to {} ({} → {})", action, self.from, self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Auto-maximize is switched off; nothing is evaluated.
    Disabled,
    /// Already where we want to be.
    InSync(PanelState),
    Transition(Transition),
}

/// No content means the panel takes the whole window; otherwise it goes to
/// the resting state chosen in settings.
pub fn target_state(content_present: bool, behavior: EditorOpenBehavior) -> PanelState {
    if content_present {
        behavior.resting_state()
    } else {
        PanelState::Maximized
    }
}

/// The host command that moves the panel from `current` to `target`.
///
/// Returns `None` exactly when `current == target`.
pub fn command_for(current: PanelState, target: PanelState) -> Option<HostCommand> {
    use PanelState::*;
    match (current, target) {
        (Hidden, Maximized) | (Normal, Maximized) => Some(HostCommand::ToggleMaximizedPanel),
        (Hidden, Normal) => Some(HostCommand::ShowPanel),
        (Maximized, Normal) => Some(HostCommand::ToggleMaximizedPanel),
        (Normal, Hidden) | (Maximized, Hidden) => Some(HostCommand::ClosePanel),
        (Hidden, Hidden) | (Normal, Normal) | (Maximized, Maximized) => None,
    }
}

pub fn reconcile(
    current: PanelState,
    content_present: bool,
    behavior: EditorOpenBehavior,
    auto_enabled: bool,
) -> Decision {
    if !auto_enabled {
        return Decision::Disabled;
    }
    let target = target_state(content_present, behavior);
    match Transition::plan(current, target) {
        Some(transition) => Decision::Transition(transition),
        None => Decision::InSync(target),
    }
}
