use serde::{Deserialize, Serialize};
use std::fmt;

/// The three sizes the bottom panel can be in.
///
/// The engine only ever tracks its *last confirmed* state: the value is
/// advanced after the host accepted a command and reset to `Normal` on
/// deactivation. It is never re-read from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelState {
    Hidden,
    #[default]
    Normal,
    Maximized,
}

impl PanelState {
    pub const ALL: [PanelState; 3] = [
        PanelState::Hidden,
        PanelState::Normal,
        PanelState::Maximized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PanelState::Hidden => "hidden",
            PanelState::Normal => "normal",
            PanelState::Maximized => "maximized",
        }
    }
}

impl fmt::Display for PanelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the panel should go once an editor is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorOpenBehavior {
    #[default]
    Normal,
    Hidden,
}

impl EditorOpenBehavior {
    /// Panel state to settle in while content is open.
    pub fn resting_state(self) -> PanelState {
        match self {
            EditorOpenBehavior::Normal => PanelState::Normal,
            EditorOpenBehavior::Hidden => PanelState::Hidden,
        }
    }
}

/// Panel primitives the host exposes. Each one is issued at most once per
/// transition; issuing one from the wrong state is the failure the engine
/// is built to avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostCommand {
    ToggleMaximizedPanel,
    ShowPanel,
    ClosePanel,
}

impl HostCommand {
    pub fn id(self) -> &'static str {
        match self {
            HostCommand::ToggleMaximizedPanel => "toggle-maximized-panel",
            HostCommand::ShowPanel => "show-panel",
            HostCommand::ClosePanel => "close-panel",
        }
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
