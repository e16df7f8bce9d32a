use serde::{Deserialize, Serialize};
use smartpanel_core::{HostCommand, MessageLevel, PanelSettings, UserCommand, WorkspaceEvent};

// ---------------------------------------------------------------------------
// Events: host → engine (one JSON object per stdin line)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    TabsChanged,
    VisibleEditorsChanged,
    ActiveEditorChanged,
    InvokeCommand {
        command: UserCommand,
    },
    CommandResult {
        request_id: u64,
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SurfaceCount {
        request_id: u64,
        count: usize,
    },
    ConfigurationChanged {
        settings: PanelSettings,
    },
    Shutdown,
}

impl HostEvent {
    /// The workspace change this event reports, if it is one.
    pub fn workspace_event(&self) -> Option<WorkspaceEvent> {
        match self {
            HostEvent::TabsChanged => Some(WorkspaceEvent::TabsChanged),
            HostEvent::VisibleEditorsChanged => Some(WorkspaceEvent::VisibleEditorsChanged),
            HostEvent::ActiveEditorChanged => Some(WorkspaceEvent::ActiveEditorChanged),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Messages: engine → host (one JSON object per stdout line)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineMessage {
    ExecuteCommand {
        request_id: u64,
        command: HostCommand,
    },
    CountSurfaces {
        request_id: u64,
    },
    ShowMessage {
        level: MessageLevel,
        message: String,
    },
}

/// Parse one line from the host. Blank lines yield `Ok(None)`.
pub fn parse_event(line: &str) -> Result<Option<HostEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}

/// Serialize a message as a single line, newline included.
pub fn encode_message(msg: &EngineMessage) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(msg)?;
    line.push('\n');
    Ok(line)
}
