use std::rc::Rc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use smartpanel_core::{SettingsStore, SmartPanel};
use smartpanel_protocol::{parse_event, HostEvent};

use crate::bridge::StdioBridge;

/// Read host events until `Shutdown` or end of input, then deactivate.
///
/// User commands run as separate local tasks: they wait on replies that
/// only this loop can deliver.
pub async fn run_session<R: AsyncBufRead + Unpin>(
    input: R,
    engine: SmartPanel,
    bridge: Rc<StdioBridge>,
    settings: Rc<SettingsStore>,
) {
    engine.activate();

    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                log::info!("Host closed the connection");
                break;
            }
            Err(e) => {
                log::warn!("Failed to read from host: {}", e);
                break;
            }
        };

        let event = match parse_event(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Ignoring malformed host message: {}", e);
                continue;
            }
        };

        if bridge.resolve(&event) {
            continue;
        }
        if let Some(workspace_event) = event.workspace_event() {
            engine.handle_event(workspace_event);
            continue;
        }

        match event {
            HostEvent::InvokeCommand { command } => {
                log::debug!("User command {:?}", command);
                let engine = engine.clone();
                tokio::task::spawn_local(async move {
                    engine.run_user_command(command).await;
                });
            }
            HostEvent::ConfigurationChanged { settings: updated } => {
                log::info!("Configuration updated by host: {:?}", updated);
                settings.replace(updated);
            }
            HostEvent::Shutdown => {
                log::info!("Shutdown requested by host");
                break;
            }
            _ => {}
        }
    }

    engine.deactivate();
    bridge.fail_pending();
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartpanel_core::{
        Collaborators, ConfigSource, EditorOpenBehavior, HostCommand, MessageLevel, PanelSettings,
        PanelState, Timings,
    };
    use smartpanel_protocol::EngineMessage;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};
    use tokio::sync::mpsc;
    use tokio::task::{JoinHandle, LocalSet};

    struct Harness {
        host_in: DuplexStream,
        engine_out: mpsc::UnboundedReceiver<EngineMessage>,
        engine: SmartPanel,
        settings: Rc<SettingsStore>,
        session: JoinHandle<()>,
    }

    fn start() -> Harness {
        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = Rc::new(StdioBridge::new(tx, Duration::from_secs(5)));
        let settings = Rc::new(SettingsStore::in_memory(PanelSettings::default()));
        let engine = SmartPanel::new(
            Collaborators {
                host: bridge.clone(),
                observer: bridge.clone(),
                config: settings.clone(),
                notifier: bridge.clone(),
            },
            Timings::default(),
        );
        let (host_in, session_in) = tokio::io::duplex(4096);
        let session = tokio::task::spawn_local(run_session(
            BufReader::new(session_in),
            engine.clone(),
            bridge,
            settings.clone(),
        ));
        Harness {
            host_in,
            engine_out: rx,
            engine,
            settings,
            session,
        }
    }

    async fn send(host_in: &mut DuplexStream, line: &str) {
        host_in.write_all(line.as_bytes()).await.unwrap();
        host_in.write_all(b"\n").await.unwrap();
    }

    async fn answer_count(h: &mut Harness, count: usize) {
        match h.engine_out.recv().await {
            Some(EngineMessage::CountSurfaces { request_id }) => {
                send(
                    &mut h.host_in,
                    &format!(
                        r#"{{"type":"SurfaceCount","request_id":{},"count":{}}}"#,
                        request_id, count
                    ),
                )
                .await;
            }
            other => panic!("expected CountSurfaces, got {:?}", other),
        }
    }

    async fn accept_command(h: &mut Harness) -> HostCommand {
        match h.engine_out.recv().await {
            Some(EngineMessage::ExecuteCommand {
                request_id,
                command,
            }) => {
                send(
                    &mut h.host_in,
                    &format!(
                        r#"{{"type":"CommandResult","request_id":{},"ok":true}}"#,
                        request_id
                    ),
                )
                .await;
                command
            }
            other => panic!("expected ExecuteCommand, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn startup_probe_maximizes_empty_workspace() {
        LocalSet::new()
            .run_until(async {
                let mut h = start();
                answer_count(&mut h, 0).await;
                assert_eq!(
                    accept_command(&mut h).await,
                    HostCommand::ToggleMaximizedPanel
                );
                tokio::time::sleep(Duration::from_millis(10)).await;
                assert_eq!(h.engine.state(), PanelState::Maximized);

                send(&mut h.host_in, r#"{"type":"Shutdown"}"#).await;
                h.session.await.unwrap();
                assert_eq!(h.engine.state(), PanelState::Normal);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn tab_change_after_startup_restores_panel() {
        LocalSet::new()
            .run_until(async {
                let mut h = start();
                answer_count(&mut h, 0).await;
                accept_command(&mut h).await;
                tokio::time::sleep(Duration::from_millis(300)).await;

                send(&mut h.host_in, r#"{"type":"TabsChanged"}"#).await;
                answer_count(&mut h, 1).await;
                assert_eq!(
                    accept_command(&mut h).await,
                    HostCommand::ToggleMaximizedPanel
                );
                tokio::time::sleep(Duration::from_millis(10)).await;
                assert_eq!(h.engine.state(), PanelState::Normal);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn invoked_command_reports_back() {
        LocalSet::new()
            .run_until(async {
                let mut h = start();
                send(
                    &mut h.host_in,
                    r#"{"type":"InvokeCommand","command":"smartPanel.maximizePanel"}"#,
                )
                .await;
                assert_eq!(
                    accept_command(&mut h).await,
                    HostCommand::ToggleMaximizedPanel
                );
                match h.engine_out.recv().await {
                    Some(EngineMessage::ShowMessage { level, message }) => {
                        assert_eq!(level, MessageLevel::Info);
                        assert_eq!(message, "Smart Panel: Panel maximized");
                    }
                    other => panic!("expected ShowMessage, got {:?}", other),
                }
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn configuration_push_and_garbage_lines() {
        LocalSet::new()
            .run_until(async {
                let h = start();
                let mut host_in = h.host_in;
                send(&mut host_in, "this is not json").await;
                send(
                    &mut host_in,
                    r#"{"type":"ConfigurationChanged","settings":{"editorOpenBehavior":"hidden","enableAutoMaximize":false}}"#,
                )
                .await;
                drop(host_in);
                h.session.await.unwrap();

                let snapshot = h.settings.snapshot();
                assert_eq!(snapshot.editor_open_behavior, EditorOpenBehavior::Hidden);
                assert!(!snapshot.enable_auto_maximize);
            })
            .await;
    }
}
