//! TCP client implementing the [`Connector`] / [`GameSession`] surface.
//!
//! Each [`TcpConnector::connect`] call spawns one connection task that owns
//! the socket for its whole life: it logs in, applies inbound world updates to
//! a shared [`WorldView`], forwards outbound commands, runs the keepalive
//! check, and reports exactly one [`SessionEvent::Ended`] when it stops.
//! Dropping the [`TcpSession`] handle stops the task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use glam::{DVec3, IVec3};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::framing::{FrameConfig, FrameError, FrameReader, FrameWriter};
use crate::messages::{
    ChatLine, ControlInput, LoginRequest, Look, Ping, PlayerAction, Quit, WireMessage,
};
use crate::session::{
    Block, ConnectOptions, Connector, Control, Entity, GameSession, GoalNearXZ, ItemStack,
    MovementProfile, Navigator, Orientation, SessionEvent,
};
use crate::world::WorldView;

/// Errors that end a connection abnormally.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket-level failure (connect refused, reset, ...).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Framing or decoding failure.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The server refused the login.
    #[error("login rejected: {0}")]
    LoginRejected(String),
    /// Nothing was received for a whole keepalive interval.
    #[error("keepalive timeout: nothing received for {0:?}")]
    KeepaliveTimeout(Duration),
}

/// Opens TCP sessions.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    frame: FrameConfig,
}

impl Connector for TcpConnector {
    type Session = TcpSession;

    fn connect(
        &mut self,
        options: &ConnectOptions,
    ) -> (TcpSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let world = Arc::new(Mutex::new(WorldView::default()));

        let connection = Connection {
            options: options.clone(),
            frame: self.frame.clone(),
            world: Arc::clone(&world),
            events: event_tx,
        };
        tokio::spawn(connection.run(outbound_rx, shutdown_rx));

        let session = TcpSession {
            username: options.username.clone(),
            world,
            outbound: outbound_tx,
            _shutdown_tx: shutdown_tx,
        };
        (session, event_rx)
    }
}

// ---------------------------------------------------------------------------
// Session handle
// ---------------------------------------------------------------------------

/// Handle to one TCP connection.
pub struct TcpSession {
    username: String,
    world: Arc<Mutex<WorldView>>,
    outbound: mpsc::UnboundedSender<WireMessage>,
    /// Never sent on; dropping it with the handle stops the connection task.
    _shutdown_tx: watch::Sender<bool>,
}

impl TcpSession {
    fn world(&self) -> MutexGuard<'_, WorldView> {
        // A poisoned view only means a query panicked mid-read; the data is still usable.
        self.world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, msg: WireMessage) {
        // The connection task may already be gone; commands on a dead session are no-ops.
        let _ = self.outbound.send(msg);
    }
}

impl GameSession for TcpSession {
    fn username(&self) -> &str {
        &self.username
    }

    fn position(&self) -> DVec3 {
        self.world().position()
    }

    fn orientation(&self) -> Orientation {
        self.world().orientation()
    }

    fn inventory(&self) -> Vec<ItemStack> {
        self.world().inventory()
    }

    fn find_block(&self, radius: f64, matches: &dyn Fn(&Block) -> bool) -> Option<Block> {
        self.world().find_block(radius, matches)
    }

    fn nearest_entity(&self, radius: f64, matches: &dyn Fn(&Entity) -> bool) -> Option<Entity> {
        self.world().nearest_entity(radius, matches)
    }

    fn set_control_state(&self, control: Control, active: bool) {
        self.send(WireMessage::ControlInput(ControlInput { control, active }));
    }

    fn clear_control_states(&self) {
        for control in Control::ALL {
            self.set_control_state(control, false);
        }
    }

    fn look(&self, yaw: f32, pitch: f32) {
        self.world().set_orientation(Orientation { yaw, pitch });
        self.send(WireMessage::Look(Look { yaw, pitch }));
    }

    fn dig(&self, position: IVec3) {
        self.send(WireMessage::Action(PlayerAction::Dig {
            position: position.to_array(),
        }));
    }

    fn swing_arm(&self) {
        self.send(WireMessage::Action(PlayerAction::SwingArm));
    }

    fn select_slot(&self, slot: u8) {
        self.send(WireMessage::Action(PlayerAction::SelectSlot { slot }));
    }

    fn toss(&self, slot: u8, count: u32) {
        self.send(WireMessage::Action(PlayerAction::Drop { slot, count }));
    }

    fn chat(&self, message: &str) {
        self.send(WireMessage::Chat(ChatLine {
            sender: String::new(),
            content: message.to_string(),
        }));
    }

    fn quit(&self, reason: &str) {
        self.send(WireMessage::Quit(Quit {
            reason: reason.to_string(),
        }));
    }
}

impl Navigator for TcpSession {
    fn set_movements(&self, profile: MovementProfile) {
        self.world().set_movements(profile);
    }

    fn set_goal(&self, goal: Option<GoalNearXZ>) {
        self.world().set_goal(goal);
    }

    fn is_moving(&self) -> bool {
        self.world().is_moving()
    }

    fn stop(&self) {
        let release = self.world().stop();
        for msg in release {
            self.send(msg);
        }
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

/// How a connection loop finished without a transport error.
enum Finish {
    Kicked(String),
    Closed(String),
}

struct Connection {
    options: ConnectOptions,
    frame: FrameConfig,
    world: Arc<Mutex<WorldView>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Connection {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn world(&self) -> MutexGuard<'_, WorldView> {
        self.world.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run the connection to completion and report how it ended.
    async fn run(
        self,
        outbound: mpsc::UnboundedReceiver<WireMessage>,
        shutdown: watch::Receiver<bool>,
    ) {
        let reason = match self.drive(outbound, shutdown).await {
            Ok(Finish::Kicked(reason)) => {
                tracing::info!("Kicked from {}: {}", self.options.address(), reason);
                self.emit(SessionEvent::Kicked(reason.clone()));
                format!("kicked: {reason}")
            }
            Ok(Finish::Closed(reason)) => reason,
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", self.options.address(), e);
                self.emit(SessionEvent::Error(e.to_string()));
                e.to_string()
            }
        };
        self.emit(SessionEvent::Ended(reason));
    }

    async fn drive(
        &self,
        mut outbound: mpsc::UnboundedReceiver<WireMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Finish, TransportError> {
        let address = self.options.address();
        let stream = tokio::select! {
            result = TcpStream::connect(&address) => result?,
            _ = shutdown.changed() => return Ok(Finish::Closed("closed before connecting".into())),
        };
        stream.set_nodelay(true)?;
        tracing::debug!("TCP connection to {} established, logging in", address);

        let (reader, writer) = stream.into_split();
        let mut writer = FrameWriter::new(writer, self.frame.clone());
        writer
            .send(&WireMessage::LoginRequest(LoginRequest {
                username: self.options.username.clone(),
                client_version: self.options.version.clone(),
                view_distance: self.options.view_distance,
                auth: self.options.auth.clone(),
            }))
            .await?;

        // Frame reads are not cancel-safe, so they run in their own task.
        let (inbound_tx, mut inbound) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_loop(
            FrameReader::new(reader, self.frame.clone()),
            inbound_tx,
        ));

        let check_interval = self.options.liveness_check_interval;
        let mut keepalive = tokio::time::interval(check_interval / 3);
        let mut last_heard = Instant::now();
        let mut sequence = 0u32;
        let mut established = false;

        let result = loop {
            tokio::select! {
                frame = inbound.recv() => {
                    let msg = match frame {
                        Some(Ok(msg)) => msg,
                        Some(Err(FrameError::ConnectionClosed)) | None => {
                            break Ok(Finish::Closed("connection closed by server".into()));
                        }
                        Some(Err(e)) => break Err(e.into()),
                    };
                    last_heard = Instant::now();
                    match self.handle_inbound(msg, &mut established) {
                        Ok(Inbound::Continue(replies)) => {
                            let mut failed = None;
                            for reply in &replies {
                                if let Err(e) = writer.send(reply).await {
                                    failed = Some(e);
                                    break;
                                }
                            }
                            if let Some(e) = failed {
                                break Err(e.into());
                            }
                        }
                        Ok(Inbound::Finish(finish)) => break Ok(finish),
                        Err(e) => break Err(e),
                    }
                }
                Some(msg) = outbound.recv() => {
                    if let WireMessage::Quit(Quit { reason }) = &msg {
                        let reason = format!("quit: {reason}");
                        let _ = writer.send(&msg).await;
                        break Ok(Finish::Closed(reason));
                    }
                    if let Err(e) = writer.send(&msg).await {
                        break Err(e.into());
                    }
                }
                _ = keepalive.tick() => {
                    if last_heard.elapsed() > check_interval {
                        break Err(TransportError::KeepaliveTimeout(check_interval));
                    }
                    sequence = sequence.wrapping_add(1);
                    if let Err(e) = writer.send(&WireMessage::Ping(Ping { sequence })).await {
                        break Err(e.into());
                    }
                }
                _ = shutdown.changed() => {
                    break Ok(Finish::Closed("session closed locally".into()));
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Apply one inbound message. Returns messages to send back, or how the
    /// connection finished.
    fn handle_inbound(
        &self,
        msg: WireMessage,
        established: &mut bool,
    ) -> Result<Inbound, TransportError> {
        let mut replies = Vec::new();
        match msg {
            WireMessage::LoginResponse(response) => {
                if !response.accepted {
                    return Err(TransportError::LoginRejected(response.reason));
                }
                self.world().set_position(DVec3::from_array(response.spawn));
                *established = true;
                tracing::info!(
                    "Logged in to {} as {}",
                    self.options.address(),
                    self.options.username
                );
                self.emit(SessionEvent::Established);
            }
            WireMessage::Kick(kick) => return Ok(Inbound::Finish(Finish::Kicked(kick.reason))),
            WireMessage::PlayerState(state) => {
                replies = self.world().apply_player_state(&state);
                if *established {
                    self.emit(SessionEvent::PhysicsTick);
                }
            }
            WireMessage::BlockUpdate(update) => self.world().apply_block(&update),
            WireMessage::EntityUpdate(update) => self.world().apply_entity(&update),
            WireMessage::EntityRemoved(removed) => self.world().remove_entity(removed.entity_id),
            WireMessage::InventorySlot(update) => self.world().apply_inventory(&update),
            WireMessage::Chat(line) => self.emit(SessionEvent::Chat {
                username: line.sender,
                message: line.content,
            }),
            WireMessage::Ping(ping) => replies.push(WireMessage::Pong(ping)),
            WireMessage::Pong(_) => {}
            other => tracing::trace!("Ignoring client-bound message {:?}", other),
        }
        Ok(Inbound::Continue(replies))
    }
}

enum Inbound {
    Continue(Vec<WireMessage>),
    Finish(Finish),
}

/// Forward decoded frames until the stream fails or closes.
async fn read_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    inbound: mpsc::UnboundedSender<Result<WireMessage, FrameError>>,
) {
    loop {
        let result = reader.read_message().await;
        let failed = result.is_err();
        if inbound.send(result).is_err() || failed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ChatLine, Kick, LoginResponse, PlayerState};
    use afk_config::AuthMode;
    use tokio::net::TcpListener;
    use tokio::net::tcp::OwnedWriteHalf;

    type ServerSide = (
        FrameReader<OwnedReadHalf>,
        FrameWriter<OwnedWriteHalf>,
    );

    fn options(port: u16) -> ConnectOptions {
        ConnectOptions {
            host: "127.0.0.1".to_string(),
            port,
            username: "afk_keeper".to_string(),
            version: "1.20.4".to_string(),
            view_distance: None,
            auth: AuthMode::Offline,
            liveness_check_interval: Duration::from_secs(30),
        }
    }

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    /// Accept one client and consume its login request.
    async fn accept_login(listener: &TcpListener) -> (ServerSide, LoginRequest) {
        let (stream, _) = listener.accept().await.unwrap();
        let (r, w) = stream.into_split();
        let mut reader = FrameReader::new(r, FrameConfig::default());
        let writer = FrameWriter::new(w, FrameConfig::default());
        let WireMessage::LoginRequest(login) = reader.read_message().await.unwrap() else {
            panic!("first message must be a login request");
        };
        ((reader, writer), login)
    }

    fn accept(spawn: [f64; 3]) -> WireMessage {
        WireMessage::LoginResponse(LoginResponse {
            accepted: true,
            reason: String::new(),
            spawn,
        })
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("event within 60s")
            .expect("event stream open")
    }

    #[tokio::test]
    async fn test_login_emits_established_and_sets_spawn() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let (session, mut events) = connector.connect(&options(port));

        let ((_reader, mut writer), login) = accept_login(&listener).await;
        assert_eq!(login.username, "afk_keeper");
        assert_eq!(login.client_version, "1.20.4");

        writer.send(&accept([1.0, 64.0, -2.0])).await.unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::Established);
        assert_eq!(session.position(), DVec3::new(1.0, 64.0, -2.0));
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_end() {
        let (listener, port) = listener().await;
        drop(listener);
        let mut connector = TcpConnector::default();
        let (_session, mut events) = connector.connect(&options(port));

        assert!(matches!(next_event(&mut events).await, SessionEvent::Error(_)));
        assert!(matches!(next_event(&mut events).await, SessionEvent::Ended(_)));
    }

    #[tokio::test]
    async fn test_rejected_login_is_error_not_kick() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let (_session, mut events) = connector.connect(&options(port));

        let ((_reader, mut writer), _) = accept_login(&listener).await;
        writer
            .send(&WireMessage::LoginResponse(LoginResponse {
                accepted: false,
                reason: "outdated client".to_string(),
                spawn: [0.0; 3],
            }))
            .await
            .unwrap();

        match next_event(&mut events).await {
            SessionEvent::Error(message) => assert!(message.contains("outdated client")),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(matches!(next_event(&mut events).await, SessionEvent::Ended(_)));
    }

    #[tokio::test]
    async fn test_kick_reports_kicked_then_end() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let (_session, mut events) = connector.connect(&options(port));

        let ((_reader, mut writer), _) = accept_login(&listener).await;
        writer.send(&accept([0.0; 3])).await.unwrap();
        writer
            .send(&WireMessage::Kick(Kick {
                reason: "idle".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(next_event(&mut events).await, SessionEvent::Established);
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::Kicked("idle".to_string())
        );
        assert!(matches!(next_event(&mut events).await, SessionEvent::Ended(_)));
        assert!(events.recv().await.is_none(), "nothing after the end");
    }

    #[tokio::test]
    async fn test_player_state_and_chat_become_events() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let (_session, mut events) = connector.connect(&options(port));

        let ((_reader, mut writer), _) = accept_login(&listener).await;
        writer.send(&accept([0.0; 3])).await.unwrap();
        writer
            .send(&WireMessage::PlayerState(PlayerState {
                tick: 1,
                position: [0.0, 64.0, 0.0],
                yaw: 0.0,
                pitch: 0.0,
            }))
            .await
            .unwrap();
        writer
            .send(&WireMessage::Chat(ChatLine {
                sender: "Alex".to_string(),
                content: "hi afk_keeper".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(next_event(&mut events).await, SessionEvent::Established);
        assert_eq!(next_event(&mut events).await, SessionEvent::PhysicsTick);
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::Chat {
                username: "Alex".to_string(),
                message: "hi afk_keeper".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_quit_sends_quit_and_ends() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let (session, mut events) = connector.connect(&options(port));

        let ((mut reader, mut writer), _) = accept_login(&listener).await;
        writer.send(&accept([0.0; 3])).await.unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::Established);

        session.quit("watchdog");
        assert_eq!(
            reader.read_message().await.unwrap(),
            WireMessage::Quit(Quit {
                reason: "watchdog".to_string()
            })
        );
        match next_event(&mut events).await {
            SessionEvent::Ended(reason) => assert_eq!(reason, "quit: watchdog"),
            other => panic!("expected end, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_commands_reach_the_server() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let (session, mut events) = connector.connect(&options(port));

        let ((mut reader, mut writer), _) = accept_login(&listener).await;
        writer.send(&accept([0.0; 3])).await.unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::Established);

        session.set_control_state(Control::Jump, true);
        session.select_slot(4);
        session.chat("hello");

        assert_eq!(
            reader.read_message().await.unwrap(),
            WireMessage::ControlInput(ControlInput {
                control: Control::Jump,
                active: true,
            })
        );
        assert_eq!(
            reader.read_message().await.unwrap(),
            WireMessage::Action(PlayerAction::SelectSlot { slot: 4 })
        );
        assert!(matches!(
            reader.read_message().await.unwrap(),
            WireMessage::Chat(ChatLine { content, .. }) if content == "hello"
        ));
    }

    #[tokio::test]
    async fn test_dropping_session_ends_connection() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let (session, mut events) = connector.connect(&options(port));

        let ((_reader, mut writer), _) = accept_login(&listener).await;
        writer.send(&accept([0.0; 3])).await.unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::Established);

        drop(session);
        assert!(matches!(next_event(&mut events).await, SessionEvent::Ended(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_hits_keepalive_timeout() {
        let (listener, port) = listener().await;
        let mut connector = TcpConnector::default();
        let mut opts = options(port);
        opts.liveness_check_interval = Duration::from_secs(3);
        let (_session, mut events) = connector.connect(&opts);

        // Keep the socket open but never answer.
        let (_server_side, _) = accept_login(&listener).await;

        match next_event(&mut events).await {
            SessionEvent::Error(message) => assert!(message.contains("keepalive")),
            other => panic!("expected keepalive error, got {other:?}"),
        }
    }
}
