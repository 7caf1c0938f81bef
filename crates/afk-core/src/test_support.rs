//! In-memory connector for driving the core in tests.

use std::sync::{Arc, Mutex, MutexGuard};

use afk_net::{
    Block, ConnectOptions, Connector, Control, Entity, GameSession, GoalNearXZ, ItemStack,
    MovementProfile, Navigator, Orientation, SessionEvent,
};
use glam::{DVec3, IVec3};
use tokio::sync::mpsc;

/// Everything a [`MockSession`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Control(Control, bool),
    ClearControls,
    Look(f32, f32),
    Dig(IVec3),
    SwingArm,
    SelectSlot(u8),
    Toss(u8, u32),
    Chat(String),
    Quit(String),
    SetMovements(MovementProfile),
    SetGoal(Option<GoalNearXZ>),
    StopNavigation,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub commands: Vec<Command>,
    pub position: DVec3,
    pub inventory: Vec<ItemStack>,
    pub blocks: Vec<Block>,
    pub entities: Vec<Entity>,
    pub goal: Option<GoalNearXZ>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

/// Test-side handle to one mock connection.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(events) = self.state().events.as_ref() {
            let _ = events.send(event);
        }
    }

    /// Drop the sender so the attempt sees its stream close.
    pub fn close_events(&self) {
        self.state().events = None;
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state().commands.clone()
    }

    pub fn count(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.state().commands.iter().filter(|c| pred(c)).count()
    }

    pub fn quits(&self) -> usize {
        self.count(|c| matches!(c, Command::Quit(_)))
    }

    pub fn set_moving(&self, moving: bool) {
        self.state().goal = moving.then_some(GoalNearXZ {
            x: 100.0,
            z: 100.0,
            range: 1.0,
        });
    }
}

#[derive(Debug)]
pub struct MockSession {
    username: String,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    /// Standalone session for exercising actions without a connector.
    pub fn detached(username: &str) -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                username: username.to_string(),
                state: state.clone(),
            },
            MockHandle { state },
        )
    }

    fn record(&self, command: Command) {
        self.state.lock().unwrap().commands.push(command);
    }
}

impl GameSession for MockSession {
    fn username(&self) -> &str {
        &self.username
    }

    fn position(&self) -> DVec3 {
        self.state.lock().unwrap().position
    }

    fn orientation(&self) -> Orientation {
        Orientation::default()
    }

    fn inventory(&self) -> Vec<ItemStack> {
        self.state.lock().unwrap().inventory.clone()
    }

    fn find_block(&self, radius: f64, matches: &dyn Fn(&Block) -> bool) -> Option<Block> {
        let state = self.state.lock().unwrap();
        state
            .blocks
            .iter()
            .filter(|b| matches(b) && b.position.as_dvec3().distance(state.position) <= radius)
            .min_by(|a, b| {
                let da = a.position.as_dvec3().distance(state.position);
                let db = b.position.as_dvec3().distance(state.position);
                da.total_cmp(&db)
            })
            .cloned()
    }

    fn nearest_entity(&self, radius: f64, matches: &dyn Fn(&Entity) -> bool) -> Option<Entity> {
        let state = self.state.lock().unwrap();
        state
            .entities
            .iter()
            .filter(|e| matches(e) && e.position.distance(state.position) <= radius)
            .min_by(|a, b| {
                a.position
                    .distance(state.position)
                    .total_cmp(&b.position.distance(state.position))
            })
            .cloned()
    }

    fn set_control_state(&self, control: Control, active: bool) {
        self.record(Command::Control(control, active));
    }

    fn clear_control_states(&self) {
        self.record(Command::ClearControls);
    }

    fn look(&self, yaw: f32, pitch: f32) {
        self.record(Command::Look(yaw, pitch));
    }

    fn dig(&self, position: IVec3) {
        self.record(Command::Dig(position));
    }

    fn swing_arm(&self) {
        self.record(Command::SwingArm);
    }

    fn select_slot(&self, slot: u8) {
        self.record(Command::SelectSlot(slot));
    }

    fn toss(&self, slot: u8, count: u32) {
        self.record(Command::Toss(slot, count));
    }

    fn chat(&self, message: &str) {
        self.record(Command::Chat(message.to_string()));
    }

    fn quit(&self, reason: &str) {
        self.record(Command::Quit(reason.to_string()));
    }
}

impl Navigator for MockSession {
    fn set_movements(&self, profile: MovementProfile) {
        self.record(Command::SetMovements(profile));
    }

    fn set_goal(&self, goal: Option<GoalNearXZ>) {
        self.state.lock().unwrap().goal = goal;
        self.record(Command::SetGoal(goal));
    }

    fn is_moving(&self) -> bool {
        self.state.lock().unwrap().goal.is_some()
    }

    fn stop(&self) {
        self.state.lock().unwrap().goal = None;
        self.record(Command::StopNavigation);
    }
}

/// Hands out [`MockSession`]s and remembers a handle to each.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    handles: Arc<Mutex<Vec<MockHandle>>>,
}

impl MockConnector {
    pub fn attempts(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Handle of the `n`th connection, starting at 0.
    pub fn handle(&self, n: usize) -> MockHandle {
        self.handles.lock().unwrap()[n].clone()
    }

    pub fn latest(&self) -> MockHandle {
        self.handles.lock().unwrap().last().cloned().unwrap()
    }
}

impl Connector for MockConnector {
    type Session = MockSession;

    fn connect(
        &mut self,
        options: &ConnectOptions,
    ) -> (Self::Session, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (session, handle) = MockSession::detached(&options.username);
        handle.state().events = Some(tx);
        self.handles.lock().unwrap().push(handle);
        (session, rx)
    }
}
