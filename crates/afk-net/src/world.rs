//! Cached view of the world state the server pushes to the client.
//!
//! The TCP transport keeps one [`WorldView`] per connection behind a mutex:
//! the connection task applies inbound updates, the session handle answers
//! queries from it. Navigation state lives here as well because steering is
//! recomputed on every inbound [`PlayerState`].

use std::collections::BTreeMap;

use glam::{DVec3, IVec3};
use rustc_hash::FxHashMap;

use crate::messages::{
    BlockUpdate, ControlInput, EntityUpdate, InventorySlot, Look, PlayerState, WireMessage,
};
use crate::session::{
    Block, Control, Entity, GoalNearXZ, ItemStack, MovementProfile, Orientation, look_angles,
};

/// Cached blocks and entities farther than this from the player are forgotten
/// whenever a new player state arrives.
pub const RETAIN_RADIUS: f64 = 64.0;

/// Straight-line navigation state.
#[derive(Debug, Default)]
struct NavState {
    goal: Option<GoalNearXZ>,
    profile: MovementProfile,
    /// Whether forward (and maybe sprint) are currently held for navigation.
    steering: bool,
}

/// Everything the client knows about its surroundings.
#[derive(Debug, Default)]
pub struct WorldView {
    position: DVec3,
    orientation: Orientation,
    blocks: FxHashMap<IVec3, Block>,
    entities: FxHashMap<u64, Entity>,
    inventory: BTreeMap<u8, ItemStack>,
    nav: NavState,
}

impl WorldView {
    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
    }

    /// Record an orientation the client itself just sent.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    /// Non-empty inventory stacks ordered by slot.
    pub fn inventory(&self) -> Vec<ItemStack> {
        self.inventory.values().cloned().collect()
    }

    // --- Inbound updates ---

    /// Apply an authoritative player state and return any steering messages
    /// the navigator wants to send in response.
    pub fn apply_player_state(&mut self, state: &PlayerState) -> Vec<WireMessage> {
        self.position = DVec3::from_array(state.position);
        self.orientation = Orientation {
            yaw: state.yaw,
            pitch: state.pitch,
        };
        self.forget_distant();
        self.steer()
    }

    pub fn apply_block(&mut self, update: &BlockUpdate) {
        let position = IVec3::from_array(update.position);
        let block = Block {
            position,
            name: update.name.clone(),
            diggable: update.diggable,
        };
        if block.is_air() {
            self.blocks.remove(&position);
        } else {
            self.blocks.insert(position, block);
        }
    }

    pub fn apply_entity(&mut self, update: &EntityUpdate) {
        self.entities.insert(
            update.entity_id,
            Entity {
                id: update.entity_id,
                kind: update.kind,
                name: update.name.clone(),
                position: DVec3::from_array(update.position),
                eye_height: update.eye_height,
            },
        );
    }

    pub fn remove_entity(&mut self, entity_id: u64) {
        self.entities.remove(&entity_id);
    }

    pub fn apply_inventory(&mut self, update: &InventorySlot) {
        if update.count == 0 {
            self.inventory.remove(&update.slot);
        } else {
            self.inventory.insert(
                update.slot,
                ItemStack {
                    slot: update.slot,
                    name: update.name.clone(),
                    count: update.count,
                },
            );
        }
    }

    fn forget_distant(&mut self) {
        let origin = self.position;
        self.blocks
            .retain(|_, b| block_center(b).distance(origin) <= RETAIN_RADIUS);
        self.entities
            .retain(|_, e| e.position.distance(origin) <= RETAIN_RADIUS);
    }

    // --- Queries ---

    pub fn find_block(&self, radius: f64, matches: &dyn Fn(&Block) -> bool) -> Option<Block> {
        let origin = self.position;
        self.blocks
            .values()
            .filter(|b| matches(b))
            .map(|b| (block_center(b).distance(origin), b))
            .filter(|(d, _)| *d <= radius)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, b)| b.clone())
    }

    pub fn nearest_entity(
        &self,
        radius: f64,
        matches: &dyn Fn(&Entity) -> bool,
    ) -> Option<Entity> {
        let origin = self.position;
        self.entities
            .values()
            .filter(|e| matches(e))
            .map(|e| (e.position.distance(origin), e))
            .filter(|(d, _)| *d <= radius)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, e)| e.clone())
    }

    // --- Navigation ---

    pub fn set_movements(&mut self, profile: MovementProfile) {
        self.nav.profile = profile;
    }

    pub fn set_goal(&mut self, goal: Option<GoalNearXZ>) {
        self.nav.goal = goal;
    }

    pub fn is_moving(&self) -> bool {
        self.nav.goal.is_some()
    }

    /// Drop the goal and return the messages that release navigation controls.
    pub fn stop(&mut self) -> Vec<WireMessage> {
        self.nav.goal = None;
        self.release_steering()
    }

    fn release_steering(&mut self) -> Vec<WireMessage> {
        if !std::mem::take(&mut self.nav.steering) {
            return Vec::new();
        }
        [Control::Forward, Control::Sprint]
            .into_iter()
            .map(|control| {
                WireMessage::ControlInput(ControlInput {
                    control,
                    active: false,
                })
            })
            .collect()
    }

    fn steer(&mut self) -> Vec<WireMessage> {
        let Some(goal) = self.nav.goal else {
            return self.release_steering();
        };
        if goal.reached_by(self.position) {
            self.nav.goal = None;
            return self.release_steering();
        }

        let target = DVec3::new(goal.x, self.position.y, goal.z);
        let facing = look_angles(self.position, target);
        self.orientation = Orientation {
            yaw: facing.yaw,
            pitch: 0.0,
        };
        let mut out = vec![WireMessage::Look(Look {
            yaw: facing.yaw,
            pitch: 0.0,
        })];

        if !self.nav.steering {
            self.nav.steering = true;
            out.push(WireMessage::ControlInput(ControlInput {
                control: Control::Forward,
                active: true,
            }));
            if self.nav.profile.allow_sprinting {
                out.push(WireMessage::ControlInput(ControlInput {
                    control: Control::Sprint,
                    active: true,
                }));
            }
        }
        out
    }
}

fn block_center(block: &Block) -> DVec3 {
    block.position.as_dvec3() + DVec3::splat(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EntityKind;

    fn state_at(x: f64, z: f64) -> PlayerState {
        PlayerState {
            tick: 0,
            position: [x, 64.0, z],
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    fn block(position: [i32; 3], name: &str) -> BlockUpdate {
        BlockUpdate {
            position,
            name: name.to_string(),
            diggable: true,
        }
    }

    #[test]
    fn test_find_block_picks_nearest_match() {
        let mut world = WorldView::default();
        world.apply_player_state(&state_at(0.0, 0.0));
        world.apply_block(&block([3, 64, 0], "dirt"));
        world.apply_block(&block([1, 64, 0], "dirt"));
        world.apply_block(&block([0, 64, 1], "bedrock"));

        let found = world.find_block(4.5, &|b| b.name == "dirt").unwrap();
        assert_eq!(found.position, IVec3::new(1, 64, 0));
    }

    #[test]
    fn test_find_block_respects_radius() {
        let mut world = WorldView::default();
        world.apply_block(&block([10, 0, 0], "dirt"));
        assert!(world.find_block(4.5, &|_| true).is_none());
    }

    #[test]
    fn test_air_update_removes_block() {
        let mut world = WorldView::default();
        world.apply_block(&block([1, 0, 0], "dirt"));
        world.apply_block(&block([1, 0, 0], "air"));
        assert!(world.find_block(10.0, &|_| true).is_none());
    }

    #[test]
    fn test_nearest_entity_filters_kind() {
        let mut world = WorldView::default();
        let entity = |id, kind, x| EntityUpdate {
            entity_id: id,
            kind,
            name: None,
            position: [x, 0.0, 0.0],
            eye_height: 1.62,
        };
        world.apply_entity(&entity(1, EntityKind::Mob, 1.0));
        world.apply_entity(&entity(2, EntityKind::Player, 5.0));

        let found = world
            .nearest_entity(16.0, &|e| e.kind == EntityKind::Player)
            .unwrap();
        assert_eq!(found.id, 2);

        world.remove_entity(2);
        assert!(
            world
                .nearest_entity(16.0, &|e| e.kind == EntityKind::Player)
                .is_none()
        );
    }

    #[test]
    fn test_far_entries_forgotten_on_move() {
        let mut world = WorldView::default();
        world.apply_player_state(&state_at(0.0, 0.0));
        world.apply_block(&block([2, 64, 0], "dirt"));
        world.apply_block(&block([200, 64, 0], "dirt"));
        world.apply_entity(&EntityUpdate {
            entity_id: 7,
            kind: EntityKind::Mob,
            name: None,
            position: [5.0, 64.0, 0.0],
            eye_height: 1.62,
        });
        assert_eq!(world.blocks.len(), 2);

        world.apply_player_state(&state_at(1.0, 0.0));
        assert_eq!(world.blocks.len(), 1);
        assert_eq!(world.entities.len(), 1);

        world.apply_player_state(&state_at(500.0, 0.0));
        assert!(world.blocks.is_empty());
        assert!(world.entities.is_empty());
    }

    #[test]
    fn test_empty_inventory_slot_removed() {
        let mut world = WorldView::default();
        world.apply_inventory(&InventorySlot {
            slot: 36,
            name: "dirt".to_string(),
            count: 12,
        });
        assert_eq!(world.inventory().len(), 1);
        world.apply_inventory(&InventorySlot {
            slot: 36,
            name: "dirt".to_string(),
            count: 0,
        });
        assert!(world.inventory().is_empty());
    }

    #[test]
    fn test_navigation_presses_forward_once_then_releases_on_arrival() {
        let mut world = WorldView::default();
        world.set_goal(Some(GoalNearXZ {
            x: 5.0,
            z: 0.0,
            range: 1.0,
        }));

        let first = world.apply_player_state(&state_at(0.0, 0.0));
        assert!(first.contains(&WireMessage::ControlInput(ControlInput {
            control: Control::Forward,
            active: true,
        })));

        let second = world.apply_player_state(&state_at(2.0, 0.0));
        assert_eq!(second.len(), 1, "only a look update while already steering");

        let arrived = world.apply_player_state(&state_at(4.5, 0.0));
        assert!(!world.is_moving());
        assert!(arrived.contains(&WireMessage::ControlInput(ControlInput {
            control: Control::Forward,
            active: false,
        })));
    }

    #[test]
    fn test_sprint_follows_profile() {
        let mut world = WorldView::default();
        world.set_movements(MovementProfile {
            allow_sprinting: true,
            can_dig: false,
        });
        world.set_goal(Some(GoalNearXZ {
            x: 0.0,
            z: 20.0,
            range: 1.0,
        }));
        let out = world.apply_player_state(&state_at(0.0, 0.0));
        assert!(out.contains(&WireMessage::ControlInput(ControlInput {
            control: Control::Sprint,
            active: true,
        })));
    }

    #[test]
    fn test_stop_without_steering_sends_nothing() {
        let mut world = WorldView::default();
        world.set_goal(Some(GoalNearXZ {
            x: 9.0,
            z: 9.0,
            range: 1.0,
        }));
        assert!(world.stop().is_empty());
        assert!(!world.is_moving());
    }
}
