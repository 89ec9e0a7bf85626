use std::sync::{Arc, Mutex};

use super::*;
use crate::map::parse_map;

pub(super) fn options() -> LevelOptions {
    LevelOptions {
        seed: Some(7),
        ..LevelOptions::default()
    }
}

pub(super) fn level_from(rows: &[&str]) -> Level {
    let layout = parse_map(&rows.join("\n")).expect("test map parses");
    Level::new(layout, options()).expect("test level builds")
}

pub(super) fn pos_of(level: &Level, id: EntityId) -> Vec2 {
    level
        .cell_position(id)
        .expect("entity should be on the board")
}

pub(super) fn first_of(level: &Level, kind: EntityKind) -> EntityId {
    level
        .entities()
        .find(|entity| entity.kind() == kind)
        .map(|entity| entity.id)
        .expect("entity of kind")
}

pub(super) fn set_feared(level: &mut Level, ghost: EntityId, feared: bool) {
    if let Some(state) = level.entities.get_mut(&ghost).and_then(Entity::ghost_mut) {
        state.feared = feared;
    }
}

pub(super) struct RecordingObserver(pub Arc<Mutex<Vec<LevelEvent>>>);

impl LevelObserver for RecordingObserver {
    fn on_event(&mut self, event: &LevelEvent) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event.clone());
        }
    }
}
