use std::collections::HashMap;

use super::*;
use crate::types::BridgePosition;

pub type CollisionHandler = fn(&mut Level, EntityId, EntityId) -> Result<(), LevelError>;

#[derive(Clone, Copy)]
struct Binding {
    handler: CollisionHandler,
    swapped: bool,
}

#[derive(Clone, Default)]
pub struct CollisionTable {
    bindings: HashMap<(EntityKind, EntityKind), Binding>,
}

impl CollisionTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(EntityKind::Player, EntityKind::Ghost, player_vs_ghost);
        table.register(EntityKind::Player, EntityKind::Pellet, player_vs_pellet);
        table.register(EntityKind::Player, EntityKind::Fruit, player_vs_fruit);
        table.register(EntityKind::Bullet, EntityKind::Ghost, bullet_vs_ghost);
        for kind in [EntityKind::Player, EntityKind::Ghost] {
            table.register(kind, EntityKind::Hole, character_vs_hole);
        }
        for kind in [EntityKind::Player, EntityKind::Ghost, EntityKind::Bullet] {
            table.register(kind, EntityKind::Teleport, character_vs_teleport);
            table.register(kind, EntityKind::Bridge, character_vs_bridge);
        }
        table
    }

    /// Binds `handler` to `(first, second)` and to the mirrored pair, so the
    /// outcome does not depend on which of the two moved.
    pub fn register(&mut self, first: EntityKind, second: EntityKind, handler: CollisionHandler) {
        self.bindings.insert(
            (first, second),
            Binding {
                handler,
                swapped: false,
            },
        );
        if first != second {
            self.bindings.insert(
                (second, first),
                Binding {
                    handler,
                    swapped: true,
                },
            );
        }
    }

    pub fn is_bound(&self, mover: EntityKind, occupant: EntityKind) -> bool {
        self.bindings.contains_key(&(mover, occupant))
    }

    fn lookup(&self, mover: EntityKind, occupant: EntityKind) -> Option<Binding> {
        self.bindings.get(&(mover, occupant)).copied()
    }
}

impl std::fmt::Debug for CollisionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pairs: Vec<String> = self
            .bindings
            .keys()
            .map(|(mover, occupant)| format!("{mover:?}->{occupant:?}"))
            .collect();
        pairs.sort();
        f.debug_struct("CollisionTable").field("pairs", &pairs).finish()
    }
}

impl Level {
    pub fn collide(&mut self, mover: EntityId, occupant: EntityId) -> Result<(), LevelError> {
        let a = self
            .entities
            .get(&mover)
            .ok_or(LevelError::UnknownEntity(mover))?;
        let b = self
            .entities
            .get(&occupant)
            .ok_or(LevelError::UnknownEntity(occupant))?;
        if !a.bridge.same_level(b.bridge) {
            return Ok(());
        }
        let Some(binding) = self.collisions.lookup(a.kind(), b.kind()) else {
            return Ok(());
        };
        if binding.swapped {
            (binding.handler)(self, occupant, mover)
        } else {
            (binding.handler)(self, mover, occupant)
        }
    }

    pub fn collisions_mut(&mut self) -> &mut CollisionTable {
        &mut self.collisions
    }

    fn start_effect(&mut self, id: EntityId, effect: EffectKind, duration_ms: u64) {
        let now = self.now_ms;
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let timed = match (&mut entity.role, effect) {
            (Role::Player(player), EffectKind::SpeedBoost) => &mut player.speed_boost,
            (Role::Player(player), EffectKind::Paralysis) => &mut player.paralysis,
            (Role::Player(player), EffectKind::Invincibility) => &mut player.invincibility,
            (Role::Player(player), EffectKind::Shooting) => &mut player.shooting,
            (Role::Ghost(ghost), EffectKind::Paralysis) => &mut ghost.paralysis,
            (Role::Ghost(ghost), EffectKind::Acceleration) => &mut ghost.acceleration,
            _ => return,
        };
        timed.activate(now, duration_ms);
        if effect == EffectKind::Paralysis {
            entity.movable = false;
        }
        self.emit(LevelEvent::EffectStarted {
            entity: id,
            effect,
            duration_ms,
        });
    }

    fn eat_ghost(&mut self, player: EntityId, ghost: EntityId) {
        let points = self.hunter.record_eat();
        let respawn_at = self.now_ms + self.config.ghost_respawn_ms;
        if let Some(state) = self.entities.get_mut(&player).and_then(Entity::player_mut) {
            state.score += points;
        }
        self.take_off_board(ghost);
        if let Some(state) = self.entities.get_mut(&ghost).and_then(Entity::ghost_mut) {
            state.feared = false;
            state.blink = false;
            state.phase = GhostPhase::Respawning { respawn_at };
        }
        self.scheduler.cancel(Job::Move(ghost));
        debug!(player = player.0, ghost = ghost.0, points, "ghost eaten");
        self.emit(LevelEvent::GhostEaten {
            ghost,
            by: player,
            points,
        });
    }

    fn kill_player(&mut self, player: EntityId) {
        let Some(entity) = self.entities.get_mut(&player) else {
            return;
        };
        let Some(state) = entity.player_mut() else {
            return;
        };
        if !state.alive {
            return;
        }
        state.alive = false;
        entity.movable = false;
        info!(player = player.0, "player died");
        self.emit(LevelEvent::PlayerDied { player });
    }

    pub(super) fn explode_ghost(&mut self, ghost: EntityId) {
        let remove_at = self.now_ms + GHOST_EXPLODE_MS;
        let Some(state) = self.entities.get_mut(&ghost).and_then(Entity::ghost_mut) else {
            return;
        };
        if state.is_out_of_play() {
            return;
        }
        state.phase = GhostPhase::Exploding { remove_at };
        state.feared = false;
        state.blink = false;
        debug!(ghost = ghost.0, "ghost exploded");
        self.emit(LevelEvent::GhostExploded { ghost });
    }
}

fn player_vs_ghost(level: &mut Level, player: EntityId, ghost: EntityId) -> Result<(), LevelError> {
    let Some(ghost_state) = level.entities.get(&ghost).and_then(Entity::ghost) else {
        return Ok(());
    };
    if ghost_state.is_out_of_play() {
        return Ok(());
    }
    let feared = ghost_state.feared;
    let Some(player_state) = level.entities.get(&player).and_then(Entity::player) else {
        return Ok(());
    };
    if !player_state.alive {
        return Ok(());
    }
    if feared {
        level.eat_ghost(player, ghost);
    } else if !player_state.invincibility.is_active() {
        level.kill_player(player);
    }
    Ok(())
}

fn player_vs_pellet(level: &mut Level, player: EntityId, pellet: EntityId) -> Result<(), LevelError> {
    if !level
        .entities
        .get(&player)
        .and_then(Entity::player)
        .is_some_and(|state| state.alive)
    {
        return Ok(());
    }
    let position = level.cell_position(pellet);
    let Some(removed) = level.despawn(pellet) else {
        return Ok(());
    };
    let Role::Pellet {
        points,
        super_pellet,
    } = removed.role
    else {
        return Err(LevelError::Invariant(format!(
            "{pellet:?} dispatched as a pellet"
        )));
    };
    if let Some(state) = level.entities.get_mut(&player).and_then(Entity::player_mut) {
        state.score += points;
        if super_pellet {
            state.hunter_requested = true;
        }
    }
    let position = position.unwrap_or(Vec2::new(-1, -1));
    level.emit(LevelEvent::PelletEaten {
        by: player,
        points,
        x: position.x,
        y: position.y,
        super_pellet,
    });
    Ok(())
}

fn player_vs_fruit(level: &mut Level, player: EntityId, fruit: EntityId) -> Result<(), LevelError> {
    if !level
        .entities
        .get(&player)
        .and_then(Entity::player)
        .is_some_and(|state| state.alive)
    {
        return Ok(());
    }
    let Some(removed) = level.despawn(fruit) else {
        return Ok(());
    };
    let Role::Fruit(FruitState { kind, .. }) = removed.role else {
        return Err(LevelError::Invariant(format!("{fruit:?} dispatched as a fruit")));
    };
    debug!(player = player.0, ?kind, "fruit eaten");
    level.emit(LevelEvent::FruitEaten {
        fruit,
        kind,
        by: player,
    });
    match kind {
        FruitKind::BellPepper => level.start_effect(player, EffectKind::SpeedBoost, SPEED_BOOST_MS),
        FruitKind::Fish => level.start_effect(player, EffectKind::Paralysis, FISH_PARALYSIS_MS),
        FruitKind::Tomato => {
            level.start_effect(player, EffectKind::Invincibility, INVINCIBILITY_MS)
        }
        FruitKind::KidneyBean => level.start_effect(player, EffectKind::Shooting, SHOOTING_MS),
        FruitKind::Pomegranate => {
            let Some(cell) = level.entities.get(&player).and_then(Entity::cell) else {
                return Ok(());
            };
            let distances = level.board.distances_from(cell);
            let targets: Vec<EntityId> = level
                .entities
                .values()
                .filter(|entity| {
                    entity
                        .ghost()
                        .is_some_and(|ghost| !ghost.is_out_of_play())
                        && entity
                            .cell
                            .and_then(|ghost_cell| distances[ghost_cell.0])
                            .is_some_and(|distance| distance <= POMEGRANATE_RADIUS)
                })
                .map(|entity| entity.id)
                .collect();
            for ghost in targets {
                level.explode_ghost(ghost);
            }
        }
        FruitKind::Potato => {
            for ghost in level.ghosts() {
                level.start_effect(ghost, EffectKind::Acceleration, GHOST_ACCELERATION_MS);
            }
        }
    }
    Ok(())
}

fn bullet_vs_ghost(level: &mut Level, bullet: EntityId, ghost: EntityId) -> Result<(), LevelError> {
    if !level
        .entities
        .get(&bullet)
        .and_then(Entity::bullet)
        .is_some_and(|state| state.alive)
    {
        return Ok(());
    }
    if !level
        .entities
        .get(&ghost)
        .and_then(Entity::ghost)
        .is_some_and(|state| !state.is_out_of_play())
    {
        return Ok(());
    }
    if let Some(state) = level.entities.get_mut(&bullet).and_then(Entity::bullet_mut) {
        state.alive = false;
    }
    level.explode_ghost(ghost);
    Ok(())
}

fn character_vs_hole(level: &mut Level, character: EntityId, hole: EntityId) -> Result<(), LevelError> {
    let position = level.cell_position(hole);
    let Some(removed) = level.despawn(hole) else {
        return Ok(());
    };
    let Role::Hole { trap_ms } = removed.role else {
        return Err(LevelError::Invariant(format!("{hole:?} dispatched as a hole")));
    };
    let position = position.unwrap_or(Vec2::new(-1, -1));
    level.emit(LevelEvent::Trapped {
        entity: character,
        x: position.x,
        y: position.y,
    });
    level.start_effect(character, EffectKind::Paralysis, trap_ms);
    Ok(())
}

fn character_vs_teleport(
    level: &mut Level,
    character: EntityId,
    teleport: EntityId,
) -> Result<(), LevelError> {
    let Some(Role::Teleport { target }) = level.entities.get(&teleport).map(|entity| &entity.role)
    else {
        return Err(LevelError::Invariant(format!(
            "{teleport:?} dispatched as a teleport"
        )));
    };
    let target = (*target).ok_or_else(|| {
        LevelError::Invariant(format!("teleport {teleport:?} has no target"))
    })?;
    if !level.board.is_accessible(target)
        || !level
            .entities
            .get(&character)
            .is_some_and(Entity::is_on_board)
    {
        return Ok(());
    }

    let arrivals: Vec<EntityId> = level.board.occupants(target).to_vec();
    level.relocate(character, target);
    let position = level.board.position(target);
    level.emit(LevelEvent::Teleported {
        entity: character,
        x: position.x,
        y: position.y,
    });

    for occupant in arrivals {
        let Some(entity) = level.entities.get(&occupant) else {
            continue;
        };
        if occupant == character || entity.kind() == EntityKind::Teleport {
            continue;
        }
        if let Role::Bridge { axis } = entity.role {
            if let Some(mover) = level.entities.get_mut(&character) {
                mover.facing = axis.direction();
            }
        }
        level.collide(character, occupant)?;
    }
    Ok(())
}

fn character_vs_bridge(
    level: &mut Level,
    character: EntityId,
    bridge: EntityId,
) -> Result<(), LevelError> {
    let Some(Role::Bridge { axis }) = level.entities.get(&bridge).map(|entity| &entity.role) else {
        return Err(LevelError::Invariant(format!("{bridge:?} dispatched as a bridge")));
    };
    let axis = *axis;
    if let Some(entity) = level.entities.get_mut(&character) {
        entity.bridge = if axis.is_parallel(entity.facing) {
            BridgePosition::OnTop
        } else {
            BridgePosition::Under
        };
    }
    Ok(())
}
