use super::*;

const AMBUSH_LOOKAHEAD: i32 = 4;
const SHY_DISTANCE: usize = 8;
const FICKLE_CHASE_PROBABILITY: f32 = 0.5;

impl Level {
    pub(super) fn ghost_next_move(&mut self, id: EntityId) -> Option<Direction> {
        let entity = self.entities.get(&id)?;
        let ghost = entity.ghost()?;
        if ghost.is_out_of_play() || !entity.movable {
            return None;
        }
        let cell = entity.cell?;
        let personality = ghost.personality;
        let feared = ghost.feared;
        let came_from = ghost.came_from;

        let open = self.open_directions(id, cell);
        if open.is_empty() {
            return None;
        }
        if feared {
            return self.random_open_direction(&open, came_from);
        }

        let target = match personality {
            GhostPersonality::Chaser => self.nearest_player(cell).map(|(player, _)| player),
            GhostPersonality::Ambusher => self
                .nearest_player(cell)
                .map(|(player, _)| self.ambush_cell(player)),
            GhostPersonality::Fickle => {
                if self.rng.bool(FICKLE_CHASE_PROBABILITY) {
                    self.nearest_player(cell).map(|(player, _)| player)
                } else {
                    None
                }
            }
            GhostPersonality::Shy => self
                .nearest_player(cell)
                .filter(|(_, distance)| *distance > SHY_DISTANCE)
                .map(|(player, _)| player),
            GhostPersonality::Wanderer => None,
        };

        let step = target.and_then(|target| self.board.first_step_toward(cell, target));
        match step {
            Some(direction) if open.contains(&direction) => Some(direction),
            _ => self.random_open_direction(&open, came_from),
        }
    }

    fn open_directions(&self, id: EntityId, cell: CellId) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|direction| {
                self.board
                    .is_accessible(self.board.neighbor(cell, *direction))
                    && !self.blocked_by_bridge(id, cell, *direction)
            })
            .collect()
    }

    fn random_open_direction(
        &mut self,
        open: &[Direction],
        came_from: Option<Direction>,
    ) -> Option<Direction> {
        let forward: Vec<Direction> = open
            .iter()
            .copied()
            .filter(|direction| Some(*direction) != came_from)
            .collect();
        if forward.is_empty() {
            return self.rng.pick(open);
        }
        self.rng.pick(&forward)
    }

    fn nearest_player(&self, from: CellId) -> Option<(CellId, usize)> {
        let distances = self.board.distances_from(from);
        self.players
            .iter()
            .filter_map(|id| {
                let entity = self.entities.get(id)?;
                if !entity.player()?.alive {
                    return None;
                }
                let cell = entity.cell?;
                Some((cell, distances[cell.0]?))
            })
            .min_by_key(|(_, distance)| *distance)
    }

    fn ambush_cell(&self, player_cell: CellId) -> CellId {
        let facing = self
            .board
            .occupants(player_cell)
            .iter()
            .filter_map(|id| self.entities.get(id))
            .find(|entity| entity.kind() == EntityKind::Player)
            .map(|entity| entity.facing)
            .unwrap_or(Direction::North);
        let mut cell = player_cell;
        for _ in 0..AMBUSH_LOOKAHEAD {
            cell = self.board.neighbor(cell, facing);
        }
        if self.board.is_accessible(cell) {
            cell
        } else {
            player_cell
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{first_of, level_from, set_feared};
    use super::*;

    fn with_personality(level: &mut Level, ghost: EntityId, personality: GhostPersonality) {
        if let Some(state) = level.entities.get_mut(&ghost).and_then(Entity::ghost_mut) {
            state.personality = personality;
        }
    }

    const CORRIDOR: [&str; 3] = ["###########", "#P.......G#", "###########"];
    const NEAR: [&str; 3] = ["#########", "#P...G..#", "#########"];
    const FAR: [&str; 3] = ["###############", "#P.........G..#", "###############"];

    fn junction_ghost(rows: &[&str], personality: GhostPersonality) -> (Level, EntityId) {
        let mut level = level_from(rows);
        level.register_player().expect("player");
        let ghost = first_of(&level, EntityKind::Ghost);
        with_personality(&mut level, ghost, personality);
        if let Some(state) = level.entities.get_mut(&ghost).and_then(Entity::ghost_mut) {
            state.came_from = Some(Direction::West);
        }
        (level, ghost)
    }

    #[test]
    fn chaser_heads_for_the_player() {
        let (mut level, ghost) = junction_ghost(&NEAR, GhostPersonality::Chaser);
        for _ in 0..8 {
            assert_eq!(level.ghost_next_move(ghost), Some(Direction::West));
        }
    }

    #[test]
    fn shy_ghost_only_chases_from_afar() {
        let (mut level, ghost) = junction_ghost(&FAR, GhostPersonality::Shy);
        assert_eq!(level.ghost_next_move(ghost), Some(Direction::West));

        let (mut level, ghost) = junction_ghost(&NEAR, GhostPersonality::Shy);
        for _ in 0..8 {
            assert_eq!(level.ghost_next_move(ghost), Some(Direction::East));
        }
    }

    #[test]
    fn wanderer_ignores_players() {
        let (mut level, ghost) = junction_ghost(&NEAR, GhostPersonality::Wanderer);
        for _ in 0..8 {
            assert_eq!(level.ghost_next_move(ghost), Some(Direction::East));
        }
    }

    #[test]
    fn feared_ghost_avoids_doubling_back() {
        let mut level = level_from(&["#######", "#P.G..#", "#######"]);
        level.register_player().expect("player");
        let ghost = first_of(&level, EntityKind::Ghost);
        set_feared(&mut level, ghost, true);
        if let Some(state) = level.entities.get_mut(&ghost).and_then(Entity::ghost_mut) {
            state.came_from = Some(Direction::West);
        }
        for _ in 0..8 {
            assert_eq!(level.ghost_next_move(ghost), Some(Direction::East));
        }
    }

    #[test]
    fn dead_end_allows_turning_back() {
        let mut level = level_from(&["#####", "#P.G#", "#####"]);
        level.register_player().expect("player");
        let ghost = first_of(&level, EntityKind::Ghost);
        with_personality(&mut level, ghost, GhostPersonality::Wanderer);
        if let Some(state) = level.entities.get_mut(&ghost).and_then(Entity::ghost_mut) {
            state.came_from = Some(Direction::West);
        }
        assert_eq!(level.ghost_next_move(ghost), Some(Direction::West));
    }

    #[test]
    fn ambusher_targets_ahead_of_player() {
        let mut level = level_from(&["#########", "#P......#", "#.#####.#", "#...G...#", "#########"]);
        let player = level.register_player().expect("player");
        let ghost = first_of(&level, EntityKind::Ghost);
        with_personality(&mut level, ghost, GhostPersonality::Ambusher);
        let player_cell = level.entity(player).and_then(Entity::cell).expect("cell");
        let target = level.ambush_cell(player_cell);
        assert_eq!(level.board.position(target), Vec2::new(5, 1));
        assert_eq!(level.ghost_next_move(ghost), Some(Direction::East));
    }

    #[test]
    fn immobile_or_exploded_ghost_has_no_move() {
        let mut level = level_from(&CORRIDOR);
        level.register_player().expect("player");
        let ghost = first_of(&level, EntityKind::Ghost);
        if let Some(entity) = level.entities.get_mut(&ghost) {
            entity.movable = false;
        }
        assert_eq!(level.ghost_next_move(ghost), None);
        if let Some(entity) = level.entities.get_mut(&ghost) {
            entity.movable = true;
        }
        level.explode_ghost(ghost);
        assert_eq!(level.ghost_next_move(ghost), None);
    }
}
