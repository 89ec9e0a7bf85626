use std::collections::VecDeque;

use crate::error::LevelError;
use crate::types::{CellId, Direction, EntityId, Terrain, Vec2};

#[derive(Clone, Debug)]
pub struct Cell {
    pub position: Vec2,
    pub terrain: Terrain,
    occupants: Vec<EntityId>,
    neighbors: [CellId; 4],
}

impl Cell {
    fn new(position: Vec2, terrain: Terrain) -> Self {
        Self {
            position,
            terrain,
            occupants: Vec::new(),
            neighbors: [CellId(0); 4],
        }
    }

    pub fn occupants(&self) -> &[EntityId] {
        &self.occupants
    }

    pub fn neighbor(&self, direction: Direction) -> CellId {
        self.neighbors[direction.index()]
    }

    pub fn is_accessible(&self) -> bool {
        self.terrain.is_accessible()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extension {
    pub direction: Direction,
    pub shift: Vec2,
    pub origin: Vec2,
    pub width: i32,
    pub height: i32,
}

/// Grid of cells. Cells live in an append-only arena so a `CellId` stays
/// valid for the lifetime of the board, including across growth. Neighbor
/// links wrap around the edges.
#[derive(Clone, Debug)]
pub struct Board {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    grid: Vec<CellId>,
}

impl Board {
    pub fn new(width: i32, height: i32, terrain: &[Terrain]) -> Result<Self, LevelError> {
        if width <= 0 || height <= 0 || terrain.len() != (width * height) as usize {
            return Err(LevelError::Invariant(format!(
                "board {width}x{height} built from {} tiles",
                terrain.len()
            )));
        }
        let mut cells = Vec::with_capacity(terrain.len());
        let mut grid = Vec::with_capacity(terrain.len());
        for y in 0..height {
            for x in 0..width {
                grid.push(CellId(cells.len()));
                cells.push(Cell::new(
                    Vec2::new(x, y),
                    terrain[(y * width + x) as usize],
                ));
            }
        }
        let mut board = Self {
            width,
            height,
            cells,
            grid,
        };
        board.link();
        Ok(board)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub fn cell_at(&self, x: i32, y: i32) -> Option<CellId> {
        if !self.within_borders(x, y) {
            return None;
        }
        Some(self.grid[(y * self.width + x) as usize])
    }

    pub fn within_borders(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn position(&self, id: CellId) -> Vec2 {
        self.cells[id.0].position
    }

    pub fn neighbor(&self, id: CellId, direction: Direction) -> CellId {
        self.cells[id.0].neighbor(direction)
    }

    pub fn is_accessible(&self, id: CellId) -> bool {
        self.cells[id.0].is_accessible()
    }

    pub fn occupants(&self, id: CellId) -> &[EntityId] {
        &self.cells[id.0].occupants
    }

    pub(crate) fn add_occupant(&mut self, id: CellId, entity: EntityId) {
        let occupants = &mut self.cells[id.0].occupants;
        if !occupants.contains(&entity) {
            occupants.push(entity);
        }
    }

    pub(crate) fn remove_occupant(&mut self, id: CellId, entity: EntityId) -> bool {
        let occupants = &mut self.cells[id.0].occupants;
        let before = occupants.len();
        occupants.retain(|occupant| *occupant != entity);
        occupants.len() != before
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.grid.iter().copied()
    }

    pub fn accessible_cells(&self) -> Vec<CellId> {
        self.cell_ids().filter(|id| self.is_accessible(*id)).collect()
    }

    pub fn center(&self) -> CellId {
        let half_w = self.width / 2;
        let half_h = self.height / 2;
        let x = if half_w % 2 != 0 { half_w } else { half_w - 1 };
        let y = if half_h % 2 != 0 { half_h } else { half_h - 1 };
        self.grid[(y.max(0) * self.width + x.max(0)) as usize]
    }

    pub fn nearest_accessible(&self, from: CellId) -> Option<CellId> {
        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::from([from]);
        seen[from.0] = true;
        while let Some(current) = queue.pop_front() {
            if self.is_accessible(current) {
                return Some(current);
            }
            for direction in Direction::ALL {
                let next = self.neighbor(current, direction);
                if !seen[next.0] {
                    seen[next.0] = true;
                    queue.push_back(next);
                }
            }
        }
        None
    }

    pub fn distances_from(&self, from: CellId) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.cells.len()];
        dist[from.0] = Some(0);
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let Some(base) = dist[current.0] else {
                continue;
            };
            for direction in Direction::ALL {
                let next = self.neighbor(current, direction);
                if dist[next.0].is_some() || !self.is_accessible(next) {
                    continue;
                }
                dist[next.0] = Some(base + 1);
                queue.push_back(next);
            }
        }
        dist
    }

    pub fn path_distance(&self, from: CellId, to: CellId) -> Option<usize> {
        self.distances_from(from)[to.0]
    }

    pub fn reachable_from(&self, from: CellId) -> Vec<CellId> {
        let dist = self.distances_from(from);
        self.cell_ids()
            .filter(|id| dist[id.0].is_some() && self.is_accessible(*id))
            .collect()
    }

    pub fn first_step_toward(&self, from: CellId, to: CellId) -> Option<Direction> {
        if from == to {
            return None;
        }
        let mut first: Vec<Option<Direction>> = vec![None; self.cells.len()];
        let mut seen = vec![false; self.cells.len()];
        seen[from.0] = true;
        let mut queue = VecDeque::new();
        for direction in Direction::ALL {
            let next = self.neighbor(from, direction);
            if seen[next.0] || !self.is_accessible(next) {
                continue;
            }
            seen[next.0] = true;
            first[next.0] = Some(direction);
            queue.push_back(next);
        }
        while let Some(current) = queue.pop_front() {
            if current == to {
                return first[current.0];
            }
            for direction in Direction::ALL {
                let next = self.neighbor(current, direction);
                if seen[next.0] || !self.is_accessible(next) {
                    continue;
                }
                seen[next.0] = true;
                first[next.0] = first[current.0];
                queue.push_back(next);
            }
        }
        None
    }

    pub fn check_invariant(&self) -> Result<(), LevelError> {
        if self.grid.len() != (self.width * self.height) as usize {
            return Err(LevelError::Invariant(format!(
                "grid holds {} cells for a {}x{} board",
                self.grid.len(),
                self.width,
                self.height
            )));
        }
        for (slot, id) in self.grid.iter().enumerate() {
            let Some(cell) = self.cells.get(id.0) else {
                return Err(LevelError::Invariant(format!("slot {slot} has no cell")));
            };
            let expected = Vec2::new(slot as i32 % self.width, slot as i32 / self.width);
            if cell.position != expected {
                return Err(LevelError::Invariant(format!(
                    "cell {id:?} at {:?} sits in slot {expected:?}",
                    cell.position
                )));
            }
            for direction in Direction::ALL {
                let next = cell.neighbor(direction);
                let Some(next_cell) = self.cells.get(next.0) else {
                    return Err(LevelError::Invariant(format!(
                        "cell {id:?} links {direction:?} to missing {next:?}"
                    )));
                };
                if next_cell.neighbor(direction.opposite()) != *id {
                    return Err(LevelError::Invariant(format!(
                        "cell {id:?} {direction:?} link is not symmetric"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Grows the board by one `chunk_width` column strip (east/west) or one
    /// `chunk_height` row strip (north/south). Existing cells keep their ids
    /// and are shifted as needed; `terrain_at` fills the new strip, receiving
    /// coordinates relative to the strip origin.
    pub fn extend(
        &mut self,
        direction: Direction,
        chunk_width: i32,
        chunk_height: i32,
        mut terrain_at: impl FnMut(Vec2) -> Terrain,
    ) -> Extension {
        let (new_width, new_height, shift, origin, strip_w, strip_h) = match direction {
            Direction::East => (
                self.width + chunk_width,
                self.height,
                Vec2::new(0, 0),
                Vec2::new(self.width, 0),
                chunk_width,
                self.height,
            ),
            Direction::West => (
                self.width + chunk_width,
                self.height,
                Vec2::new(chunk_width, 0),
                Vec2::new(0, 0),
                chunk_width,
                self.height,
            ),
            Direction::South => (
                self.width,
                self.height + chunk_height,
                Vec2::new(0, 0),
                Vec2::new(0, self.height),
                self.width,
                chunk_height,
            ),
            Direction::North => (
                self.width,
                self.height + chunk_height,
                Vec2::new(0, chunk_height),
                Vec2::new(0, 0),
                self.width,
                chunk_height,
            ),
        };

        let mut grid = vec![CellId(usize::MAX); (new_width * new_height) as usize];
        for id in &self.grid {
            let cell = &mut self.cells[id.0];
            cell.position = cell.position.offset(shift.x, shift.y);
            grid[(cell.position.y * new_width + cell.position.x) as usize] = *id;
        }
        for dy in 0..strip_h {
            for dx in 0..strip_w {
                let position = origin.offset(dx, dy);
                let id = CellId(self.cells.len());
                self.cells
                    .push(Cell::new(position, terrain_at(Vec2::new(dx, dy))));
                grid[(position.y * new_width + position.x) as usize] = id;
            }
        }

        self.width = new_width;
        self.height = new_height;
        self.grid = grid;
        self.link();

        Extension {
            direction,
            shift,
            origin,
            width: strip_w,
            height: strip_h,
        }
    }

    fn link(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let id = self.grid[(y * self.width + x) as usize];
                let mut neighbors = [CellId(0); 4];
                for direction in Direction::ALL {
                    let (dx, dy) = direction.delta();
                    let nx = (x + dx).rem_euclid(self.width);
                    let ny = (y + dy).rem_euclid(self.height);
                    neighbors[direction.index()] = self.grid[(ny * self.width + nx) as usize];
                }
                self.cells[id.0].neighbors = neighbors;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from(rows: &[&str]) -> Board {
        let height = rows.len() as i32;
        let width = rows[0].len() as i32;
        let terrain: Vec<Terrain> = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|ch| if ch == '#' { Terrain::Wall } else { Terrain::Ground })
            .collect();
        Board::new(width, height, &terrain).expect("board")
    }

    #[test]
    fn neighbors_wrap_around_edges() {
        let board = board_from(&["   ", "   "]);
        let corner = board.cell_at(0, 0).expect("corner");
        assert_eq!(
            board.position(board.neighbor(corner, Direction::West)),
            Vec2::new(2, 0)
        );
        assert_eq!(
            board.position(board.neighbor(corner, Direction::North)),
            Vec2::new(0, 1)
        );
        board.check_invariant().expect("invariant");
    }

    #[test]
    fn cell_at_rejects_out_of_bounds() {
        let board = board_from(&["  "]);
        assert!(board.cell_at(2, 0).is_none());
        assert!(board.cell_at(-1, 0).is_none());
    }

    #[test]
    fn center_follows_half_length_parity() {
        let board = board_from(&["     "; 5]);
        assert_eq!(board.position(board.center()), Vec2::new(1, 1));
        let board = board_from(&["       "; 7]);
        assert_eq!(board.position(board.center()), Vec2::new(3, 3));
    }

    #[test]
    fn path_distance_respects_walls() {
        let board = board_from(&["#####", "#   #", "# # #", "#   #", "#####"]);
        let a = board.cell_at(1, 1).expect("a");
        let b = board.cell_at(3, 3).expect("b");
        assert_eq!(board.path_distance(a, b), Some(4));
        let wall = board.cell_at(2, 2).expect("wall");
        assert_eq!(board.path_distance(a, wall), None);
        assert!(board.first_step_toward(a, b).is_some());
        assert_eq!(board.first_step_toward(a, a), None);
    }

    #[test]
    fn nearest_accessible_walks_through_walls() {
        let board = board_from(&["#####", "#####", "## ##", "#####"]);
        let start = board.cell_at(0, 0).expect("start");
        let found = board.nearest_accessible(start).expect("found");
        assert_eq!(board.position(found), Vec2::new(2, 2));
    }

    #[test]
    fn extend_keeps_cell_ids_and_relinks() {
        let mut board = board_from(&["# ", " #"]);
        let original = board.cell_at(1, 0).expect("cell");
        let extension = board.extend(Direction::West, 2, 2, |_| Terrain::Ground);
        assert_eq!(extension.shift, Vec2::new(2, 0));
        assert_eq!(board.width(), 4);
        assert_eq!(board.position(original), Vec2::new(3, 0));
        assert_eq!(board.cell_at(3, 0), Some(original));
        assert!(board.is_accessible(board.cell_at(0, 1).expect("new")));
        board.check_invariant().expect("invariant after west growth");

        let extension = board.extend(Direction::South, 2, 2, |p| {
            if p.x == 0 {
                Terrain::Wall
            } else {
                Terrain::Ground
            }
        });
        assert_eq!(extension.origin, Vec2::new(0, 2));
        assert_eq!(extension.width, 4);
        assert_eq!(board.height(), 4);
        assert!(!board.is_accessible(board.cell_at(0, 3).expect("stamped")));
        board.check_invariant().expect("invariant after south growth");
    }

    #[test]
    fn occupants_keep_insertion_order() {
        let mut board = board_from(&["  "]);
        let cell = board.cell_at(0, 0).expect("cell");
        board.add_occupant(cell, EntityId(2));
        board.add_occupant(cell, EntityId(1));
        board.add_occupant(cell, EntityId(2));
        assert_eq!(board.occupants(cell), &[EntityId(2), EntityId(1)]);
        assert!(board.remove_occupant(cell, EntityId(2)));
        assert!(!board.remove_occupant(cell, EntityId(2)));
        assert_eq!(board.occupants(cell), &[EntityId(1)]);
    }
}
