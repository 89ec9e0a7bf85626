use super::*;
use crate::board::Extension;

impl Level {
    pub(super) fn grow_around(&mut self, player: EntityId) -> Result<(), LevelError> {
        let Some(position) = self.cell_position(player) else {
            return Ok(());
        };
        let margin = self.config.growth_margin;
        let (width, height) = (self.board.width(), self.board.height());
        let mut sides = Vec::new();
        if position.y < margin {
            sides.push(Direction::North);
        }
        if position.x >= width - margin {
            sides.push(Direction::East);
        }
        if position.y >= height - margin {
            sides.push(Direction::South);
        }
        if position.x < margin {
            sides.push(Direction::West);
        }
        for direction in sides {
            self.extend_board(direction)?;
        }
        Ok(())
    }

    pub fn extend_board(&mut self, direction: Direction) -> Result<Extension, LevelError> {
        if self.chunks.is_empty() {
            return Err(LevelError::Invariant(
                "board growth needs at least one chunk".to_string(),
            ));
        }
        let (chunk_w, chunk_h) = (self.chunk_width, self.chunk_height);
        let slots = match direction {
            Direction::East | Direction::West => self.board.height() / chunk_h,
            Direction::North | Direction::South => self.board.width() / chunk_w,
        }
        .max(1);
        let picks: Vec<usize> = (0..slots)
            .map(|_| self.rng.pick_index(self.chunks.len()))
            .collect();

        let chunks = &self.chunks;
        let extension = self.board.extend(direction, chunk_w, chunk_h, |at| {
            let slot = match direction {
                Direction::East | Direction::West => at.y / chunk_h,
                Direction::North | Direction::South => at.x / chunk_w,
            };
            match picks.get(slot as usize) {
                Some(pick) => chunks[*pick].terrain_at(at.x % chunk_w, at.y % chunk_h),
                None => Terrain::Wall,
            }
        });

        for (slot, pick) in picks.iter().enumerate() {
            let slot = slot as i32;
            let origin = match direction {
                Direction::East | Direction::West => extension.origin.offset(0, slot * chunk_h),
                Direction::North | Direction::South => extension.origin.offset(slot * chunk_w, 0),
            };
            let chunk = self.chunks[*pick].clone();
            self.populate(&chunk, origin, false)?;
        }
        self.board.check_invariant()?;

        info!(
            ?direction,
            width = self.board.width(),
            height = self.board.height(),
            "board extended"
        );
        self.emit(LevelEvent::BoardExtended {
            direction,
            width: self.board.width(),
            height: self.board.height(),
        });
        Ok(extension)
    }
}
