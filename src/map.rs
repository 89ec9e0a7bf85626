use crate::error::MapError;
use crate::types::{Axis, Terrain, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeleportSpec {
    pub at: Vec2,
    pub target: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeSpec {
    pub at: Vec2,
    pub axis: Axis,
    pub pellet: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelLayout {
    pub width: usize,
    pub height: usize,
    pub terrain: Vec<Terrain>,
    pub player_starts: Vec<Vec2>,
    pub ghost_starts: Vec<Vec2>,
    pub fruit_cells: Vec<Vec2>,
    pub pellets: Vec<Vec2>,
    pub super_pellets: Vec<Vec2>,
    pub holes: Vec<Vec2>,
    pub teleports: Vec<TeleportSpec>,
    pub bridges: Vec<BridgeSpec>,
}

impl LevelLayout {
    pub fn terrain_at(&self, x: i32, y: i32) -> Terrain {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Terrain::Wall;
        }
        self.terrain[y as usize * self.width + x as usize]
    }

    pub fn ensure_size(&self, width: usize, height: usize) -> Result<(), MapError> {
        if self.width != width || self.height != height {
            return Err(MapError::ChunkSize {
                width,
                height,
                found_width: self.width,
                found_height: self.height,
            });
        }
        Ok(())
    }
}

pub fn parse_map(text: &str) -> Result<LevelLayout, MapError> {
    let mut lines: Vec<&str> = text.lines().map(|line| line.trim_end_matches('\r')).collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    let mut sections: Vec<Vec<&str>> = vec![Vec::new()];
    for line in lines {
        if line.starts_with('-') {
            sections.push(Vec::new());
            continue;
        }
        if let Some(section) = sections.last_mut() {
            section.push(line);
        }
    }
    let grid = &sections[0];
    if grid.is_empty() || grid[0].is_empty() {
        return Err(MapError::Empty);
    }
    let width = grid[0].chars().count();
    let height = grid.len();
    for (row, line) in grid.iter().enumerate() {
        let found = line.chars().count();
        if found != width {
            return Err(MapError::RaggedRow {
                row,
                expected: width,
                found,
            });
        }
    }
    let teleport_lines = reference_lines(sections.get(1));
    let bridge_lines = reference_lines(sections.get(2));

    let rows: Vec<Vec<char>> = grid.iter().map(|line| line.chars().collect()).collect();
    let mut layout = LevelLayout {
        width,
        height,
        terrain: vec![Terrain::Ground; width * height],
        ..LevelLayout::default()
    };
    let mut teleport_cells = Vec::new();
    let mut bridge_cells = Vec::new();

    for x in 0..width {
        for y in 0..height {
            let tile = rows[y][x];
            let at = Vec2::new(x as i32, y as i32);
            match tile {
                ' ' => {}
                '#' => layout.terrain[y * width + x] = Terrain::Wall,
                '.' => layout.pellets.push(at),
                'o' => layout.super_pellets.push(at),
                'G' => layout.ghost_starts.push(at),
                'P' => layout.player_starts.push(at),
                'H' => layout.holes.push(at),
                'F' => layout.fruit_cells.push(at),
                'T' => teleport_cells.push(at),
                'B' => bridge_cells.push(at),
                _ => return Err(MapError::InvalidTile { tile, x, y }),
            }
        }
    }

    if teleport_lines.len() != teleport_cells.len() {
        return Err(MapError::TeleportCount {
            expected: teleport_cells.len(),
            found: teleport_lines.len(),
        });
    }
    for (at, line) in teleport_cells.into_iter().zip(teleport_lines) {
        let target = parse_teleport_ref(line, width, height)?;
        layout.teleports.push(TeleportSpec { at, target });
    }

    if bridge_lines.len() != bridge_cells.len() {
        return Err(MapError::BridgeCount {
            expected: bridge_cells.len(),
            found: bridge_lines.len(),
        });
    }
    for (at, line) in bridge_cells.into_iter().zip(bridge_lines) {
        let (axis, extra) = parse_bridge_ref(line)?;
        let pellet = extra == 'P';
        if extra == 'F' {
            layout.fruit_cells.push(at);
        }
        layout.bridges.push(BridgeSpec { at, axis, pellet });
    }

    Ok(layout)
}

fn reference_lines<'a>(section: Option<&Vec<&'a str>>) -> Vec<&'a str> {
    section
        .map(|lines| {
            lines
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_teleport_ref(line: &str, width: usize, height: usize) -> Result<Vec2, MapError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(MapError::TeleportFormat(line.to_string()));
    }
    let (Ok(x), Ok(y)) = (parts[0].parse::<i64>(), parts[1].parse::<i64>()) else {
        return Err(MapError::TeleportFormat(line.to_string()));
    };
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return Err(MapError::TeleportOutOfBounds { x, y });
    }
    Ok(Vec2::new(x as i32, y as i32))
}

fn parse_bridge_ref(line: &str) -> Result<(Axis, char), MapError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [axis, extra] = parts.as_slice() else {
        return Err(MapError::BridgeFormat(line.to_string()));
    };
    let axis = match *axis {
        "H" => Axis::Horizontal,
        "V" => Axis::Vertical,
        _ => return Err(MapError::BridgeFormat(line.to_string())),
    };
    let extra = match *extra {
        "P" => 'P',
        "N" => 'N',
        "F" => 'F',
        _ => return Err(MapError::BridgeFormat(line.to_string())),
    };
    Ok((axis, extra))
}
