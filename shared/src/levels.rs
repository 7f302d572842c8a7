//! Static level catalog.
//!
//! Each level is a list of equal-length rows. `#`, `X` and `W` are solid walls,
//! `B` is a breakable wall, `P` the player spawn, `E` an enemy spawn, `G`, `H`
//! and `K` are gold, health potion and key, `L` the exit and `Z` the surge
//! origin. Any other character is open floor.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    #[error("no level with index {0}")]
    UnknownLevel(usize),
    #[error("level has no rows")]
    Empty,
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("level has no player spawn")]
    MissingPlayerSpawn,
    #[error("level has more than one player spawn")]
    DuplicatePlayerSpawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Floor,
    Wall,
    BreakableWall,
    PlayerSpawn,
    EnemySpawn,
    Gold,
    HealthPotion,
    Key,
    Exit,
    SurgeOrigin,
}

impl Tile {
    pub fn from_char(c: char) -> Tile {
        match c {
            '#' | 'X' | 'W' => Tile::Wall,
            'B' => Tile::BreakableWall,
            'P' => Tile::PlayerSpawn,
            'E' => Tile::EnemySpawn,
            'G' => Tile::Gold,
            'H' => Tile::HealthPotion,
            'K' => Tile::Key,
            'L' => Tile::Exit,
            'Z' => Tile::SurgeOrigin,
            _ => Tile::Floor,
        }
    }
}

/// A parsed and validated level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLayout {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl LevelLayout {
    pub fn parse(rows: &[&str]) -> Result<Self, LevelError> {
        let first = rows.first().ok_or(LevelError::Empty)?;
        let width = first.chars().count();
        if width == 0 {
            return Err(LevelError::Empty);
        }

        let mut tiles = Vec::with_capacity(width * rows.len());
        let mut spawns = 0;
        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LevelError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for c in line.chars() {
                let tile = Tile::from_char(c);
                if tile == Tile::PlayerSpawn {
                    spawns += 1;
                }
                tiles.push(tile);
            }
        }

        match spawns {
            0 => Err(LevelError::MissingPlayerSpawn),
            1 => Ok(Self {
                width,
                height: rows.len(),
                tiles,
            }),
            _ => Err(LevelError::DuplicatePlayerSpawn),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.tiles[row * self.width + col])
    }

    /// Every cell as `(row, col, tile)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Tile)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, tile)| (i / self.width, i % self.width, *tile))
    }

    /// The explicit `Z` marker, else the first non-wall cell in the bottom-right
    /// 2x2 corner, else the bottom-right cell itself.
    pub fn surge_origin(&self) -> (usize, usize) {
        if let Some((row, col, _)) = self.cells().find(|(_, _, t)| *t == Tile::SurgeOrigin) {
            return (row, col);
        }
        let last_row = self.height - 1;
        let last_col = self.width - 1;
        for row in last_row.saturating_sub(1)..=last_row {
            for col in last_col.saturating_sub(1)..=last_col {
                if let Some(tile) = self.get(row, col) {
                    if !matches!(tile, Tile::Wall | Tile::BreakableWall) {
                        return (row, col);
                    }
                }
            }
        }
        (last_row, last_col)
    }
}

pub fn level_count() -> usize {
    LEVELS.len()
}

pub fn layout(index: usize) -> Result<&'static [&'static str], LevelError> {
    LEVELS.get(index).copied().ok_or(LevelError::UnknownLevel(index))
}

pub fn load(index: usize) -> Result<LevelLayout, LevelError> {
    LevelLayout::parse(layout(index)?)
}

pub static LEVELS: &[&[&str]] = &[
    // Tutorial
    &[
        "####################",
        "#P.................#",
        "#.####.####.####.###",
        "#.#..#.#..#.#..#...#",
        "#.#..#.#..#.#..###.#",
        "#.####.####.####...#",
        "#.....G............#",
        "#.###.####.###.###.#",
        "#.#.#.#..#.#.#.#.#.#",
        "#.#.#.#..#.#.#.#.#.#",
        "#.###.####.###.###.#",
        "#........E.........#",
        "#.###.###.###.###.##",
        "#.#.#.#.#.#.#.#.#..#",
        "#.#.#.#.#.#.#.#.#.##",
        "#.###.###.###.###..#",
        "#.................L#",
        "####################",
    ],
    // Combat
    &[
        "####################",
        "#P....E....E.....E.#",
        "#.#####.####.#####.#",
        "#.....#.#..#.#.....#",
        "####..#.#..#.#..####",
        "#..#..G.####.G..#..#",
        "#..#############...#",
        "#..............#...#",
        "#..############....#",
        "#..#........E.#....#",
        "#..#.##########....#",
        "#..#.#........#....#",
        "#..#.#.H####K.#....#",
        "#....#........#....#",
        "######.########....#",
        "#..................#",
        "#.................L#",
        "####################",
    ],
    // Breakable maze
    &[
        "####################",
        "#P.#...............#",
        "#.###.###.###.###.##",
        "#...#.#.#.#.#.#.#..#",
        "##..#.#.#.#.#.#.#.##",
        "#...#.#.#.#.#.#.#..#",
        "#.###.###.###.###.##",
        "#...........E......#",
        "#.###.###.###.###.##",
        "#.#.B.#.B.#.B.#.B..#",
        "#.#.#.#.#.#.#.#.#.##",
        "#.#.#.#G#.#H#.#K#..#",
        "#.#.#.###.###.###.##",
        "#.#.#..............#",
        "#.#.##############.#",
        "#.E................#",
        "#.................L#",
        "####################",
    ],
    // Surge corridors
    &[
        "####################",
        "#P...B.....E.....K.#",
        "#.##.#.#######.###.#",
        "#.#..#.....B...#...#",
        "#.#.####.#.###.#.###",
        "#.#....#.#...#.#...#",
        "#.####.#.###.#.###.#",
        "#......#..G..#.....#",
        "####B#####.#####B###",
        "#....E.....H.......#",
        "#.######.###.#####.#",
        "#.#....#.#E#.#...#.#",
        "#.#.G..B.#.#.B.G.#.#",
        "#.#....#.#.#.#...#.#",
        "#.######.#B#.#####.#",
        "#..........E.......#",
        "#L...............Z.#",
        "####################",
    ],
    // Surge vault
    &[
        "XXXXXXXXXXXXXXXXXXXX",
        "XP.....W....E....K.X",
        "X.WWW..W..WWWWW..W.X",
        "X...B..W......B..W.X",
        "XWW.W..WWWW.WWW..W.X",
        "X...W.....E...W....X",
        "X.WWWWWBWWWWW.WWWW.X",
        "X..G.........E..H..X",
        "XWWWW.WWWBWWWWW.WWWX",
        "X.....W..G..W......X",
        "X.WWW.W.WWW.W.WWWW.X",
        "X.W.E.B.....B...EW.X",
        "X.W.WWWWWBWWWWW.W..X",
        "X.W.............W..X",
        "X.WWWWWW.WW.WWWWW.WX",
        "X...E.....G......Z.X",
        "X.................LX",
        "XXXXXXXXXXXXXXXXXXXX",
    ],
    // Dungeon 1
    &[
        "####################",
        "#P................E#",
        "#.################.#",
        "#.##B##..G..##B##.#B",
        "#.##E##.H.K.##E##.#B",
        "#.#############.##.#",
        "#.##.........##.##.#",
        "#.##.E.....E.##.##.#",
        "#.##.#######.##.##.#",
        "#.##.#######.##.##.#",
        "#.##.E.....E.##.##.#",
        "#.##.........##.##.#",
        "#.#############.##.#",
        "#.##B##.H.K.##B##.#B",
        "#.##E##..G..##E##.#B",
        "#.################.#",
        "#L...............Z.#",
        "####################",
    ],
    // Dungeon 2
    &[
        "####################",
        "#P.#.#.#.#.#.#.#.#.#",
        "#.B.#.#.#.#.#.#.#.B#",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.B.#.#.#.#.#.B.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.B.#.#.#.#.#.#.#.B.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.B.#.#.#.#.#.B.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.B.#.#.#.#.#.#.#.B.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.B.#.#.#.#.#.B.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.E.E.E.E.E.E.E.E.EZ",
        "#.H.G.K.G.H.G.K.G.H.",
        "##########L#########",
    ],
    // Dungeon 3
    &[
        "BBBBBBBBBBBBBBBBBBBB",
        "B.P..............G.B",
        "B.B.#.#.#.#.#.#.#B.B",
        "B.#.#.#.#.#.#.#.#.#B",
        "B.B.#.#.#.#.#.#.#B.B",
        "B.#.#.#.#.#.#.#.#.#B",
        "B.B.#.#.#.#.#.#.#B.B",
        "B.#.#.#.#.#.#.#.#.#B",
        "B.B.#.#.#.#.#.#.#B.B",
        "B.#.#.#.#.#.#.#.#.#B",
        "B.B.#.#.#.#.#.#.#B.B",
        "B.#.#.#.#.#.#.#.#.#B",
        "B.B.#.#.#.#.#.#.#B.B",
        "B.E.#.#.#.#.#.#.#.#B",
        "B.L..............EZB",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.K.H.G.H.K.G.H.K.G.",
        "BBBBBBBBBBBBBBBBBBBB",
    ],
    // Dungeon 4
    &[
        "####################",
        "#P#.#.#.#.#.#.#.#E.#",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.B.B.B.B.B.B.B.B.BZ",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#E.#.#.#.#.#.#.#.#L.",
        "####################",
    ],
    // Dungeon 5
    &[
        "XBBBBBBBBBBBBBBBBBBX",
        "XP................LX",
        "X.B.B.B.B.B.B.B.B.BX",
        "X..................X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X..................X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X..................X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X..................X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X..................X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X..................X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X..................X",
        "X.E.E.E.E.E.E.E.E.EZ",
        "XBBBBBBBBBBBBBBBBBBX",
    ],
    // Dungeon 6
    &[
        "####################",
        "#P...#.#.#.#.#.E...#",
        "#.#.B#.#.#.#.#.#.#.#",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.B#.#.#.#.#.#.#.#",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.B#.#.#.#.#.#.#.#",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.B#.#.#.#.#.#.#.#",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.B#.#.#.#.#.#.#.#",
        "#E...#.#.#.#.#.L..Z#",
        "#B#############B####",
        "XXXXXXXXXXXXXXXXXXXX",
    ],
    // Dungeon 7
    &[
        "XBBBBBBBBBBBBBBBBBBX",
        "XP.#.#.#.#.#.#.#.#BX",
        "X.B.B.B.B.B.B.B.B.BX",
        "X.#.#.#.#.#.#.#.#.#X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X.#.#.#.#.#.#.#.#.#X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X.#.#.#.#.#.#.#.#.#X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X.#.#.#.#.#.#.#.#.#X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X.#.#.#.#.#.#.#.#.#X",
        "X.B.B.B.B.B.B.B.B.BX",
        "X.#.#.#.#.#.#.#.#.#X",
        "X.L.#.#.#.#.#.#.#.ZX",
        "X.E.E.E.E.E.E.E.E.EX",
        "XGHGKGHGKGHGKGHGKGHX",
        "XBBBBBBBBBBBBBBBBBBX",
    ],
    // Dungeon 8
    &[
        "####################",
        "#P...#G....Y.#H....#",
        "#.#B.#.#####.#.#.#.#",
        "#.#.#.#.#E.#.#.#.#.#",
        "#.#.#.#.##.#.#.#.#.#",
        "#.#.#.#....#.#.#.#.#",
        "#.#.#####.##.#.#.#.#",
        "#.#.E....#G.#.#.#.#.",
        "#.#.#######.B#.#.#.#",
        "#.#..........E.#.#.#",
        "#.#B###########.H#.#",
        "#.#............#.#.#",
        "#.#.############.#.#",
        "#.#.E..........#.#.#",
        "#.#.############.B.#",
        "#L...............Z.#",
        "####################",
        "XXXXXXXXXXXXXXXXXXXX",
    ],
    // Dungeon 9
    &[
        "XXXXXXXXXXXXXXXXXXXX",
        "X#P.E.G.E.H.E.K.E.E#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#.#.#.#.#.#.#.#.#.#",
        "X#E.E.G.E.H.E.K.E.LZ",
        "XXXXXXXXXXXXXXXXXXXX",
    ],
    // Dungeon 10
    &[
        "BBBBBBBBBBBBBBBBBBBB",
        "B.P.H.G.H.G.H.G.H.G.",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.#.#.#.#.#.#.#.#.#.",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.#.#.#.#.#.#.#.#.#.",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.#.#.#.#.#.#.#.#.#.",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.#.#.#.#.#.#.#.#.#.",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.#.#.#.#.#.#.#.#.#.",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.#.#.#.#.#.#.#.#.#.",
        "B.L.H.G.H.G.H.G.H.G.",
        "B.B.B.B.B.B.B.B.B.B.",
        "B.E.E.E.E.E.E.E.E.EZ",
        "BBBBBBBBBBBBBBBBBBBB",
    ],
    // Dungeon 11
    &[
        "####################",
        "#P.B.Z.#.B.H.H.G..LB",
        "#.ZB#.GGG..BHHZB#.#B",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.#.#.#.#.#.#.#.#.#.",
        "#.E.G.H.K.E.G.H.K.EZ",
        "#.G.H.K.E.G.H.K.E.G.",
        "####################",
    ],
    // Dungeon 12
    &[
        "X..................X",
        "X.P.E.E.E.E.E.E.E.L.",
        "X..................X",
        "X.G.H.K.G.H.K.G.H.K.",
        "X..................X",
        "X.E.E.E.E.E.E.E.E.E.",
        "X..................X",
        "X.G.H.K.G.H.K.G.H.K.",
        "X..................X",
        "X.E.E.E.E.E.E.E.E.E.",
        "X..................X",
        "X.G.H.K.G.H.K.G.H.K.",
        "X..................X",
        "X.E.E.E.E.E.E.E.E.E.",
        "X..................X",
        "X.G.H.K.G.H.K.G.H.KZ",
        "X.E.E.E.E.E.E.E.E.E.",
        "X..................X",
    ],
    // Dungeon 13
    &[
        "XBBBBBBBBBBBBBBBBBBX",
        "XPB..............L.X",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.B.",
        "X.B.B.B.B.B.B.B.B.BZ",
        "X.E.E.E.E.E.E.E.E.E.",
        "XBBBBBBBBBBBBBBBBBBX",
    ],
    // Dungeon 14
    &[
        "X..................X",
        "X.P................X",
        "X.........E........X",
        "X..................X",
        "X........G.........X",
        "X..................X",
        "X.........H........X",
        "X..................X",
        "X........E.........X",
        "X..................X",
        "X.........K........X",
        "X..................X",
        "X........E.........X",
        "X..................X",
        "X........L.........X",
        "X..................X",
        "X.........EZ.......X",
        "X..................X",
    ],
    // Dungeon 15
    &[
        "####################",
        "#P................L#",
        "#.################.#",
        "#.###G###.E.E.E.###.",
        "#.###H###.B.B.B.###.",
        "#.###K###.E.E.E.###.",
        "#.################.#",
        "#.###G###.E.E.E.###.",
        "#.###H###.B.B.B.B###",
        "#.###K###.E.E.E.###.",
        "#.################.#",
        "#.###G###.E.E.E.###.",
        "#.###H###.B.B.B.###.",
        "#.###K###.E.E.E.###.",
        "#.################.#",
        "#................Z.#",
        "####################",
        "XXXXXXXXXXXXXXXXXXXX",
    ],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_levels_are_valid() {
        assert_eq!(level_count(), 20);
        for index in 0..level_count() {
            let level = load(index).unwrap();
            assert_eq!(level.width(), 20);
            assert_eq!(level.height(), 18);
            let exits = level.cells().filter(|(_, _, tile)| *tile == Tile::Exit).count();
            assert_eq!(exits, 1, "level {} needs a single exit", index);
        }
    }

    #[test]
    fn test_unknown_level() {
        assert_eq!(load(99), Err(LevelError::UnknownLevel(99)));
    }

    #[test]
    fn test_unrecognized_characters_are_floor() {
        assert_eq!(Tile::from_char('.'), Tile::Floor);
        assert_eq!(Tile::from_char('Y'), Tile::Floor);
        assert_eq!(Tile::from_char(' '), Tile::Floor);
        assert_eq!(Tile::from_char('X'), Tile::Wall);
        assert_eq!(Tile::from_char('B'), Tile::BreakableWall);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = LevelLayout::parse(&["###", "#P", "###"]).unwrap_err();
        assert_eq!(
            err,
            LevelError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_player_spawn_validation() {
        assert_eq!(
            LevelLayout::parse(&["###", "#.#", "###"]),
            Err(LevelError::MissingPlayerSpawn)
        );
        assert_eq!(
            LevelLayout::parse(&["####", "#PP#", "####"]),
            Err(LevelError::DuplicatePlayerSpawn)
        );
        assert_eq!(LevelLayout::parse(&[]), Err(LevelError::Empty));
    }

    #[test]
    fn test_cells_are_row_major() {
        let level = LevelLayout::parse(&["#P", "E."]).unwrap();
        let cells: Vec<_> = level.cells().collect();
        assert_eq!(cells[1], (0, 1, Tile::PlayerSpawn));
        assert_eq!(cells[2], (1, 0, Tile::EnemySpawn));
        assert_eq!(level.get(1, 1), Some(Tile::Floor));
        assert_eq!(level.get(2, 0), None);
    }

    #[test]
    fn test_surge_origin_marker_and_fallback() {
        let marked = load(3).unwrap();
        assert_eq!(marked.surge_origin(), (16, 17));

        let unmarked = load(0).unwrap();
        assert_eq!(unmarked.surge_origin(), (16, 18));

        let walled = LevelLayout::parse(&["###", "#P#", "###"]).unwrap();
        assert_eq!(walled.surge_origin(), (1, 1));

        let boxed = LevelLayout::parse(&["P##", "###"]).unwrap();
        assert_eq!(boxed.surge_origin(), (1, 2));
    }
}
