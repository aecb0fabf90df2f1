use crate::grid::{BaseTile, Cell, Direction, Feature, Grid, MAX_BOXES, MAX_SIZE, Point};
use std::fmt;
use std::fs;
use std::io;

/// Error type for level parsing operations.
#[derive(Debug)]
pub enum LevelError {
    /// IO error when reading from file
    Io(io::Error),
    /// Invalid level content
    InvalidLevel(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(err) => write!(f, "IO error: {}", err),
            LevelError::InvalidLevel(msg) => write!(f, "Invalid level: {}", msg),
        }
    }
}

impl From<io::Error> for LevelError {
    fn from(err: io::Error) -> Self {
        LevelError::Io(err)
    }
}

impl From<String> for LevelError {
    fn from(err: String) -> Self {
        LevelError::InvalidLevel(err)
    }
}

/// One playable layout: the static grid plus the initial hero and box positions.
#[derive(Debug, Clone)]
pub struct Level {
    pub grid: Grid,
    pub hero: Point,
    pub boxes: Vec<Point>,
}

impl Level {
    /// Parse a level from text format.
    ///
    /// Characters:
    /// - `#` = Wall
    /// - ` ` = Floor
    /// - `-` = Empty (outside the playable area)
    /// - `.` = Target (goal cell for boxes)
    /// - `$` = Box
    /// - `@` = Hero
    /// - `*` = Box on target
    /// - `+` = Hero on target
    /// - `^` `v` `<` `>` = Spring launching up/down/left/right
    /// - `u` `d` `l` `r` = Treadmill pushing up/down/left/right
    /// - `U` `D` `L` `R` = One-way door oriented up/down/left/right
    /// - `~` = Oily floor
    pub fn from_text(text: &str) -> Result<Self, String> {
        let lines: Vec<&str> = text.lines().collect();

        if lines.is_empty() {
            return Err("Empty level".to_string());
        }

        let height = lines.len();
        let width = lines.iter().map(|line| line.len()).max().unwrap_or(0);

        if width > MAX_SIZE {
            return Err(format!(
                "Level width {} exceeds maximum size {}",
                width, MAX_SIZE
            ));
        }
        if height > MAX_SIZE {
            return Err(format!(
                "Level height {} exceeds maximum size {}",
                height, MAX_SIZE
            ));
        }

        let mut cells = vec![Cell::floor(); width * height];
        let mut hero = None;
        let mut boxes = Vec::new();
        let mut target_count = 0usize;

        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let cell = &mut cells[y * width + x];
                match ch {
                    '#' => cell.base = BaseTile::Wall,
                    '-' => cell.base = BaseTile::Empty,
                    ' ' => {}
                    '.' => {
                        cell.target = true;
                        target_count += 1;
                    }
                    '$' => boxes.push(Point::new(x as i16, y as i16)),
                    '*' => {
                        cell.target = true;
                        target_count += 1;
                        boxes.push(Point::new(x as i16, y as i16));
                    }
                    '@' | '+' => {
                        if hero.is_some() {
                            return Err("Multiple heroes found".to_string());
                        }
                        hero = Some(Point::new(x as i16, y as i16));
                        if ch == '+' {
                            cell.target = true;
                            target_count += 1;
                        }
                    }
                    '^' => cell.feature = Some(Feature::Spring(Direction::Up)),
                    'v' => cell.feature = Some(Feature::Spring(Direction::Down)),
                    '<' => cell.feature = Some(Feature::Spring(Direction::Left)),
                    '>' => cell.feature = Some(Feature::Spring(Direction::Right)),
                    'u' => cell.feature = Some(Feature::Treadmill(Direction::Up)),
                    'd' => cell.feature = Some(Feature::Treadmill(Direction::Down)),
                    'l' => cell.feature = Some(Feature::Treadmill(Direction::Left)),
                    'r' => cell.feature = Some(Feature::Treadmill(Direction::Right)),
                    'U' => cell.feature = Some(Feature::OneWayDoor(Direction::Up)),
                    'D' => cell.feature = Some(Feature::OneWayDoor(Direction::Down)),
                    'L' => cell.feature = Some(Feature::OneWayDoor(Direction::Left)),
                    'R' => cell.feature = Some(Feature::OneWayDoor(Direction::Right)),
                    '~' => cell.feature = Some(Feature::OilyFloor),
                    _ => {
                        return Err(format!(
                            "Invalid character '{}' at position ({}, {})",
                            ch, x, y
                        ));
                    }
                }
            }
        }

        let hero = hero.ok_or("No hero found in level")?;

        if boxes.len() > MAX_BOXES {
            return Err(format!(
                "Box count ({}) exceeds maximum of {}",
                boxes.len(),
                MAX_BOXES
            ));
        }

        if target_count != boxes.len() {
            return Err(format!(
                "Target count ({}) does not match box count ({})",
                target_count,
                boxes.len()
            ));
        }

        Ok(Level {
            grid: Grid::new(width as i16, height as i16, cells),
            hero,
            boxes,
        })
    }

    /// Render the grid with the given dynamic feature positions back to text
    /// format. Used by the CLI solution replay and by tests.
    pub fn render(&self, hero: Point, boxes: &[Point]) -> String {
        let mut out = String::new();
        for y in 0..self.grid.height() {
            let mut line = String::new();
            for x in 0..self.grid.width() {
                let p = Point::new(x, y);
                let cell = self.grid.cell(p);
                let ch = if p == hero {
                    if cell.target { '+' } else { '@' }
                } else if boxes.contains(&p) {
                    if cell.target { '*' } else { '$' }
                } else if let Some(feature) = cell.feature {
                    match feature {
                        Feature::Spring(Direction::Up) => '^',
                        Feature::Spring(Direction::Down) => 'v',
                        Feature::Spring(Direction::Left) => '<',
                        Feature::Spring(Direction::Right) => '>',
                        Feature::Treadmill(Direction::Up) => 'u',
                        Feature::Treadmill(Direction::Down) => 'd',
                        Feature::Treadmill(Direction::Left) => 'l',
                        Feature::Treadmill(Direction::Right) => 'r',
                        Feature::OneWayDoor(Direction::Up) => 'U',
                        Feature::OneWayDoor(Direction::Down) => 'D',
                        Feature::OneWayDoor(Direction::Left) => 'L',
                        Feature::OneWayDoor(Direction::Right) => 'R',
                        Feature::OilyFloor => '~',
                    }
                } else if cell.target {
                    '.'
                } else {
                    match cell.base {
                        BaseTile::Wall => '#',
                        BaseTile::Floor => ' ',
                        BaseTile::Empty => '-',
                    }
                };
                line.push(ch);
            }
            // Trim trailing spaces to match original input format
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(self.hero, &self.boxes))
    }
}

/// A collection of levels loaded from a text file.
#[derive(Debug)]
pub struct Levels {
    levels: Vec<Level>,
}

impl Levels {
    /// Parse levels from a string.
    ///
    /// The file format uses:
    /// - Lines starting with `;` as level separators/comments
    /// - The per-level character set of [`Level::from_text`]
    /// - Empty lines between levels (optional)
    pub fn from_text(contents: &str) -> Result<Self, LevelError> {
        let mut levels = Vec::new();
        let mut current_level = String::new();

        for line in contents.lines() {
            // Skip comment lines (level separators)
            if line.trim_start().starts_with(';') {
                if !current_level.is_empty() {
                    let level = Level::from_text(current_level.trim_end())?;
                    levels.push(level);
                    current_level.clear();
                }
                continue;
            }

            if line.is_empty() {
                if !current_level.is_empty() {
                    // Empty line within a level - end of level
                    let level = Level::from_text(current_level.trim_end())?;
                    levels.push(level);
                    current_level.clear();
                }
                continue;
            }

            current_level.push_str(line);
            current_level.push('\n');
        }

        // Don't forget the last level if the file doesn't end with an empty line
        if !current_level.is_empty() {
            let level = Level::from_text(current_level.trim_end())?;
            levels.push(level);
        }

        Ok(Levels { levels })
    }

    /// Parse levels from a text file.
    pub fn from_file(path: &str) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents)
    }

    /// Get the nth level (0-indexed).
    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Get the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_level() {
        let input = "#####\n\
                     #@$.#\n\
                     #####";
        let level = Level::from_text(input).unwrap();

        assert_eq!(level.grid.width(), 5);
        assert_eq!(level.grid.height(), 3);
        assert_eq!(level.hero, Point::new(1, 1));
        assert_eq!(level.boxes, vec![Point::new(2, 1)]);
        assert_eq!(level.grid.targets(), &[Point::new(3, 1)]);
    }

    #[test]
    fn test_parse_features() {
        let input = "#######\n\
                     #@^r~R#\n\
                     #$  .*#\n\
                     #######";
        let level = Level::from_text(input).unwrap();
        let grid = &level.grid;

        assert_eq!(
            grid.feature_at(Point::new(2, 1)),
            Some(Feature::Spring(Direction::Up))
        );
        assert_eq!(
            grid.feature_at(Point::new(3, 1)),
            Some(Feature::Treadmill(Direction::Right))
        );
        assert_eq!(grid.feature_at(Point::new(4, 1)), Some(Feature::OilyFloor));
        assert_eq!(
            grid.feature_at(Point::new(5, 1)),
            Some(Feature::OneWayDoor(Direction::Right))
        );
        // '*' stacks a box on a target.
        assert!(grid.is_target(Point::new(5, 2)));
        assert!(level.boxes.contains(&Point::new(5, 2)));
        assert_eq!(level.boxes.len(), 2);
    }

    #[test]
    fn test_no_hero() {
        let input = "####\n\
                     #  #\n\
                     ####";
        assert!(Level::from_text(input).is_err());
    }

    #[test]
    fn test_multiple_heroes() {
        let input = "####\n\
                     #@@#\n\
                     ####";
        assert!(Level::from_text(input).is_err());
    }

    #[test]
    fn test_hero_on_target() {
        let input = "#####\n\
                     #$+ #\n\
                     #$. #\n\
                     #####";
        let level = Level::from_text(input).unwrap();
        assert_eq!(level.hero, Point::new(2, 1));
        assert!(level.grid.is_target(Point::new(2, 1)));
    }

    #[test]
    fn test_target_box_count_validation() {
        // More targets than boxes - should fail
        let more_targets = "#####\n\
                            #..@#\n\
                            # $ #\n\
                            #####";
        assert!(Level::from_text(more_targets).is_err());

        // More boxes than targets - should fail
        let more_boxes = "#####\n\
                          #$$@#\n\
                          # . #\n\
                          #####";
        assert!(Level::from_text(more_boxes).is_err());

        // Equal targets and boxes - should succeed
        let balanced = "#####\n\
                        #$.@#\n\
                        # * #\n\
                        #####";
        assert!(Level::from_text(balanced).is_ok());
    }

    #[test]
    fn test_render_round_trip() {
        let input = "#######\n\
                     #@^r~R#\n\
                     #$  .*#\n\
                     #######";
        let level = Level::from_text(input).unwrap();
        assert_eq!(level.to_string().trim_end(), input);
    }

    #[test]
    fn test_render_moved_positions() {
        let input = "#####\n\
                     #@$.#\n\
                     #####";
        let level = Level::from_text(input).unwrap();
        let rendered = level.render(Point::new(2, 1), &[Point::new(3, 1)]);
        assert_eq!(rendered.trim_end(), "#####\n# @*#\n#####");
    }

    #[test]
    fn test_levels_from_text() {
        let level1 = "#####\n#@$.#\n#####";
        let level2 = "#####\n#.$@#\n#~  #\n#####";

        let contents = format!("; 1\n\n{}\n\n; 2\n\n{}\n", level1, level2);
        let levels = Levels::from_text(&contents).unwrap();

        assert_eq!(levels.len(), 2);
        assert_eq!(levels.get(0).unwrap().to_string().trim_end(), level1);
        assert_eq!(levels.get(1).unwrap().to_string().trim_end(), level2);
        assert!(levels.get(2).is_none());
    }

    #[test]
    fn test_levels_invalid_level() {
        let contents = "; 1\n\n####\n#@@#\n####\n";
        let result = Levels::from_text(contents);
        assert!(matches!(result.unwrap_err(), LevelError::InvalidLevel(_)));
    }

    #[test]
    fn test_levels_missing_file() {
        let result = Levels::from_file("nonexistent_file.txt");
        assert!(matches!(result.unwrap_err(), LevelError::Io(_)));
    }
}
