//! Level difficulty table
//!
//! Each level has a scalar on the base balloon count and the fraction of
//! those balloons that must be popped to clear it:
//! `balloons = floor(base * scalar + base)`, `to_pop = floor(balloons * fraction)`.
//! Arithmetic is single precision so the counts match the tuned table exactly.

use serde::{Deserialize, Serialize};

use crate::consts::BASE_BALLOON_COUNT;
use crate::error::GameError;

/// Difficulty entry for one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelDifficulty {
    pub level: u32,
    /// Multiplier on the base balloon count
    pub scalar: f32,
    /// Fraction of the level's balloons that must be popped
    pub pop_fraction: f32,
}

impl LevelDifficulty {
    /// Total balloons that fly in this level
    pub fn balloons_for_level(&self) -> u32 {
        let total = (BASE_BALLOON_COUNT * self.scalar) + BASE_BALLOON_COUNT;
        total.floor().max(0.0) as u32
    }

    /// Balloons that must be popped to win this level
    pub fn balloons_to_pop(&self) -> u32 {
        let total = self.balloons_for_level() as f32 * self.pop_fraction;
        total.floor().max(0.0) as u32
    }
}

/// Default tuning: 10 levels from 20 to 310 balloons
const DEFAULT_TABLE: [(f32, f32); 10] = [
    (1.0, 0.5),   // 20 balloons, 10 to pop
    (1.5, 0.6),   // 25, 15
    (2.0, 0.7),   // 30, 21
    (3.8, 0.75),  // 48, 36
    (4.7, 0.8),   // 57, 45
    (5.3, 0.8),   // 63, 50
    (6.6, 0.82),  // 76, 62
    (7.1, 0.85),  // 81, 68
    (10.0, 0.85), // 110, 93
    (30.0, 0.9),  // 310, 279
];

/// Ordered difficulty table, levels 1..=max_level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LevelDifficulty>", into = "Vec<LevelDifficulty>")]
pub struct DifficultyModel {
    levels: Vec<LevelDifficulty>,
}

impl Default for DifficultyModel {
    fn default() -> Self {
        let levels = DEFAULT_TABLE
            .iter()
            .enumerate()
            .map(|(i, &(scalar, pop_fraction))| LevelDifficulty {
                level: i as u32 + 1,
                scalar,
                pop_fraction,
            })
            .collect();
        Self { levels }
    }
}

impl DifficultyModel {
    /// Build a table, checking that levels run 1, 2, 3... and values are sane
    pub fn new(mut levels: Vec<LevelDifficulty>) -> Result<Self, GameError> {
        if levels.is_empty() {
            return Err(GameError::InvalidDifficulty(
                "table has no levels".to_string(),
            ));
        }

        levels.sort_by_key(|l| l.level);
        for (i, entry) in levels.iter().enumerate() {
            let expected = i as u32 + 1;
            if entry.level != expected {
                return Err(GameError::InvalidDifficulty(format!(
                    "expected level {expected}, found level {}",
                    entry.level
                )));
            }
            if !entry.scalar.is_finite() || entry.scalar <= -1.0 {
                return Err(GameError::InvalidDifficulty(format!(
                    "level {} scalar {} leaves no balloons",
                    entry.level, entry.scalar
                )));
            }
            if !(0.0..=1.0).contains(&entry.pop_fraction) {
                return Err(GameError::InvalidDifficulty(format!(
                    "level {} pop fraction {} outside [0, 1]",
                    entry.level, entry.pop_fraction
                )));
            }
        }

        Ok(Self { levels })
    }

    /// Difficulty for `level`, or `UnknownLevel` past the end of the table
    pub fn lookup(&self, level: u32) -> Result<LevelDifficulty, GameError> {
        level
            .checked_sub(1)
            .and_then(|i| self.levels.get(i as usize))
            .copied()
            .ok_or(GameError::UnknownLevel {
                level,
                max_level: self.max_level(),
            })
    }

    /// `(balloons_for_level, balloons_to_pop)` from one table entry
    pub fn balloon_counts(&self, level: u32) -> Result<(u32, u32), GameError> {
        let entry = self.lookup(level)?;
        Ok((entry.balloons_for_level(), entry.balloons_to_pop()))
    }

    pub fn contains(&self, level: u32) -> bool {
        level >= 1 && level <= self.max_level()
    }

    pub fn max_level(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn levels(&self) -> &[LevelDifficulty] {
        &self.levels
    }
}

impl TryFrom<Vec<LevelDifficulty>> for DifficultyModel {
    type Error = GameError;

    fn try_from(levels: Vec<LevelDifficulty>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<DifficultyModel> for Vec<LevelDifficulty> {
    fn from(model: DifficultyModel) -> Self {
        model.levels
    }
}
