//! Game settings and tuning
//!
//! Loaded from a JSON file when one is given; every field has a default so a
//! partial file only overrides what it names.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::GameError;
use crate::sim::difficulty::DifficultyModel;

/// How the balloon launch roll is scaled to the tick length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpawnMode {
    /// One roll per tick, whatever the tick length
    PerTick,
    /// Roll scaled by elapsed time against the reference tick rate
    #[default]
    TimeBased,
}

impl SpawnMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpawnMode::PerTick => "PerTick",
            SpawnMode::TimeBased => "TimeBased",
        }
    }
}

impl fmt::Display for SpawnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpawnMode {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pertick" | "per-tick" | "per_tick" | "tick" => Ok(SpawnMode::PerTick),
            "timebased" | "time-based" | "time_based" | "time" => Ok(SpawnMode::TimeBased),
            other => Err(GameError::InvalidSetting(format!(
                "unknown spawn mode '{other}' (expected per-tick or time-based)"
            ))),
        }
    }
}

/// Play field bounds. The field is centered on the origin with y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayArea {
    pub width: f32,
    pub height: f32,
    /// Horizontal inset balloons keep from the side edges
    pub margin: f32,
}

impl Default for PlayArea {
    fn default() -> Self {
        Self {
            width: PLAY_AREA_WIDTH,
            height: PLAY_AREA_HEIGHT,
            margin: PLAY_AREA_MARGIN,
        }
    }
}

impl PlayArea {
    /// Horizontal range a balloon may launch from
    pub fn spawn_x_range(&self) -> (f32, f32) {
        let half = (self.width / 2.0 - self.margin).max(0.0);
        (-half, half)
    }

    /// Launch height: just below the bottom edge
    pub fn launch_y(&self) -> f32 {
        -self.height / 2.0 - PART_SIZE
    }

    /// Height at which a rising balloon is fully off the top edge
    pub fn escape_y(&self) -> f32 {
        self.height / 2.0 + PART_SIZE
    }
}

/// Game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for the session RNG
    pub seed: u64,

    // === Screen timings (seconds) ===
    pub splash_a_duration: f32,
    pub splash_b_duration: f32,

    // === Level announcements (seconds) ===
    pub ready_duration: f32,
    pub go_duration: f32,
    pub level_clear_duration: f32,
    pub level_failed_duration: f32,

    // === Play field ===
    pub play_area: PlayArea,

    // === Spawning ===
    pub spawn_mode: SpawnMode,
    /// Tick rate the per-roll launch chance was tuned for
    pub reference_tick_rate: f32,

    // === Progression ===
    pub starting_lives: u32,
    pub starting_continues: u32,
    pub pop_points: u64,
    pub difficulty: DifficultyModel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0x00ba_1100,

            splash_a_duration: SPLASH_A_DURATION,
            splash_b_duration: SPLASH_B_DURATION,

            ready_duration: 1.0,
            go_duration: 0.75,
            level_clear_duration: 2.0,
            level_failed_duration: 2.0,

            play_area: PlayArea::default(),

            spawn_mode: SpawnMode::TimeBased,
            reference_tick_rate: REFERENCE_TICK_RATE,

            starting_lives: STARTING_LIVES,
            starting_continues: STARTING_CONTINUES,
            pop_points: POP_POINTS,
            difficulty: DifficultyModel::default(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults if the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings ({}: {})", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GameError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<(), GameError> {
        let durations = [
            ("splash_a_duration", self.splash_a_duration),
            ("splash_b_duration", self.splash_b_duration),
            ("ready_duration", self.ready_duration),
            ("go_duration", self.go_duration),
            ("level_clear_duration", self.level_clear_duration),
            ("level_failed_duration", self.level_failed_duration),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(GameError::InvalidSetting(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }

        let area = &self.play_area;
        let finite = area.width.is_finite() && area.height.is_finite() && area.margin.is_finite();
        if !(finite && area.width > 0.0 && area.height > 0.0 && area.margin >= 0.0) {
            return Err(GameError::InvalidSetting(format!(
                "play area {}x{} (margin {}) must be finite and non-empty",
                area.width, area.height, area.margin
            )));
        }

        if !(self.reference_tick_rate.is_finite() && self.reference_tick_rate > 0.0) {
            return Err(GameError::InvalidSetting(format!(
                "reference_tick_rate must be positive, got {}",
                self.reference_tick_rate
            )));
        }

        // Re-run table validation for models built in code
        DifficultyModel::new(self.difficulty.levels().to_vec())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.spawn_mode, SpawnMode::TimeBased);
        assert_eq!(settings.splash_b_duration, 7.0);
        assert_eq!(settings.difficulty.max_level(), 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{"seed": 7, "spawn_mode": "PerTick"}"#).unwrap();
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.spawn_mode, SpawnMode::PerTick);
        assert_eq!(settings.starting_lives, 3);
        assert_eq!(settings.play_area, PlayArea::default());
    }

    #[test]
    fn test_custom_difficulty_from_json() {
        let json = r#"{"difficulty": [
            {"level": 1, "scalar": 0.0, "pop_fraction": 0.5},
            {"level": 2, "scalar": 1.0, "pop_fraction": 0.5}
        ]}"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.difficulty.max_level(), 2);
        assert_eq!(settings.difficulty.balloon_counts(1).unwrap(), (10, 5));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Settings::from_json(r#"{"ready_duration": -1.0}"#).is_err());
        assert!(Settings::from_json(r#"{"play_area": {"width": 0.0}}"#).is_err());
        assert!(Settings::from_json(r#"{"reference_tick_rate": 0.0}"#).is_err());
        assert!(matches!(
            Settings::from_json("not json"),
            Err(GameError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let path = std::env::temp_dir().join("balloon_popper_missing_settings.json");
        let _ = fs::remove_file(&path);
        assert!(matches!(Settings::load(&path), Err(GameError::Io(_))));
        let settings = Settings::load_or_default(&path);
        assert_eq!(settings.seed, Settings::default().seed);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "balloon_popper_settings_{}.json",
            std::process::id()
        ));
        let settings = Settings {
            seed: 99,
            starting_lives: 1,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded.seed, 99);
        assert_eq!(loaded.starting_lives, 1);
    }

    #[test]
    fn test_play_area_geometry() {
        let area = PlayArea::default();
        assert_eq!(area.spawn_x_range(), (-327.0, 327.0));
        assert_eq!(area.launch_y(), -699.0);
        assert_eq!(area.escape_y(), 699.0);
    }

    #[test]
    fn test_spawn_mode_from_str() {
        assert_eq!("PerTick".parse::<SpawnMode>().unwrap(), SpawnMode::PerTick);
        assert_eq!("time-based".parse::<SpawnMode>().unwrap(), SpawnMode::TimeBased);
        assert!(matches!(
            "sometimes".parse::<SpawnMode>(),
            Err(GameError::InvalidSetting(_))
        ));
        assert_eq!(SpawnMode::TimeBased.to_string(), "TimeBased");
    }

    #[test]
    fn test_validate_rejects_infinite_play_area() {
        // 1e39 overflows f32 and parses as infinity
        for json in [
            r#"{"play_area": {"width": 1e39}}"#,
            r#"{"play_area": {"height": 1e39}}"#,
            r#"{"play_area": {"margin": 1e39}}"#,
        ] {
            assert!(
                matches!(Settings::from_json(json), Err(GameError::InvalidSetting(_))),
                "{json}"
            );
        }

        let settings = Settings {
            play_area: PlayArea {
                width: f32::INFINITY,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
