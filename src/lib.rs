//! Balloon Popper - game state and progression engine
//!
//! Core modules:
//! - `fsm`: Generic state machine over a closed set of states
//! - `sim`: Deterministic simulation (screens, levels, balloons, scoring)
//! - `settings`: Data-driven tuning and difficulty table
//! - `highscores`: Leaderboard
//!
//! Rendering, audio and input are external collaborators. The engine
//! consumes elapsed time and interaction events, and emits render commands.

pub mod error;
pub mod fsm;
pub mod highscores;
pub mod settings;
pub mod sim;

pub use error::GameError;
pub use fsm::{State, StateMachine};
pub use highscores::HighScores;
pub use settings::{PlayArea, Settings, SpawnMode};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep used by the headless driver (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Base number of balloons that fly in any level
    pub const BASE_BALLOON_COUNT: f32 = 10.0;
    /// Points awarded per popped balloon
    pub const POP_POINTS: u64 = 5;
    /// Starting lives and continues
    pub const STARTING_LIVES: u32 = 3;
    pub const STARTING_CONTINUES: u32 = 3;

    /// Spawn roll: a launch happens when `roll < threshold` with roll in [0, range)
    pub const BALLOON_LAUNCH_THRESHOLD: u32 = 5;
    pub const BALLOON_LAUNCH_ROLL_RANGE: u32 = 500;
    /// Rolls per second the per-roll chance was tuned against
    pub const REFERENCE_TICK_RATE: f32 = 60.0;

    /// Screen timings (seconds)
    pub const SPLASH_A_DURATION: f32 = 3.0;
    pub const SPLASH_B_DURATION: f32 = 7.0;

    /// Play area (scene centered on origin, y up)
    pub const PLAY_AREA_WIDTH: f32 = 750.0;
    pub const PLAY_AREA_HEIGHT: f32 = 1334.0;
    pub const PLAY_AREA_MARGIN: f32 = 48.0;

    /// Balloon parts are 32x32, top stacked above bottom
    pub const PART_SIZE: f32 = 32.0;
    /// Rise duration range (seconds)
    pub const RISE_DURATION_MIN: f32 = 5.0;
    pub const RISE_DURATION_MAX: f32 = 15.0;
    /// Popped top fades out before removal
    pub const TOP_FADE_DURATION: f32 = 0.1;
    /// Basket fall (eased in)
    pub const BASKET_FALL_DURATION: f32 = 1.5;
    pub const BASKET_FALL_TARGET_Y: f32 = -2000.0;
}

/// Ease-in curve for t in [0, 1]
#[inline]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Linear interpolation between two points
#[inline]
pub fn lerp_vec2(from: Vec2, to: Vec2, t: f32) -> Vec2 {
    from + (to - from) * t
}
