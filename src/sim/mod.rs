//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only advances through `advance(dt)`
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies; output is a command queue

pub mod balloon;
pub mod command;
pub mod difficulty;
pub mod flow;
pub mod progression;
pub mod scene;
pub mod sequence;
pub mod session;

pub use balloon::{Balloon, BalloonPart, BalloonState, BottomState, Interactable, TopState};
pub use command::{
    Announcement, BasketSide, CommandQueue, EntityId, EntityKind, IdAllocator, Readout,
    RenderCommand, SoundEffect,
};
pub use difficulty::{DifficultyModel, LevelDifficulty};
pub use flow::{GameFlow, Screen};
pub use progression::{LossCharge, ProgressionTracker};
pub use scene::{LevelEntry, LevelOutcome, PlayScene, SceneState};
pub use sequence::{Sequence, Step};
pub use session::GameSession;
