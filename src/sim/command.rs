//! Commands sent to the rendering/audio collaborator
//!
//! The engine never draws or plays anything itself. Every visible or audible
//! consequence of a state change is queued as a [`RenderCommand`] that the
//! host drains once per frame. All commands are fire-and-forget.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::flow::Screen;

/// Identifier of a balloon, carried by every command about it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Hands out increasing entity ids for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next_id: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        EntityId(id)
    }
}

/// Which side the basket rope hangs towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BasketSide {
    Left,
    Right,
}

/// Visual pieces the host spawns and removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// The tappable balloon envelope; `variant` picks the colour
    BalloonTop { variant: u8 },
    /// The hanging basket
    BalloonBottom { side: BasketSide, variant: u8 },
}

impl EntityKind {
    pub fn is_top(&self) -> bool {
        matches!(self, EntityKind::BalloonTop { .. })
    }
}

/// Timed text shown over the play field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Announcement {
    Ready,
    Go,
    LevelClear,
    LevelFailed,
}

/// Sound effect cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Balloon top bursts
    BalloonPop,
    /// Basket starts falling
    BasketFalling,
    /// Level won
    LevelClear,
    /// Level lost
    LevelFailed,
}

/// HUD values: top bar (level, to pop, popped) and bottom bar (score)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Readout {
    pub level: u32,
    pub to_pop: u32,
    pub popped: u32,
    pub score: u64,
    pub lives: u32,
    pub continues: u32,
}

/// One instruction for the rendering collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    PresentScreen(Screen),
    Announce(Announcement),
    SpawnEntity {
        id: EntityId,
        kind: EntityKind,
        position: Vec2,
    },
    RemoveEntity {
        id: EntityId,
        kind: EntityKind,
    },
    UpdateReadout(Readout),
    PlayEffect(SoundEffect),
}

/// Queue of commands produced during one or more ticks
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<RenderCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderCommand> {
        self.commands.iter()
    }

    /// Take everything queued so far
    pub fn drain(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }
}
