//! Balloon entity and its lifecycle machines
//!
//! A balloon is a container with two parts: the top (the envelope the player
//! taps) and the bottom (the basket). Each has its own machine:
//!
//! - container: `Alive -> Popped -> Dead`
//! - top: `Alive -> Dead`
//! - bottom: `Alive -> Falling -> Dead`
//!
//! Popping is the only transition the outside world can trigger. Once popped,
//! the container waits until both parts have taken themselves off screen and
//! then moves to `Dead`, which tells the scene to drop it.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::command::{
    BasketSide, CommandQueue, EntityId, EntityKind, RenderCommand, SoundEffect,
};
use super::progression::ProgressionTracker;
use crate::consts::*;
use crate::fsm::{State, StateMachine};
use crate::settings::PlayArea;
use crate::{ease_in, lerp_vec2};

/// Number of balloon top colours
pub const TOP_VARIANTS: u8 = 8;
/// Number of basket sprites per side
pub const BOTTOM_VARIANTS: u8 = 4;

/// Container lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalloonState {
    Alive,
    Popped,
    Dead,
}

impl State for BalloonState {
    fn name(&self) -> &'static str {
        match self {
            Self::Alive => "Alive",
            Self::Popped => "Popped",
            Self::Dead => "Dead",
        }
    }

    fn valid_next_states(&self) -> &'static [Self] {
        match self {
            Self::Alive => &[Self::Popped],
            Self::Popped => &[Self::Dead],
            Self::Dead => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopState {
    Alive,
    Dead,
}

impl State for TopState {
    fn name(&self) -> &'static str {
        match self {
            Self::Alive => "Alive",
            Self::Dead => "Dead",
        }
    }

    fn valid_next_states(&self) -> &'static [Self] {
        match self {
            Self::Alive => &[Self::Dead],
            Self::Dead => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BottomState {
    Alive,
    Falling,
    Dead,
}

impl State for BottomState {
    fn name(&self) -> &'static str {
        match self {
            Self::Alive => "Alive",
            Self::Falling => "Falling",
            Self::Dead => "Dead",
        }
    }

    fn valid_next_states(&self) -> &'static [Self] {
        match self {
            Self::Alive => &[Self::Falling],
            Self::Falling => &[Self::Dead],
            Self::Dead => &[],
        }
    }
}

/// One visual part of a balloon
pub trait BalloonPart {
    fn kind(&self) -> EntityKind;

    fn position(&self) -> Vec2;

    /// Track the container while the balloon is still rising
    fn follow(&mut self, anchor: Vec2);

    /// Advance this part's own machine
    fn update(&mut self, dt: f32, out: &mut CommandQueue);

    /// The part has removed itself from the render tree
    fn is_detached(&self) -> bool;

    /// Remove the part's sprite without going through its lifecycle
    fn detach(&mut self, out: &mut CommandQueue);
}

/// Something the player can tap
pub trait Interactable {
    fn entity_id(&self) -> EntityId;

    /// Whether a tap would be accepted right now
    fn accepts_interaction(&self) -> bool;

    /// Handle a tap. Returns true if it changed anything.
    fn on_primary_interaction(
        &mut self,
        tracker: &mut ProgressionTracker,
        out: &mut CommandQueue,
    ) -> bool;
}

/// The balloon envelope
#[derive(Debug, Clone)]
pub struct BalloonTop {
    owner: EntityId,
    machine: StateMachine<TopState>,
    variant: u8,
    position: Vec2,
    detached: bool,
}

impl BalloonTop {
    fn new(owner: EntityId, variant: u8, anchor: Vec2) -> Self {
        let mut top = Self {
            owner,
            machine: StateMachine::new("balloon top", TopState::Alive),
            variant,
            position: Vec2::ZERO,
            detached: false,
        };
        top.follow(anchor);
        top
    }

    pub fn state(&self) -> TopState {
        self.machine.current()
    }

    /// 1.0 while alive, fading to 0.0 after the pop
    pub fn opacity(&self) -> f32 {
        match self.machine.current() {
            TopState::Alive => 1.0,
            TopState::Dead => (1.0 - self.machine.elapsed() / TOP_FADE_DURATION).clamp(0.0, 1.0),
        }
    }

    /// Burst the envelope: pop effect now, removal once faded
    fn kill(&mut self, out: &mut CommandQueue) {
        if self.machine.enter(TopState::Dead) {
            out.push(RenderCommand::PlayEffect(SoundEffect::BalloonPop));
        }
    }
}

impl BalloonPart for BalloonTop {
    fn kind(&self) -> EntityKind {
        EntityKind::BalloonTop {
            variant: self.variant,
        }
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn follow(&mut self, anchor: Vec2) {
        if self.machine.is_in(TopState::Alive) {
            self.position = anchor + Vec2::new(0.0, PART_SIZE / 2.0);
        }
    }

    fn update(&mut self, dt: f32, out: &mut CommandQueue) {
        self.machine.update(dt);
        if self.machine.is_in(TopState::Dead)
            && !self.detached
            && self.machine.elapsed() >= TOP_FADE_DURATION
        {
            self.detach(out);
        }
    }

    fn is_detached(&self) -> bool {
        self.detached
    }

    fn detach(&mut self, out: &mut CommandQueue) {
        if !self.detached {
            self.detached = true;
            out.push(RenderCommand::RemoveEntity {
                id: self.owner,
                kind: self.kind(),
            });
        }
    }
}

/// The basket hanging under the envelope
#[derive(Debug, Clone)]
pub struct BalloonBottom {
    owner: EntityId,
    machine: StateMachine<BottomState>,
    side: BasketSide,
    variant: u8,
    position: Vec2,
    fall_from: Vec2,
    detached: bool,
}

impl BalloonBottom {
    fn new(owner: EntityId, side: BasketSide, variant: u8, anchor: Vec2) -> Self {
        let mut bottom = Self {
            owner,
            machine: StateMachine::new("balloon bottom", BottomState::Alive),
            side,
            variant,
            position: Vec2::ZERO,
            fall_from: Vec2::ZERO,
            detached: false,
        };
        bottom.follow(anchor);
        bottom
    }

    pub fn state(&self) -> BottomState {
        self.machine.current()
    }

    /// Cut the basket loose
    fn release(&mut self, out: &mut CommandQueue) {
        if self.machine.enter(BottomState::Falling) {
            self.fall_from = self.position;
            out.push(RenderCommand::PlayEffect(SoundEffect::BasketFalling));
        }
    }

    fn enter_dead(&mut self, out: &mut CommandQueue) {
        if self.machine.enter(BottomState::Dead) {
            self.detach(out);
        }
    }
}

impl BalloonPart for BalloonBottom {
    fn kind(&self) -> EntityKind {
        EntityKind::BalloonBottom {
            side: self.side,
            variant: self.variant,
        }
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn follow(&mut self, anchor: Vec2) {
        if self.machine.is_in(BottomState::Alive) {
            self.position = anchor - Vec2::new(0.0, PART_SIZE / 2.0);
        }
    }

    fn update(&mut self, dt: f32, out: &mut CommandQueue) {
        self.machine.update(dt);
        if !self.machine.is_in(BottomState::Falling) {
            return;
        }

        let t = self.machine.elapsed() / BASKET_FALL_DURATION;
        let target = Vec2::new(self.fall_from.x, BASKET_FALL_TARGET_Y);
        self.position = if t >= 1.0 {
            target
        } else {
            lerp_vec2(self.fall_from, target, ease_in(t))
        };

        // Fallen far enough, whether or not the timed fall has finished
        if self.position.y <= BASKET_FALL_TARGET_Y || t >= 1.0 {
            self.enter_dead(out);
        }
    }

    fn is_detached(&self) -> bool {
        self.detached
    }

    fn detach(&mut self, out: &mut CommandQueue) {
        if !self.detached {
            self.detached = true;
            out.push(RenderCommand::RemoveEntity {
                id: self.owner,
                kind: self.kind(),
            });
        }
    }
}

/// Randomized launch parameters for one balloon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchParams {
    pub x: f32,
    pub rise_duration: f32,
    pub top_variant: u8,
    pub side: BasketSide,
    pub bottom_variant: u8,
}

impl LaunchParams {
    pub fn random<R: Rng>(area: &PlayArea, rng: &mut R) -> Self {
        let (min_x, max_x) = area.spawn_x_range();
        let x = if max_x > min_x {
            rng.random_range(min_x..=max_x)
        } else {
            0.0
        };
        Self {
            x,
            rise_duration: rng.random_range(RISE_DURATION_MIN..=RISE_DURATION_MAX),
            top_variant: rng.random_range(0..TOP_VARIANTS),
            side: if rng.random_bool(0.5) {
                BasketSide::Left
            } else {
                BasketSide::Right
            },
            bottom_variant: rng.random_range(0..BOTTOM_VARIANTS),
        }
    }
}

/// A balloon in flight
#[derive(Debug, Clone)]
pub struct Balloon {
    id: EntityId,
    machine: StateMachine<BalloonState>,
    /// Heading in degrees (0 = north)
    heading: i32,
    spawn: Vec2,
    position: Vec2,
    rise_duration: f32,
    rise_speed: f32,
    top: BalloonTop,
    bottom: BalloonBottom,
    removal_requested: bool,
}

impl Balloon {
    /// Launch a balloon with random position, speed and sprites
    pub fn spawn<R: Rng>(
        id: EntityId,
        area: &PlayArea,
        rng: &mut R,
        out: &mut CommandQueue,
    ) -> Self {
        Self::launch(id, area, LaunchParams::random(area, rng), out)
    }

    /// Launch a balloon with explicit parameters
    pub fn launch(
        id: EntityId,
        area: &PlayArea,
        params: LaunchParams,
        out: &mut CommandQueue,
    ) -> Self {
        let spawn = Vec2::new(params.x, area.launch_y());
        let rise_duration = params.rise_duration.max(f32::EPSILON);
        let mut balloon = Self {
            id,
            machine: StateMachine::new("balloon", BalloonState::Alive),
            heading: 0,
            spawn,
            position: spawn,
            rise_duration,
            rise_speed: (area.escape_y() - spawn.y) / rise_duration,
            top: BalloonTop::new(id, params.top_variant, spawn),
            bottom: BalloonBottom::new(id, params.side, params.bottom_variant, spawn),
            removal_requested: false,
        };
        balloon.enter_alive(out);
        balloon
    }

    fn enter_alive(&mut self, out: &mut CommandQueue) {
        for (kind, position) in [
            (self.top.kind(), self.top.position()),
            (self.bottom.kind(), self.bottom.position()),
        ] {
            out.push(RenderCommand::SpawnEntity {
                id: self.id,
                kind,
                position,
            });
        }
        log::debug!(
            "Balloon {:?} launched at x={:.1}, rising for {:.2}s",
            self.id,
            self.spawn.x,
            self.rise_duration
        );
    }

    fn enter_popped(&mut self, tracker: &mut ProgressionTracker, out: &mut CommandQueue) {
        self.top.kill(out);
        self.bottom.release(out);
        tracker.record_pop();
        log::debug!("Balloon {:?} popped at {:?}", self.id, self.position);
    }

    fn enter_dead(&mut self) {
        self.removal_requested = true;
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn state(&self) -> BalloonState {
        self.machine.current()
    }

    pub fn heading(&self) -> i32 {
        self.heading
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rise_duration(&self) -> f32 {
        self.rise_duration
    }

    /// Vertical speed in units per second
    pub fn rise_speed(&self) -> f32 {
        self.rise_speed
    }

    pub fn top(&self) -> &BalloonTop {
        &self.top
    }

    pub fn bottom(&self) -> &BalloonBottom {
        &self.bottom
    }

    /// Both parts have removed themselves from the render tree
    pub fn parts_detached(&self) -> bool {
        self.top.is_detached() && self.bottom.is_detached()
    }

    /// Dead and waiting for the scene to drop it
    pub fn is_removal_requested(&self) -> bool {
        self.removal_requested
    }

    /// Still alive after its full rise: it floated off the top
    pub fn has_escaped(&self) -> bool {
        self.machine.is_in(BalloonState::Alive) && self.machine.elapsed() >= self.rise_duration
    }

    /// Remove an escaped balloon's sprites. The lifecycle is left as is.
    pub fn despawn(&mut self, out: &mut CommandQueue) {
        self.top.detach(out);
        self.bottom.detach(out);
    }

    /// Advance the balloon and both parts by one tick
    pub fn update(&mut self, dt: f32, out: &mut CommandQueue) {
        self.machine.update(dt);

        match self.machine.current() {
            BalloonState::Alive => {
                let risen = self.machine.elapsed().min(self.rise_duration);
                self.position = self.spawn + Vec2::new(0.0, self.rise_speed * risen);
                self.top.follow(self.position);
                self.bottom.follow(self.position);
            }
            BalloonState::Popped => {
                self.top.update(dt, out);
                self.bottom.update(dt, out);
                if self.parts_detached() && self.machine.enter(BalloonState::Dead) {
                    self.enter_dead();
                }
            }
            BalloonState::Dead => {}
        }
    }
}

impl Interactable for Balloon {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn accepts_interaction(&self) -> bool {
        self.machine.is_in(BalloonState::Alive) && !self.top.is_detached()
    }

    fn on_primary_interaction(
        &mut self,
        tracker: &mut ProgressionTracker,
        out: &mut CommandQueue,
    ) -> bool {
        if !self.accepts_interaction() {
            return false;
        }
        if self.machine.enter(BalloonState::Popped) {
            self.enter_popped(tracker, out);
            true
        } else {
            false
        }
    }
}
