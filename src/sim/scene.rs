//! One attempt at one level
//!
//! `Starting` plays the Ready/Go intro, `Active` launches and ticks balloons
//! until the spawn budget is spent and the sky is empty, `Ending` announces
//! the result and then reports a [`LevelOutcome`] to the session. A new
//! scene is built for every attempt.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::balloon::{Balloon, Interactable};
use super::command::{
    Announcement, CommandQueue, EntityId, IdAllocator, Readout, RenderCommand, SoundEffect,
};
use super::progression::ProgressionTracker;
use super::sequence::{Sequence, Step};
use crate::error::GameError;
use crate::fsm::{State, StateMachine};
use crate::settings::{PlayArea, Settings, SpawnMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneState {
    Starting,
    Active,
    Ending,
}

impl State for SceneState {
    fn name(&self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::Active => "Active",
            Self::Ending => "Ending",
        }
    }

    fn valid_next_states(&self) -> &'static [Self] {
        match self {
            Self::Starting => &[Self::Active],
            Self::Active => &[Self::Ending],
            Self::Ending => &[],
        }
    }
}

/// How the level is set up when play begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelEntry {
    /// Advance to the next level
    Next,
    /// Replay the current level after a loss
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelOutcome {
    Won,
    Lost,
}

#[derive(Debug, Clone)]
pub struct PlayScene {
    machine: StateMachine<SceneState>,
    entry: LevelEntry,
    spawn_mode: SpawnMode,
    area: PlayArea,
    level_clear_duration: f32,
    level_failed_duration: f32,
    /// Balloons in flight, ordered by id
    balloons: Vec<Balloon>,
    announcements: Sequence<Announcement>,
    outcome: Option<LevelOutcome>,
    reported: bool,
    last_readout: Option<Readout>,
}

impl PlayScene {
    /// Build a scene in `Starting` and show the first intro cue
    pub fn new(entry: LevelEntry, settings: &Settings, out: &mut CommandQueue) -> Self {
        let intro = Sequence::new(vec![
            Step::new(Announcement::Ready, settings.ready_duration),
            Step::new(Announcement::Go, settings.go_duration),
        ]);
        if let Some(cue) = intro.current() {
            out.push(RenderCommand::Announce(cue));
        }

        Self {
            machine: StateMachine::new("play scene", SceneState::Starting),
            entry,
            spawn_mode: settings.spawn_mode,
            area: settings.play_area,
            level_clear_duration: settings.level_clear_duration,
            level_failed_duration: settings.level_failed_duration,
            balloons: Vec::new(),
            announcements: intro,
            outcome: None,
            reported: false,
            last_readout: None,
        }
    }

    pub fn state(&self) -> SceneState {
        self.machine.current()
    }

    pub fn entry(&self) -> LevelEntry {
        self.entry
    }

    /// Result of the level, known from the moment `Ending` is entered
    pub fn outcome(&self) -> Option<LevelOutcome> {
        self.outcome
    }

    pub fn balloons(&self) -> &[Balloon] {
        &self.balloons
    }

    pub fn balloon(&self, id: EntityId) -> Option<&Balloon> {
        self.balloons
            .binary_search_by_key(&id, |b| b.id())
            .ok()
            .map(|i| &self.balloons[i])
    }

    /// Taps are only accepted during `Active`
    pub fn is_interactive(&self) -> bool {
        self.machine.is_in(SceneState::Active)
    }

    /// Nothing left to launch and nothing still flying
    pub fn level_exhausted(&self, tracker: &ProgressionTracker) -> bool {
        tracker.spawn_budget_exhausted()
            && tracker.live_balloons().is_empty()
            && self.balloons.is_empty()
    }

    /// Advance the scene. Returns the outcome once, after the closing
    /// announcement has finished.
    pub fn update<R: Rng>(
        &mut self,
        dt: f32,
        tracker: &mut ProgressionTracker,
        rng: &mut R,
        ids: &mut IdAllocator,
        out: &mut CommandQueue,
    ) -> Result<Option<LevelOutcome>, GameError> {
        self.machine.update(dt);

        match self.machine.current() {
            SceneState::Starting => {
                if self.play_announcements(dt, out) {
                    self.enter_active(tracker, out)?;
                }
                Ok(None)
            }
            SceneState::Active => {
                self.tick_active(dt, tracker, rng, ids, out);
                if self.level_exhausted(tracker) {
                    self.enter_ending(tracker, out);
                }
                Ok(None)
            }
            SceneState::Ending => {
                if self.play_announcements(dt, out) && !self.reported {
                    self.reported = true;
                    return Ok(self.outcome);
                }
                Ok(None)
            }
        }
    }

    fn play_announcements(&mut self, dt: f32, out: &mut CommandQueue) -> bool {
        self.announcements
            .update(dt, |cue| out.push(RenderCommand::Announce(cue)))
    }

    fn enter_active(
        &mut self,
        tracker: &mut ProgressionTracker,
        out: &mut CommandQueue,
    ) -> Result<(), GameError> {
        if !self.machine.can_enter(SceneState::Active) {
            return Ok(());
        }
        match self.entry {
            LevelEntry::Next => tracker.prepare_level()?,
            LevelEntry::Retry => tracker.restart_level()?,
        }
        self.machine.enter(SceneState::Active);
        self.sync_readout(tracker, out);
        Ok(())
    }

    fn tick_active<R: Rng>(
        &mut self,
        dt: f32,
        tracker: &mut ProgressionTracker,
        rng: &mut R,
        ids: &mut IdAllocator,
        out: &mut CommandQueue,
    ) {
        self.sync_readout(tracker, out);

        // At most one launch per tick
        if !tracker.spawn_budget_exhausted() {
            let launch = match self.spawn_mode {
                SpawnMode::PerTick => tracker.try_spawn_balloon(rng),
                SpawnMode::TimeBased => tracker.try_spawn_balloon_over(dt, rng),
            };
            if launch {
                let id = ids.next_entity_id();
                let balloon = Balloon::spawn(id, &self.area, rng, out);
                tracker.record_launch(id);
                self.balloons.push(balloon);
                self.normalize_order();
            }
        }

        for balloon in &mut self.balloons {
            balloon.update(dt, out);
        }

        self.cull(tracker, out);
    }

    /// Drop balloons that died or floated away
    fn cull(&mut self, tracker: &mut ProgressionTracker, out: &mut CommandQueue) {
        self.balloons.retain_mut(|balloon| {
            if balloon.has_escaped() {
                balloon.despawn(out);
                tracker.release_balloon(balloon.id());
                tracker.record_escape();
                log::debug!("Balloon {:?} escaped", balloon.id());
                false
            } else if balloon.is_removal_requested() {
                tracker.release_balloon(balloon.id());
                false
            } else {
                true
            }
        });
    }

    fn enter_ending(&mut self, tracker: &ProgressionTracker, out: &mut CommandQueue) {
        if !self.machine.enter(SceneState::Ending) {
            return;
        }
        self.sync_readout(tracker, out);

        let (outcome, cue, effect, duration) = if tracker.has_player_won() {
            (
                LevelOutcome::Won,
                Announcement::LevelClear,
                SoundEffect::LevelClear,
                self.level_clear_duration,
            )
        } else {
            (
                LevelOutcome::Lost,
                Announcement::LevelFailed,
                SoundEffect::LevelFailed,
                self.level_failed_duration,
            )
        };
        self.outcome = Some(outcome);
        self.announcements = Sequence::new(vec![Step::new(cue, duration)]);
        out.push(RenderCommand::Announce(cue));
        out.push(RenderCommand::PlayEffect(effect));

        log::info!(
            "Level {} {:?}: popped {}/{} ({} escaped)",
            tracker.current_level(),
            outcome,
            tracker.num_balloons_tapped(),
            tracker.num_balloons_to_pop(),
            tracker.balloons_escaped()
        );
    }

    /// Emit the HUD values if they changed since the last emission
    fn sync_readout(&mut self, tracker: &ProgressionTracker, out: &mut CommandQueue) {
        let readout = tracker.readout();
        if self.last_readout != Some(readout) {
            self.last_readout = Some(readout);
            out.push(RenderCommand::UpdateReadout(readout));
        }
    }

    /// Sort balloons by id for stable iteration
    fn normalize_order(&mut self) {
        self.balloons.sort_by_key(|b| b.id());
    }

    /// Route a tap to the balloon with `id`
    pub fn on_primary_interaction(
        &mut self,
        id: EntityId,
        tracker: &mut ProgressionTracker,
        out: &mut CommandQueue,
    ) -> bool {
        if !self.is_interactive() {
            return false;
        }
        match self.balloons.binary_search_by_key(&id, |b| b.id()) {
            Ok(i) => self.balloons[i].on_primary_interaction(tracker, out),
            Err(_) => false,
        }
    }

    /// Take every remaining balloon off screen (quitting mid-level)
    pub fn clear(&mut self, tracker: &mut ProgressionTracker, out: &mut CommandQueue) {
        for balloon in &mut self.balloons {
            balloon.despawn(out);
            tracker.release_balloon(balloon.id());
        }
        self.balloons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::difficulty::{DifficultyModel, LevelDifficulty};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Rig {
        settings: Settings,
        tracker: ProgressionTracker,
        rng: Pcg32,
        ids: IdAllocator,
        out: CommandQueue,
    }

    impl Rig {
        fn new(settings: Settings) -> Self {
            Self {
                tracker: ProgressionTracker::from_settings(&settings),
                settings,
                rng: Pcg32::seed_from_u64(1234),
                ids: IdAllocator::new(),
                out: CommandQueue::new(),
            }
        }

        fn scene(&mut self, entry: LevelEntry) -> PlayScene {
            PlayScene::new(entry, &self.settings, &mut self.out)
        }

        fn step(&mut self, scene: &mut PlayScene, dt: f32) -> Option<LevelOutcome> {
            scene
                .update(dt, &mut self.tracker, &mut self.rng, &mut self.ids, &mut self.out)
                .unwrap()
        }

        /// Run until the scene reports, popping balloons if asked
        fn run(&mut self, scene: &mut PlayScene, pop: bool) -> LevelOutcome {
            for _ in 0..60 * 600 {
                if pop {
                    let alive: Vec<_> = scene
                        .balloons()
                        .iter()
                        .filter(|b| b.accepts_interaction())
                        .map(|b| b.id())
                        .collect();
                    for id in alive {
                        scene.on_primary_interaction(id, &mut self.tracker, &mut self.out);
                    }
                }
                if let Some(outcome) = self.step(scene, 1.0 / 60.0) {
                    return outcome;
                }
            }
            panic!("scene never finished");
        }
    }

    fn small_level_settings() -> Settings {
        Settings {
            difficulty: DifficultyModel::new(vec![LevelDifficulty {
                level: 1,
                scalar: 0.0,
                pop_fraction: 0.5,
            }])
            .unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_scene_edges() {
        assert_eq!(SceneState::Starting.valid_next_states(), &[SceneState::Active]);
        assert_eq!(SceneState::Active.valid_next_states(), &[SceneState::Ending]);
        assert!(SceneState::Ending.is_final());
    }

    #[test]
    fn test_intro_is_not_interactive() {
        let mut rig = Rig::new(Settings::default());
        let mut scene = rig.scene(LevelEntry::Next);
        assert_eq!(rig.out.drain(), vec![RenderCommand::Announce(Announcement::Ready)]);

        rig.step(&mut scene, 0.5);
        assert_eq!(scene.state(), SceneState::Starting);
        assert!(!scene.is_interactive());
        assert_eq!(rig.tracker.current_level(), 0);

        rig.step(&mut scene, 0.6);
        assert_eq!(rig.out.drain(), vec![RenderCommand::Announce(Announcement::Go)]);

        rig.step(&mut scene, 0.75);
        assert_eq!(scene.state(), SceneState::Active);
        assert_eq!(rig.tracker.current_level(), 1);
        assert_eq!(rig.tracker.num_balloons_to_pop(), 10);
    }

    #[test]
    fn test_popping_everything_wins() {
        let mut rig = Rig::new(small_level_settings());
        let mut scene = rig.scene(LevelEntry::Next);
        assert_eq!(rig.run(&mut scene, true), LevelOutcome::Won);
        assert_eq!(scene.state(), SceneState::Ending);
        assert_eq!(rig.tracker.balloons_launched(), 10);
        assert_eq!(rig.tracker.num_balloons_tapped(), 10);
        assert_eq!(rig.tracker.current_score(), 50);
        assert!(rig.tracker.live_balloons().is_empty());

        let announced: Vec<_> = rig
            .out
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Announce(a) => Some(*a),
                _ => None,
            })
            .collect();
        assert_eq!(
            announced,
            vec![Announcement::Ready, Announcement::Go, Announcement::LevelClear]
        );
    }

    #[test]
    fn test_ignoring_balloons_loses() {
        let mut rig = Rig::new(small_level_settings());
        let mut scene = rig.scene(LevelEntry::Next);
        assert_eq!(rig.run(&mut scene, false), LevelOutcome::Lost);
        assert_eq!(rig.tracker.balloons_escaped(), 10);
        assert_eq!(rig.tracker.num_balloons_tapped(), 0);

        // Every spawned part was removed again
        let spawned = rig
            .out
            .iter()
            .filter(|c| matches!(c, RenderCommand::SpawnEntity { .. }))
            .count();
        let removed = rig
            .out
            .iter()
            .filter(|c| matches!(c, RenderCommand::RemoveEntity { .. }))
            .count();
        assert_eq!(spawned, 20);
        assert_eq!(removed, 20);
    }

    #[test]
    fn test_outcome_reported_once() {
        let mut rig = Rig::new(small_level_settings());
        let mut scene = rig.scene(LevelEntry::Next);
        rig.run(&mut scene, true);
        for _ in 0..10 {
            assert_eq!(rig.step(&mut scene, 1.0), None);
        }
    }

    #[test]
    fn test_retry_restarts_current_level() {
        let mut rig = Rig::new(Settings::default());
        rig.tracker.prepare_level().unwrap();
        rig.tracker.prepare_level().unwrap();
        let mut scene = rig.scene(LevelEntry::Retry);
        rig.step(&mut scene, 5.0);
        assert_eq!(scene.state(), SceneState::Active);
        assert_eq!(rig.tracker.current_level(), 2);
        assert_eq!(rig.tracker.num_balloons_for_level(), 25);
    }

    #[test]
    fn test_unknown_level_is_reported() {
        let mut rig = Rig::new(small_level_settings());
        rig.tracker.prepare_level().unwrap();
        let mut scene = rig.scene(LevelEntry::Next);
        let result = scene.update(
            5.0,
            &mut rig.tracker,
            &mut rig.rng,
            &mut rig.ids,
            &mut rig.out,
        );
        assert!(matches!(result, Err(GameError::UnknownLevel { level: 2, .. })));
        assert_eq!(scene.state(), SceneState::Starting);
        assert_eq!(rig.tracker.current_level(), 1);
    }

    #[test]
    fn test_readout_only_on_change() {
        let mut rig = Rig::new(Settings::default());
        let mut scene = rig.scene(LevelEntry::Next);
        rig.step(&mut scene, 2.0);
        rig.out.drain();

        // Nothing changes while no balloon is popped
        rig.step(&mut scene, 0.0);
        rig.step(&mut scene, 0.0);
        assert!(
            !rig.out
                .iter()
                .any(|c| matches!(c, RenderCommand::UpdateReadout(_)))
        );
    }

    #[test]
    fn test_per_tick_spawn_mode_launches() {
        let settings = Settings {
            spawn_mode: SpawnMode::PerTick,
            ..small_level_settings()
        };
        let mut rig = Rig::new(settings);
        let mut scene = rig.scene(LevelEntry::Next);
        rig.step(&mut scene, 2.0);
        for _ in 0..2000 {
            rig.step(&mut scene, 1.0 / 60.0);
        }
        assert!(rig.tracker.balloons_launched() > 0);
        assert!(rig.tracker.balloons_launched() <= 10);
    }

    #[test]
    fn test_taps_ignored_outside_active() {
        let mut rig = Rig::new(Settings::default());
        let mut scene = rig.scene(LevelEntry::Next);
        assert!(!scene.on_primary_interaction(EntityId(0), &mut rig.tracker, &mut rig.out));
    }

    #[test]
    fn test_clear_despawns_everything() {
        let mut rig = Rig::new(small_level_settings());
        let mut scene = rig.scene(LevelEntry::Next);
        rig.step(&mut scene, 2.0);
        while scene.balloons().is_empty() {
            rig.step(&mut scene, 1.0 / 60.0);
        }
        scene.clear(&mut rig.tracker, &mut rig.out);
        assert!(scene.balloons().is_empty());
        assert!(rig.tracker.live_balloons().is_empty());
    }
}
