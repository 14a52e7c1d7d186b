//! Score, lives and per-level balloon accounting
//!
//! The tracker owns every counter the HUD shows and the rules that decide
//! when a level is won. Balloons themselves live in the play scene; the
//! tracker only keeps the ids of the ones still flying.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::command::{EntityId, Readout};
use super::difficulty::DifficultyModel;
use crate::consts::*;
use crate::error::GameError;
use crate::settings::Settings;

/// What charging a lost level cost the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossCharge {
    /// A life was spent, the level can be retried
    LifeSpent,
    /// No lives left: a continue was spent and lives refilled
    ContinueSpent,
    /// Nothing left to spend
    GameOver,
}

impl LossCharge {
    pub fn can_retry(&self) -> bool {
        !matches!(self, LossCharge::GameOver)
    }
}

/// Progression state for one game (title screen to game over)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionTracker {
    lives: u32,
    continues: u32,
    current_score: u64,
    current_level: u32,
    num_balloons_for_level: u32,
    num_balloons_to_pop: u32,
    num_balloons_tapped: u32,
    /// Balloons launched this level (spawn budget consumed)
    balloons_launched: u32,
    /// Balloons that floated off the top this level
    balloons_escaped: u32,
    /// Ids of balloons currently in flight (non-owning)
    live_balloons: Vec<EntityId>,
    balloon_launch_threshold: u32,
    pop_points: u64,
    starting_lives: u32,
    reference_tick_rate: f32,
    difficulty: DifficultyModel,
}

impl Default for ProgressionTracker {
    fn default() -> Self {
        Self::new(DifficultyModel::default())
    }
}

impl ProgressionTracker {
    pub fn new(difficulty: DifficultyModel) -> Self {
        Self {
            lives: STARTING_LIVES,
            continues: STARTING_CONTINUES,
            current_score: 0,
            current_level: 0,
            num_balloons_for_level: 0,
            num_balloons_to_pop: 0,
            num_balloons_tapped: 0,
            balloons_launched: 0,
            balloons_escaped: 0,
            live_balloons: Vec::new(),
            balloon_launch_threshold: BALLOON_LAUNCH_THRESHOLD,
            pop_points: POP_POINTS,
            starting_lives: STARTING_LIVES,
            reference_tick_rate: REFERENCE_TICK_RATE,
            difficulty,
        }
    }

    /// Fresh tracker using the tuning from settings
    pub fn from_settings(settings: &Settings) -> Self {
        let mut tracker = Self::new(settings.difficulty.clone());
        tracker.lives = settings.starting_lives;
        tracker.continues = settings.starting_continues;
        tracker.starting_lives = settings.starting_lives;
        tracker.pop_points = settings.pop_points;
        tracker.reference_tick_rate = settings.reference_tick_rate;
        tracker
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn continues(&self) -> u32 {
        self.continues
    }

    pub fn current_score(&self) -> u64 {
        self.current_score
    }

    pub fn current_level(&self) -> u32 {
        self.current_level
    }

    pub fn num_balloons_for_level(&self) -> u32 {
        self.num_balloons_for_level
    }

    pub fn num_balloons_to_pop(&self) -> u32 {
        self.num_balloons_to_pop
    }

    pub fn num_balloons_tapped(&self) -> u32 {
        self.num_balloons_tapped
    }

    pub fn balloons_launched(&self) -> u32 {
        self.balloons_launched
    }

    pub fn balloons_escaped(&self) -> u32 {
        self.balloons_escaped
    }

    pub fn live_balloons(&self) -> &[EntityId] {
        &self.live_balloons
    }

    pub fn difficulty(&self) -> &DifficultyModel {
        &self.difficulty
    }

    /// Move to the next level and size it from the difficulty table.
    ///
    /// Fails with `UnknownLevel` when the table has no entry for the next
    /// level; nothing is modified in that case.
    pub fn prepare_level(&mut self) -> Result<(), GameError> {
        let next = self.current_level + 1;
        let (for_level, to_pop) = self.difficulty.balloon_counts(next)?;
        self.current_level = next;
        self.reset_level_counters(for_level, to_pop);
        log::info!(
            "Level {} prepared: {} balloons, {} to pop",
            next,
            for_level,
            to_pop
        );
        Ok(())
    }

    /// Replay the current level with fresh counters
    pub fn restart_level(&mut self) -> Result<(), GameError> {
        let (for_level, to_pop) = self.difficulty.balloon_counts(self.current_level)?;
        self.reset_level_counters(for_level, to_pop);
        log::info!(
            "Level {} restarted ({} lives, {} continues)",
            self.current_level,
            self.lives,
            self.continues
        );
        Ok(())
    }

    fn reset_level_counters(&mut self, for_level: u32, to_pop: u32) {
        self.num_balloons_for_level = for_level;
        self.num_balloons_to_pop = to_pop;
        self.num_balloons_tapped = 0;
        self.balloons_launched = 0;
        self.balloons_escaped = 0;
        self.live_balloons.clear();
    }

    /// True once enough balloons were popped this level
    pub fn has_player_won(&self) -> bool {
        self.num_balloons_tapped >= self.num_balloons_to_pop
    }

    /// True if the difficulty table has a level after the current one
    pub fn has_next_level(&self) -> bool {
        self.difficulty.contains(self.current_level + 1)
    }

    /// Chance of a launch on a single roll
    pub fn launch_chance_per_roll(&self) -> f64 {
        self.balloon_launch_threshold as f64 / BALLOON_LAUNCH_ROLL_RANGE as f64
    }

    /// One launch roll: uniform in [0, 500), launches below the threshold
    pub fn try_spawn_balloon<R: Rng>(&self, rng: &mut R) -> bool {
        let chance = rng.random_range(0..BALLOON_LAUNCH_ROLL_RANGE);
        chance < self.balloon_launch_threshold
    }

    /// Probability of at least one launch over `dt` seconds.
    ///
    /// The per-roll chance is read as a Poisson process sampled at the
    /// reference tick rate, so the launch rate does not depend on frame rate.
    pub fn launch_chance_over(&self, dt: f32) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        let per_roll = self.launch_chance_per_roll().clamp(0.0, 1.0 - f64::EPSILON);
        let rate = -(1.0 - per_roll).ln() * self.reference_tick_rate as f64;
        (1.0 - (-rate * dt as f64).exp()).clamp(0.0, 1.0)
    }

    /// Frame-rate independent launch roll
    pub fn try_spawn_balloon_over<R: Rng>(&self, dt: f32, rng: &mut R) -> bool {
        let p = self.launch_chance_over(dt);
        p > 0.0 && rng.random_bool(p)
    }

    pub fn spawn_budget_remaining(&self) -> u32 {
        self.num_balloons_for_level
            .saturating_sub(self.balloons_launched)
    }

    /// No more balloons will launch this level
    pub fn spawn_budget_exhausted(&self) -> bool {
        self.spawn_budget_remaining() == 0
    }

    /// Count a launch against the budget and start tracking the balloon
    pub fn record_launch(&mut self, id: EntityId) {
        self.balloons_launched += 1;
        self.live_balloons.push(id);
    }

    /// Stop tracking a balloon that has left play
    pub fn release_balloon(&mut self, id: EntityId) -> bool {
        let before = self.live_balloons.len();
        self.live_balloons.retain(|&b| b != id);
        self.live_balloons.len() != before
    }

    /// Score a pop. Call exactly once per popped balloon.
    pub fn record_pop(&mut self) {
        self.current_score = self.current_score.saturating_add(self.pop_points);
        self.num_balloons_tapped = self.num_balloons_tapped.saturating_add(1);
    }

    pub fn record_escape(&mut self) {
        self.balloons_escaped += 1;
    }

    /// Pay for a lost level: a life first, then a continue (refilling lives)
    pub fn charge_level_loss(&mut self) -> LossCharge {
        let charge = if self.lives > 0 {
            self.lives -= 1;
            LossCharge::LifeSpent
        } else if self.continues > 0 {
            self.continues -= 1;
            self.lives = self.starting_lives;
            LossCharge::ContinueSpent
        } else {
            LossCharge::GameOver
        };
        log::info!(
            "Level {} lost: {:?} ({} lives, {} continues left)",
            self.current_level,
            charge,
            self.lives,
            self.continues
        );
        charge
    }

    /// HUD values
    pub fn readout(&self) -> Readout {
        Readout {
            level: self.current_level,
            to_pop: self.num_balloons_to_pop,
            popped: self.num_balloons_tapped,
            score: self.current_score,
            lives: self.lives,
            continues: self.continues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_initial_values() {
        let tracker = ProgressionTracker::default();
        assert_eq!(tracker.lives(), 3);
        assert_eq!(tracker.continues(), 3);
        assert_eq!(tracker.current_score(), 0);
        assert_eq!(tracker.current_level(), 0);
        assert!(tracker.live_balloons().is_empty());
    }

    #[test]
    fn test_prepare_first_level() {
        let mut tracker = ProgressionTracker::default();
        tracker.prepare_level().unwrap();
        assert_eq!(tracker.current_level(), 1);
        assert_eq!(tracker.num_balloons_for_level(), 20);
        assert_eq!(tracker.num_balloons_to_pop(), 10);
        assert_eq!(tracker.num_balloons_tapped(), 0);
        assert!(!tracker.has_player_won());
    }

    #[test]
    fn test_ten_pops_win_level_one() {
        let mut tracker = ProgressionTracker::default();
        tracker.prepare_level().unwrap();
        for i in 0..10 {
            assert!(!tracker.has_player_won(), "won after {i} pops");
            tracker.record_pop();
        }
        assert!(tracker.has_player_won());
        assert_eq!(tracker.current_score(), 50);
        tracker.record_pop();
        assert!(tracker.has_player_won());
    }

    #[test]
    fn test_prepare_level_clears_level_state() {
        let mut tracker = ProgressionTracker::default();
        tracker.prepare_level().unwrap();
        tracker.record_launch(EntityId(1));
        tracker.record_launch(EntityId(2));
        tracker.record_pop();
        tracker.record_escape();

        tracker.prepare_level().unwrap();
        assert_eq!(tracker.current_level(), 2);
        assert_eq!(tracker.num_balloons_for_level(), 25);
        assert_eq!(tracker.num_balloons_to_pop(), 15);
        assert_eq!(tracker.num_balloons_tapped(), 0);
        assert_eq!(tracker.balloons_launched(), 0);
        assert_eq!(tracker.balloons_escaped(), 0);
        assert!(tracker.live_balloons().is_empty());
        // Score carries across levels
        assert_eq!(tracker.current_score(), 5);
    }

    #[test]
    fn test_restart_keeps_level() {
        let mut tracker = ProgressionTracker::default();
        tracker.prepare_level().unwrap();
        tracker.prepare_level().unwrap();
        tracker.record_pop();
        tracker.record_launch(EntityId(7));

        tracker.restart_level().unwrap();
        assert_eq!(tracker.current_level(), 2);
        assert_eq!(tracker.num_balloons_for_level(), 25);
        assert_eq!(tracker.num_balloons_tapped(), 0);
        assert!(tracker.live_balloons().is_empty());
    }

    #[test]
    fn test_restart_before_any_level_is_unknown() {
        let mut tracker = ProgressionTracker::default();
        assert!(matches!(
            tracker.restart_level(),
            Err(GameError::UnknownLevel { level: 0, .. })
        ));
    }

    #[test]
    fn test_prepare_past_table_reports_and_changes_nothing() {
        let mut tracker = ProgressionTracker::default();
        for _ in 0..10 {
            tracker.prepare_level().unwrap();
        }
        assert!(!tracker.has_next_level());
        tracker.record_pop();

        let err = tracker.prepare_level().unwrap_err();
        assert!(matches!(err, GameError::UnknownLevel { level: 11, max_level: 10 }));
        assert_eq!(tracker.current_level(), 10);
        assert_eq!(tracker.num_balloons_for_level(), 310);
        assert_eq!(tracker.num_balloons_tapped(), 1);
    }

    #[test]
    fn test_score_saturates_at_max() {
        let settings = Settings {
            pop_points: u64::MAX,
            ..Default::default()
        };
        let mut tracker = ProgressionTracker::from_settings(&settings);
        tracker.prepare_level().unwrap();
        tracker.record_pop();
        tracker.record_pop();
        assert_eq!(tracker.current_score(), u64::MAX);
        assert_eq!(tracker.num_balloons_tapped(), 2);
    }

    #[test]
    fn test_spawn_budget() {
        let mut tracker = ProgressionTracker::default();
        tracker.prepare_level().unwrap();
        assert_eq!(tracker.spawn_budget_remaining(), 20);
        for id in 0..20 {
            assert!(!tracker.spawn_budget_exhausted());
            tracker.record_launch(EntityId(id));
        }
        assert!(tracker.spawn_budget_exhausted());
        assert_eq!(tracker.live_balloons().len(), 20);

        assert!(tracker.release_balloon(EntityId(3)));
        assert!(!tracker.release_balloon(EntityId(3)));
        assert_eq!(tracker.live_balloons().len(), 19);
    }

    #[test]
    fn test_loss_charges_lives_then_continues() {
        let mut tracker = ProgressionTracker::default();
        assert_eq!(tracker.charge_level_loss(), LossCharge::LifeSpent);
        assert_eq!(tracker.charge_level_loss(), LossCharge::LifeSpent);
        assert_eq!(tracker.charge_level_loss(), LossCharge::LifeSpent);
        assert_eq!(tracker.lives(), 0);

        assert_eq!(tracker.charge_level_loss(), LossCharge::ContinueSpent);
        assert_eq!(tracker.lives(), 3);
        assert_eq!(tracker.continues(), 2);

        let mut tracker = ProgressionTracker::default();
        let mut charges = Vec::new();
        loop {
            let charge = tracker.charge_level_loss();
            charges.push(charge);
            if !charge.can_retry() {
                break;
            }
        }
        // 3 lives, then 3 continues each refilling 3 lives
        assert_eq!(charges.len(), 3 + 3 * 4 + 1);
        assert_eq!(tracker.charge_level_loss(), LossCharge::GameOver);
    }

    #[test]
    fn test_spawn_roll_rate() {
        let tracker = ProgressionTracker::default();
        let mut rng = Pcg32::seed_from_u64(42);
        let rolls = 100_000;
        let hits = (0..rolls).filter(|_| tracker.try_spawn_balloon(&mut rng)).count();
        // p = 0.01, sigma ~= 31.5 over 100k rolls
        assert!((850..=1150).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn test_launch_chance_over_matches_reference_tick() {
        let tracker = ProgressionTracker::default();
        let one_tick = tracker.launch_chance_over(1.0 / 60.0);
        assert!((one_tick - 0.01).abs() < 1e-8);
        assert_eq!(tracker.launch_chance_over(0.0), 0.0);
        assert_eq!(tracker.launch_chance_over(-1.0), 0.0);
        let long = tracker.launch_chance_over(1000.0);
        assert!(long > 0.999 && long <= 1.0);
    }

    #[test]
    fn test_readout_mirrors_counters() {
        let mut tracker = ProgressionTracker::default();
        tracker.prepare_level().unwrap();
        tracker.record_pop();
        let readout = tracker.readout();
        assert_eq!(readout.level, 1);
        assert_eq!(readout.to_pop, 10);
        assert_eq!(readout.popped, 1);
        assert_eq!(readout.score, 5);
        assert_eq!(readout.lives, 3);
        assert_eq!(readout.continues, 3);
    }
}
