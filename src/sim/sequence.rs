//! Timed cue sequences
//!
//! Splash delays, the Ready/Go intro and the end-of-level announcement all
//! run on the game clock but are not gameplay state. A [`Sequence`] is an
//! ordered list of cues, each shown for a fixed duration. It runs to
//! completion and cannot be cancelled; the owner drops it instead.

/// One cue and how long it lasts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step<T> {
    pub cue: T,
    pub duration: f32,
}

impl<T> Step<T> {
    pub fn new(cue: T, duration: f32) -> Self {
        Self {
            cue,
            duration: duration.max(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sequence<T> {
    steps: Vec<Step<T>>,
    index: usize,
    /// Time spent in the current step
    elapsed: f32,
}

impl Sequence<()> {
    /// A single silent wait
    pub fn delay(duration: f32) -> Self {
        Self::new(vec![Step::new((), duration)])
    }
}

impl<T: Copy> Sequence<T> {
    pub fn new(steps: Vec<Step<T>>) -> Self {
        Self {
            steps,
            index: 0,
            elapsed: 0.0,
        }
    }

    /// Cue currently showing, `None` once complete
    pub fn current(&self) -> Option<T> {
        self.steps.get(self.index).map(|s| s.cue)
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.steps.len()
    }

    /// Total length of all steps
    pub fn duration(&self) -> f32 {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// Advance by `dt`. `on_cue` is called for every step that starts during
    /// this update (the first step is current from construction). Returns
    /// true once the last step has finished.
    pub fn update(&mut self, dt: f32, mut on_cue: impl FnMut(T)) -> bool {
        if self.is_complete() {
            return true;
        }

        self.elapsed += dt.max(0.0);
        while let Some(step) = self.steps.get(self.index) {
            if self.elapsed < step.duration {
                break;
            }
            // Carry leftover time into the next step
            self.elapsed -= step.duration;
            self.index += 1;
            if let Some(next) = self.steps.get(self.index) {
                on_cue(next.cue);
            }
        }
        self.is_complete()
    }
}
