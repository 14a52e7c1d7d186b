//! Generic finite state machine
//!
//! Every machine in the game (screens, level flow, balloon lifecycle and the
//! balloon parts) is a [`StateMachine`] over its own closed enum. The set of
//! valid edges is plain data on the state type, so it can be inspected and
//! tested without running any behavior. Entry actions live with the owner of
//! the machine: `enter` reports whether the transition happened and the owner
//! runs the matching action.

use std::fmt::Debug;

use crate::error::GameError;

/// Maximum number of transitions kept in a machine's history
pub const HISTORY_LIMIT: usize = 32;

/// A state of one machine.
///
/// Implementations must name every state and list its valid successors.
/// There are no default bodies: a state type that forgets its edge table
/// does not compile.
///
/// # Example
///
/// ```rust
/// use balloon_popper::fsm::{State, StateMachine};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Debug)]
/// enum Door {
///     Closed,
///     Open,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Closed => "Closed",
///             Self::Open => "Open",
///         }
///     }
///
///     fn valid_next_states(&self) -> &'static [Self] {
///         match self {
///             Self::Closed => &[Self::Open],
///             Self::Open => &[Self::Closed],
///         }
///     }
/// }
///
/// let mut door = StateMachine::new("door", Door::Closed);
/// assert!(door.enter(Door::Open));
/// assert!(!door.enter(Door::Open));
/// assert_eq!(door.current(), Door::Open);
/// ```
pub trait State: Copy + PartialEq + Debug + 'static {
    /// Display name for logs and errors
    fn name(&self) -> &'static str;

    /// States reachable from this one in a single transition
    fn valid_next_states(&self) -> &'static [Self];

    /// True if `next` is in this state's edge set
    fn is_valid_next(&self, next: &Self) -> bool {
        self.valid_next_states().contains(next)
    }

    /// Terminal states have no outgoing edges
    fn is_final(&self) -> bool {
        self.valid_next_states().is_empty()
    }
}

/// Record of a single accepted transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTransition<S: State> {
    pub from: S,
    pub to: S,
    /// Seconds spent in `from` before leaving it
    pub time_in_from: f32,
}

/// A machine holding the current state of one closed state set.
#[derive(Debug, Clone)]
pub struct StateMachine<S: State> {
    label: &'static str,
    current: S,
    previous: Option<S>,
    /// Seconds spent in the current state
    elapsed: f32,
    history: Vec<StateTransition<S>>,
}

impl<S: State> StateMachine<S> {
    /// Create a machine already in `initial`. The owner runs the entry action.
    pub fn new(label: &'static str, initial: S) -> Self {
        Self {
            label,
            current: initial,
            previous: None,
            elapsed: 0.0,
            history: Vec::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn previous(&self) -> Option<S> {
        self.previous
    }

    /// Seconds spent in the current state
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_in(&self, state: S) -> bool {
        self.current == state
    }

    pub fn is_final(&self) -> bool {
        self.current.is_final()
    }

    pub fn can_enter(&self, next: S) -> bool {
        self.current.is_valid_next(&next)
    }

    /// Attempt a transition, reporting why it was refused.
    pub fn try_enter(&mut self, next: S) -> Result<(), GameError> {
        if !self.can_enter(next) {
            return Err(GameError::InvalidTransition {
                machine: self.label,
                from: self.current.name().to_string(),
                to: next.name().to_string(),
            });
        }

        let transition = StateTransition {
            from: self.current,
            to: next,
            time_in_from: self.elapsed,
        };
        if self.history.len() == HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(transition);

        self.previous = Some(self.current);
        self.current = next;
        self.elapsed = 0.0;
        Ok(())
    }

    /// Attempt a transition. Invalid targets are rejected without changing
    /// anything; the return value says whether the machine moved.
    pub fn enter(&mut self, next: S) -> bool {
        match self.try_enter(next) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("{}", e);
                false
            }
        }
    }

    /// Advance the time-in-state clock
    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    /// Most recent transitions, oldest first
    pub fn history(&self) -> &[StateTransition<S>] {
        &self.history
    }

    /// States traversed according to the retained history
    pub fn path(&self) -> Vec<S> {
        let mut path = Vec::with_capacity(self.history.len() + 1);
        match self.history.first() {
            Some(first) => path.push(first.from),
            None => path.push(self.current),
        }
        path.extend(self.history.iter().map(|t| t.to));
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    enum TestState {
        Initial,
        Processing,
        Complete,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            match self {
                Self::Initial => "Initial",
                Self::Processing => "Processing",
                Self::Complete => "Complete",
            }
        }

        fn valid_next_states(&self) -> &'static [Self] {
            match self {
                Self::Initial => &[Self::Processing],
                Self::Processing => &[Self::Complete, Self::Initial],
                Self::Complete => &[],
            }
        }
    }

    #[test]
    fn test_enter_follows_edge_table() {
        let mut fsm = StateMachine::new("test", TestState::Initial);
        assert!(fsm.enter(TestState::Processing));
        assert_eq!(fsm.current(), TestState::Processing);
        assert_eq!(fsm.previous(), Some(TestState::Initial));
        assert!(fsm.enter(TestState::Complete));
        assert!(fsm.is_final());
    }

    #[test]
    fn test_rejected_transition_leaves_state_untouched() {
        let mut fsm = StateMachine::new("test", TestState::Initial);
        fsm.update(0.5);
        assert!(!fsm.enter(TestState::Complete));
        assert_eq!(fsm.current(), TestState::Initial);
        assert_eq!(fsm.previous(), None);
        assert_eq!(fsm.elapsed(), 0.5);
        assert!(fsm.history().is_empty());
    }

    #[test]
    fn test_try_enter_reports_invalid_transition() {
        let mut fsm = StateMachine::new("test", TestState::Initial);
        let err = fsm.try_enter(TestState::Complete).unwrap_err();
        match err {
            GameError::InvalidTransition { machine, from, to } => {
                assert_eq!(machine, "test");
                assert_eq!(from, "Initial");
                assert_eq!(to, "Complete");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_transition_needs_an_edge() {
        let mut fsm = StateMachine::new("test", TestState::Initial);
        assert!(!fsm.enter(TestState::Initial));
    }

    #[test]
    fn test_final_state_has_no_exit() {
        let mut fsm = StateMachine::new("test", TestState::Initial);
        fsm.enter(TestState::Processing);
        fsm.enter(TestState::Complete);
        for next in [TestState::Initial, TestState::Processing, TestState::Complete] {
            assert!(!fsm.enter(next));
        }
        assert_eq!(fsm.current(), TestState::Complete);
    }

    #[test]
    fn test_elapsed_resets_on_transition() {
        let mut fsm = StateMachine::new("test", TestState::Initial);
        fsm.update(1.25);
        fsm.update(-3.0);
        assert_eq!(fsm.elapsed(), 1.25);
        fsm.enter(TestState::Processing);
        assert_eq!(fsm.elapsed(), 0.0);
        assert_eq!(fsm.history()[0].time_in_from, 1.25);
    }

    #[test]
    fn test_path_and_history_limit() {
        let mut fsm = StateMachine::new("test", TestState::Initial);
        assert_eq!(fsm.path(), vec![TestState::Initial]);

        for _ in 0..HISTORY_LIMIT {
            fsm.enter(TestState::Processing);
            fsm.enter(TestState::Initial);
        }
        assert_eq!(fsm.history().len(), HISTORY_LIMIT);
        let path = fsm.path();
        assert_eq!(path.len(), HISTORY_LIMIT + 1);
        assert_eq!(*path.last().unwrap(), TestState::Initial);
    }
}
