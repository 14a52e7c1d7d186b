//! Global screen flow
//!
//! ```text
//! SplashA       -> SplashB                  (auto)
//! SplashB       -> Title                    (auto)
//! Title         -> Options | Credits | PlayLevel
//! Options       -> Title
//! Credits       -> Title
//! PlayLevel     -> PlayLevelWin | PlayLevelLose | Title
//! PlayLevelWin  -> PlayLevel | GameWin
//! PlayLevelLose -> PlayLevel | GameLose
//! GameWin       -> Credits
//! GameLose      -> Title
//! ```
//!
//! There is no terminal screen. Entering any screen presents it.

use serde::{Deserialize, Serialize};

use super::command::{CommandQueue, RenderCommand};
use super::sequence::Sequence;
use crate::fsm::{State, StateMachine};
use crate::settings::Settings;

/// Top-level screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    SplashA,
    SplashB,
    Title,
    Options,
    Credits,
    PlayLevel,
    PlayLevelWin,
    PlayLevelLose,
    GameWin,
    GameLose,
}

impl Screen {
    pub const ALL: [Screen; 10] = [
        Screen::SplashA,
        Screen::SplashB,
        Screen::Title,
        Screen::Options,
        Screen::Credits,
        Screen::PlayLevel,
        Screen::PlayLevelWin,
        Screen::PlayLevelLose,
        Screen::GameWin,
        Screen::GameLose,
    ];

    /// Where tap-to-continue leads on screens with a single way out
    pub fn confirm_target(&self) -> Option<Screen> {
        match self {
            Screen::SplashA => Some(Screen::SplashB),
            Screen::SplashB | Screen::Credits | Screen::GameLose => Some(Screen::Title),
            Screen::GameWin => Some(Screen::Credits),
            _ => None,
        }
    }
}

impl State for Screen {
    fn name(&self) -> &'static str {
        match self {
            Screen::SplashA => "SplashA",
            Screen::SplashB => "SplashB",
            Screen::Title => "Title",
            Screen::Options => "Options",
            Screen::Credits => "Credits",
            Screen::PlayLevel => "PlayLevel",
            Screen::PlayLevelWin => "PlayLevelWin",
            Screen::PlayLevelLose => "PlayLevelLose",
            Screen::GameWin => "GameWin",
            Screen::GameLose => "GameLose",
        }
    }

    fn valid_next_states(&self) -> &'static [Self] {
        match self {
            Screen::SplashA => &[Screen::SplashB],
            Screen::SplashB => &[Screen::Title],
            Screen::Title => &[Screen::Options, Screen::Credits, Screen::PlayLevel],
            Screen::Options => &[Screen::Title],
            Screen::Credits => &[Screen::Title],
            Screen::PlayLevel => &[Screen::PlayLevelWin, Screen::PlayLevelLose, Screen::Title],
            Screen::PlayLevelWin => &[Screen::PlayLevel, Screen::GameWin],
            Screen::PlayLevelLose => &[Screen::PlayLevel, Screen::GameLose],
            Screen::GameWin => &[Screen::Credits],
            Screen::GameLose => &[Screen::Title],
        }
    }
}

/// The screen machine plus the splash timers
#[derive(Debug, Clone)]
pub struct GameFlow {
    machine: StateMachine<Screen>,
    splash_a_duration: f32,
    splash_b_duration: f32,
    /// Pending automatic advance out of a splash screen
    timer: Option<Sequence<()>>,
}

impl GameFlow {
    pub fn new(splash_a_duration: f32, splash_b_duration: f32) -> Self {
        Self {
            machine: StateMachine::new("game flow", Screen::SplashA),
            splash_a_duration,
            splash_b_duration,
            timer: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.splash_a_duration, settings.splash_b_duration)
    }

    /// Run the entry action of the initial screen
    pub fn start(&mut self, out: &mut CommandQueue) {
        self.on_enter(self.machine.current(), out);
    }

    pub fn current(&self) -> Screen {
        self.machine.current()
    }

    pub fn previous(&self) -> Option<Screen> {
        self.machine.previous()
    }

    /// Seconds on the current screen
    pub fn elapsed(&self) -> f32 {
        self.machine.elapsed()
    }

    pub fn machine(&self) -> &StateMachine<Screen> {
        &self.machine
    }

    pub fn can_enter(&self, screen: Screen) -> bool {
        self.machine.can_enter(screen)
    }

    /// Move to `screen` if the graph allows it and present it
    pub fn enter(&mut self, screen: Screen, out: &mut CommandQueue) -> bool {
        if !self.machine.enter(screen) {
            return false;
        }
        self.on_enter(screen, out);
        true
    }

    fn on_enter(&mut self, screen: Screen, out: &mut CommandQueue) {
        log::info!("Screen: {}", screen.name());
        out.push(RenderCommand::PresentScreen(screen));
        self.timer = match screen {
            Screen::SplashA => Some(Sequence::delay(self.splash_a_duration)),
            Screen::SplashB => Some(Sequence::delay(self.splash_b_duration)),
            _ => None,
        };
    }

    /// Advance the clock. Returns the screen entered automatically, if any.
    pub fn update(&mut self, dt: f32, out: &mut CommandQueue) -> Option<Screen> {
        self.machine.update(dt);

        let done = match self.timer.as_mut() {
            Some(timer) => timer.update(dt, |_| {}),
            None => false,
        };
        if !done {
            return None;
        }

        self.timer = None;
        let next = self.machine.current().confirm_target()?;
        self.enter(next, out).then_some(next)
    }
}
