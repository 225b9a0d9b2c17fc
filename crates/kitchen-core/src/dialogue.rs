//! Timed speech lines for the transport agent.
//!
//! Lines are spoken in order, one at a time, and only while the agent is
//! standing still near its idle or pickup point during a standard session.
//! The scheduler is a small state machine stepped once per tick, like the
//! agent itself; a timed wait consumes whole steps and never carries
//! leftover time.

use crate::clock::GameMode;
use crate::event::{Event, EventBus};
use crate::fixed::{Seconds, secs};
use crate::rng::SimRng;
use crate::transport::{TransportAgent, WaypointKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub lines: Vec<String>,
    /// Wait before the very first line.
    #[serde(with = "crate::fixed::serde_seconds")]
    pub first_line_delay: Seconds,
    /// Extra wait after the agent comes back from the exit.
    #[serde(with = "crate::fixed::serde_seconds")]
    pub after_exit_pause: Seconds,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub visible_min: Seconds,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub visible_max: Seconds,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub silence_min: Seconds,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub silence_max: Seconds,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            first_line_delay: secs(20),
            after_exit_pause: secs(10),
            visible_min: secs(7),
            visible_max: secs(10),
            silence_min: secs(30),
            silence_max: secs(40),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    /// Checking each step whether the agent may speak.
    Watching,
    AfterExitPause,
    FirstLineDelay,
    /// Showing line `n`.
    Speaking(usize),
    Silence,
    /// All lines spoken. Never leaves this phase.
    Finished,
}

#[derive(Debug, Clone)]
pub struct DialogueScheduler {
    config: DialogueConfig,
    phase: DialoguePhase,
    timer: Seconds,
    next_line: usize,
    first_delay_done: bool,
    back_from_exit: bool,
}

impl DialogueScheduler {
    pub fn new(config: DialogueConfig) -> Self {
        Self {
            config,
            phase: DialoguePhase::Watching,
            timer: Seconds::ZERO,
            next_line: 0,
            first_delay_done: false,
            back_from_exit: false,
        }
    }

    pub fn phase(&self) -> DialoguePhase {
        self.phase
    }

    /// The line currently on screen.
    pub fn visible_line(&self) -> Option<&str> {
        match self.phase {
            DialoguePhase::Speaking(n) => self.config.lines.get(n).map(String::as_str),
            _ => None,
        }
    }

    pub fn step(
        &mut self,
        dt: Seconds,
        mode: GameMode,
        agent: &mut TransportAgent,
        rng: &mut SimRng,
        events: &mut EventBus,
    ) {
        if agent.take_returned_from_exit() {
            self.back_from_exit = true;
        }

        match self.phase {
            DialoguePhase::Finished => {}
            DialoguePhase::Watching => {
                if mode != GameMode::Standard || agent.is_moving() {
                    return;
                }
                if !matches!(
                    agent.nearest_waypoint(),
                    Some(WaypointKind::Idle | WaypointKind::Pickup)
                ) {
                    return;
                }
                if std::mem::take(&mut self.back_from_exit) {
                    self.wait(DialoguePhase::AfterExitPause, self.config.after_exit_pause);
                } else {
                    self.after_pauses(rng, events);
                }
            }
            DialoguePhase::AfterExitPause => {
                if self.count_down(dt) {
                    self.after_pauses(rng, events);
                }
            }
            DialoguePhase::FirstLineDelay => {
                if self.count_down(dt) {
                    self.first_delay_done = true;
                    self.speak_next(rng, events);
                }
            }
            DialoguePhase::Speaking(line) => {
                if self.count_down(dt) {
                    events.emit(Event::DialogueHidden { line });
                    let silence = rng.range(self.config.silence_min, self.config.silence_max);
                    self.wait(DialoguePhase::Silence, silence);
                }
            }
            DialoguePhase::Silence => {
                if self.count_down(dt) {
                    self.phase = DialoguePhase::Watching;
                }
            }
        }
    }

    fn after_pauses(&mut self, rng: &mut SimRng, events: &mut EventBus) {
        if self.first_delay_done {
            self.speak_next(rng, events);
        } else {
            self.wait(DialoguePhase::FirstLineDelay, self.config.first_line_delay);
        }
    }

    fn speak_next(&mut self, rng: &mut SimRng, events: &mut EventBus) {
        let line = self.next_line;
        if line >= self.config.lines.len() {
            self.phase = DialoguePhase::Finished;
            return;
        }
        self.next_line += 1;
        tracing::debug!(line, text = %self.config.lines[line], "agent speaks");
        events.emit(Event::DialogueShown { line });
        let visible = rng.range(self.config.visible_min, self.config.visible_max);
        self.wait(DialoguePhase::Speaking(line), visible);
    }

    fn wait(&mut self, phase: DialoguePhase, duration: Seconds) {
        self.phase = phase;
        self.timer = duration;
    }

    fn count_down(&mut self, dt: Seconds) -> bool {
        self.timer -= dt;
        self.timer <= Seconds::ZERO
    }
}
