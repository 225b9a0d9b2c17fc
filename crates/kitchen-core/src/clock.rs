//! Session progression: waiting → countdown → playing → over.
//!
//! The clock is the authority other components consult for "should I be
//! active". Every state transition emits exactly one
//! [`Event::StateChanged`]; while the countdown runs, each tick additionally
//! emits one so countdown displays can refresh.
//!
//! Time left over after an automatic transition carries into the next state
//! within the same tick, so a single very large delta resolves fully.

use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Seconds, clamp_unit, secs};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    WaitingToStart,
    CountdownToStart,
    Playing,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    Tutorial,
    Standard,
}

/// Whether the transport agent should be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Inactive,
}

/// Durations for each phase, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    #[serde(with = "crate::fixed::serde_seconds")]
    pub waiting_to_start: Seconds,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub countdown: Seconds,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub tutorial_duration: Seconds,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub standard_duration: Seconds,
    /// Delay between a tutorial game over and the request to leave for the
    /// feedback screen.
    #[serde(with = "crate::fixed::serde_seconds")]
    pub feedback_exit_delay: Seconds,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            waiting_to_start: secs(1),
            countdown: secs(3),
            tutorial_duration: secs(120),
            standard_duration: secs(600),
            feedback_exit_delay: secs(5),
        }
    }
}

/// What a single [`GameClock::tick`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockTick {
    /// State-changed notifications emitted during the tick.
    pub notifications: u32,
    /// The delayed feedback exit fired during the tick.
    pub exit_requested: bool,
}

#[derive(Debug, Clone)]
pub struct GameClock {
    config: ClockConfig,
    state: GameState,
    mode: GameMode,
    npc_flow: bool,
    waiting_timer: Seconds,
    countdown_timer: Seconds,
    playing_timer: Seconds,
    playing_max: Seconds,
    feedback_exit: Option<Seconds>,
}

impl GameClock {
    /// A clock waiting to start in tutorial mode.
    pub fn new(config: ClockConfig) -> Self {
        Self {
            waiting_timer: config.waiting_to_start,
            countdown_timer: config.countdown,
            config,
            state: GameState::WaitingToStart,
            mode: GameMode::Tutorial,
            npc_flow: false,
            playing_timer: Seconds::ZERO,
            playing_max: Seconds::ZERO,
            feedback_exit: None,
        }
    }

    /// Reset every timer, return to `WaitingToStart` under `mode`, and notify.
    /// `npc_flow` is the caller's flow flag, kept for the game-over decision.
    pub fn start_session(&mut self, mode: GameMode, npc_flow: bool, events: &mut EventBus) {
        self.mode = mode;
        self.npc_flow = npc_flow;
        self.state = GameState::WaitingToStart;
        self.waiting_timer = self.config.waiting_to_start;
        self.countdown_timer = self.config.countdown;
        self.playing_timer = Seconds::ZERO;
        self.playing_max = Seconds::ZERO;
        self.feedback_exit = None;
        tracing::info!(?mode, npc_flow, "session started");
        self.notify(events);
    }

    /// Change the mode only. No state reset and no notification.
    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
    }

    pub fn tick(&mut self, dt: Seconds, events: &mut EventBus) -> ClockTick {
        let mut out = ClockTick::default();
        let mut remaining = dt;

        loop {
            match self.state {
                GameState::WaitingToStart => {
                    if remaining < self.waiting_timer {
                        self.waiting_timer -= remaining;
                        break;
                    }
                    remaining -= self.waiting_timer;
                    self.waiting_timer = Seconds::ZERO;
                    self.change_state(GameState::CountdownToStart, events, &mut out);
                    if remaining <= Seconds::ZERO {
                        break;
                    }
                }
                GameState::CountdownToStart => {
                    self.countdown_timer -= remaining;
                    self.notify(events);
                    out.notifications += 1;
                    if self.countdown_timer > Seconds::ZERO {
                        break;
                    }
                    remaining = -self.countdown_timer;
                    self.countdown_timer = Seconds::ZERO;
                    self.begin_playing();
                    self.change_state(GameState::Playing, events, &mut out);
                    if remaining <= Seconds::ZERO {
                        break;
                    }
                }
                GameState::Playing => {
                    if remaining < self.playing_timer {
                        self.playing_timer -= remaining;
                        break;
                    }
                    remaining -= self.playing_timer;
                    self.playing_timer = Seconds::ZERO;
                    out.notifications += self.enter_game_over(events);
                    // Only the tutorial back-edge lands in Playing again; a
                    // zero-length session must not spin.
                    if self.state != GameState::Playing
                        || remaining <= Seconds::ZERO
                        || self.playing_timer <= Seconds::ZERO
                    {
                        break;
                    }
                }
                GameState::GameOver => {
                    if let Some(left) = self.feedback_exit.as_mut() {
                        *left -= remaining;
                        if *left <= Seconds::ZERO {
                            self.feedback_exit = None;
                            out.exit_requested = true;
                            tracing::info!("requesting feedback screen");
                            events.emit(Event::FeedbackExitRequested);
                        }
                    }
                    break;
                }
            }
        }

        out
    }

    /// Force the game-over transition. Idempotent: returns false (and emits
    /// nothing) if the clock is already over.
    pub fn end_session(&mut self, events: &mut EventBus) -> bool {
        self.enter_game_over(events) > 0
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn npc_flow(&self) -> bool {
        self.npc_flow
    }

    pub fn is_playing(&self) -> bool {
        self.state == GameState::Playing
    }

    pub fn is_game_over(&self) -> bool {
        self.state == GameState::GameOver
    }

    pub fn is_countdown_active(&self) -> bool {
        self.state == GameState::CountdownToStart
    }

    pub fn countdown_remaining(&self) -> Seconds {
        self.countdown_timer
    }

    pub fn playing_remaining(&self) -> Seconds {
        self.playing_timer
    }

    /// Fraction of the playing phase used up, in `[0, 1]`. Zero before the
    /// first playing phase starts.
    pub fn playing_elapsed_normalized(&self) -> Fixed64 {
        match self.playing_timer.checked_div(self.playing_max) {
            Some(left) if self.playing_max > Seconds::ZERO => clamp_unit(Fixed64::ONE - left),
            _ => Fixed64::ZERO,
        }
    }

    /// Transport agents run only in standard mode and before game over.
    pub fn activity(&self) -> Activity {
        if self.mode == GameMode::Standard && self.state != GameState::GameOver {
            Activity::Active
        } else {
            Activity::Inactive
        }
    }

    /// Whether outcomes should reach the persisted result ledger.
    pub fn is_recording(&self) -> bool {
        self.mode == GameMode::Standard && self.state == GameState::Playing
    }

    /// Pending delay before the feedback exit fires, if one is scheduled.
    pub fn feedback_exit_pending(&self) -> Option<Seconds> {
        self.feedback_exit
    }

    fn begin_playing(&mut self) {
        self.playing_max = match self.mode {
            GameMode::Tutorial => self.config.tutorial_duration,
            GameMode::Standard => self.config.standard_duration,
        };
        self.playing_timer = self.playing_max;
    }

    /// Returns the number of notifications emitted.
    fn enter_game_over(&mut self, events: &mut EventBus) -> u32 {
        if self.state == GameState::GameOver {
            return 0;
        }
        let mut out = ClockTick::default();
        self.change_state(GameState::GameOver, events, &mut out);
        tracing::info!(mode = ?self.mode, npc_flow = self.npc_flow, "game over");

        match (self.mode, self.npc_flow) {
            (GameMode::Tutorial, false) => {
                self.feedback_exit = Some(self.config.feedback_exit_delay);
            }
            (GameMode::Tutorial, true) => {
                // Looping tutorial: restart the playing phase in place.
                self.begin_playing();
                self.change_state(GameState::Playing, events, &mut out);
            }
            (GameMode::Standard, _) => {}
        }
        out.notifications
    }

    fn change_state(&mut self, state: GameState, events: &mut EventBus, out: &mut ClockTick) {
        self.state = state;
        self.notify(events);
        out.notifications += 1;
    }

    fn notify(&self, events: &mut EventBus) {
        events.emit(Event::StateChanged {
            state: self.state,
            mode: self.mode,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::test_utils::fixed;

    fn started(mode: GameMode, npc_flow: bool) -> (GameClock, EventBus) {
        let mut clock = GameClock::new(ClockConfig::default());
        let mut events = EventBus::default();
        clock.start_session(mode, npc_flow, &mut events);
        events.clear_history();
        (clock, events)
    }

    fn states(events: &EventBus) -> Vec<GameState> {
        events
            .history(EventKind::StateChanged)
            .map(|h| {
                h.iter()
                    .filter_map(|e| match e {
                        Event::StateChanged { state, .. } => Some(*state),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn new_clock_waits_in_tutorial() {
        let clock = GameClock::new(ClockConfig::default());
        assert_eq!(clock.state(), GameState::WaitingToStart);
        assert_eq!(clock.mode(), GameMode::Tutorial);
        assert_eq!(clock.playing_elapsed_normalized(), Fixed64::ZERO);
    }

    #[test]
    fn start_session_notifies_once() {
        let mut clock = GameClock::new(ClockConfig::default());
        let mut events = EventBus::default();
        clock.start_session(GameMode::Standard, true, &mut events);
        assert_eq!(states(&events), vec![GameState::WaitingToStart]);
        assert_eq!(clock.mode(), GameMode::Standard);
        assert!(clock.npc_flow());
    }

    #[test]
    fn waiting_then_countdown() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(fixed(0.5), &mut events);
        assert_eq!(clock.state(), GameState::WaitingToStart);
        assert!(states(&events).is_empty());

        let out = clock.tick(fixed(0.5), &mut events);
        assert!(clock.is_countdown_active());
        assert_eq!(out.notifications, 1);
        assert_eq!(clock.countdown_remaining(), secs(3));
    }

    #[test]
    fn countdown_notifies_every_tick() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(secs(1), &mut events);
        events.clear_history();

        for _ in 0..4 {
            clock.tick(fixed(0.5), &mut events);
        }
        assert_eq!(
            states(&events),
            vec![GameState::CountdownToStart; 4]
        );
        assert_eq!(clock.countdown_remaining(), secs(1));
    }

    #[test]
    fn countdown_expiry_picks_duration_by_mode() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(secs(1), &mut events);
        clock.tick(secs(3), &mut events);
        assert!(clock.is_playing());
        assert_eq!(clock.playing_remaining(), secs(600));

        let (mut clock, mut events) = started(GameMode::Tutorial, false);
        clock.tick(secs(1), &mut events);
        clock.tick(secs(3), &mut events);
        assert_eq!(clock.playing_remaining(), secs(120));
    }

    #[test]
    fn huge_delta_carries_through_to_game_over() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(secs(10_000), &mut events);
        assert!(clock.is_game_over());
        assert_eq!(
            states(&events),
            vec![
                GameState::CountdownToStart,
                GameState::CountdownToStart,
                GameState::Playing,
                GameState::GameOver,
            ]
        );
    }

    #[test]
    fn elapsed_normalized_tracks_progress() {
        let (mut clock, mut events) = started(GameMode::Tutorial, false);
        clock.tick(secs(4), &mut events);
        assert_eq!(clock.playing_elapsed_normalized(), Fixed64::ZERO);
        clock.tick(secs(30), &mut events);
        assert_eq!(clock.playing_elapsed_normalized(), fixed(0.25));
        clock.tick(secs(90), &mut events);
        assert!(clock.is_game_over());
        assert_eq!(clock.playing_elapsed_normalized(), Fixed64::ONE);
    }

    #[test]
    fn game_over_entry_is_idempotent() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(secs(4), &mut events);
        events.clear_history();

        assert!(clock.end_session(&mut events));
        assert!(!clock.end_session(&mut events));
        assert_eq!(states(&events), vec![GameState::GameOver]);

        // Ticking while over emits nothing more.
        clock.tick(secs(100), &mut events);
        assert_eq!(states(&events), vec![GameState::GameOver]);
    }

    #[test]
    fn standard_game_over_is_terminal() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(secs(604), &mut events);
        assert!(clock.is_game_over());
        let out = clock.tick(secs(100), &mut events);
        assert_eq!(out, ClockTick::default());
        assert!(clock.is_game_over());
        assert_eq!(clock.feedback_exit_pending(), None);
    }

    #[test]
    fn tutorial_game_over_requests_feedback_after_delay() {
        let (mut clock, mut events) = started(GameMode::Tutorial, false);
        clock.tick(secs(124), &mut events);
        assert!(clock.is_game_over());
        assert_eq!(clock.feedback_exit_pending(), Some(secs(5)));

        assert!(!clock.tick(secs(4), &mut events).exit_requested);
        assert!(clock.tick(secs(1), &mut events).exit_requested);
        assert_eq!(events.recorded_count(EventKind::FeedbackExitRequested), 1);

        // Fires once.
        assert!(!clock.tick(secs(10), &mut events).exit_requested);
        assert_eq!(events.total_emitted(EventKind::FeedbackExitRequested), 1);
    }

    #[test]
    fn tutorial_with_npc_flow_loops_back_to_playing() {
        let (mut clock, mut events) = started(GameMode::Tutorial, true);
        clock.tick(secs(4), &mut events);
        events.clear_history();

        clock.tick(secs(120), &mut events);
        assert!(clock.is_playing());
        assert_eq!(clock.playing_remaining(), secs(120));
        assert_eq!(states(&events), vec![GameState::GameOver, GameState::Playing]);
        assert_eq!(clock.feedback_exit_pending(), None);
    }

    #[test]
    fn zero_length_tutorial_loop_terminates() {
        let mut clock = GameClock::new(ClockConfig {
            tutorial_duration: Seconds::ZERO,
            ..ClockConfig::default()
        });
        let mut events = EventBus::default();
        clock.start_session(GameMode::Tutorial, true, &mut events);
        clock.tick(secs(50), &mut events);
        assert!(clock.is_playing());
    }

    #[test]
    fn set_mode_changes_mode_only() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(secs(4), &mut events);
        events.clear_history();

        clock.set_mode(GameMode::Tutorial);
        assert_eq!(clock.mode(), GameMode::Tutorial);
        assert!(clock.is_playing());
        assert_eq!(clock.playing_remaining(), secs(600));
        assert!(states(&events).is_empty());
    }

    #[test]
    fn activity_and_recording() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        assert_eq!(clock.activity(), Activity::Active);
        assert!(!clock.is_recording());
        clock.tick(secs(4), &mut events);
        assert!(clock.is_recording());

        clock.set_mode(GameMode::Tutorial);
        assert_eq!(clock.activity(), Activity::Inactive);
        assert!(!clock.is_recording());

        clock.set_mode(GameMode::Standard);
        clock.end_session(&mut events);
        assert_eq!(clock.activity(), Activity::Inactive);
    }

    #[test]
    fn restart_resets_timers() {
        let (mut clock, mut events) = started(GameMode::Standard, false);
        clock.tick(secs(300), &mut events);
        clock.start_session(GameMode::Tutorial, false, &mut events);
        assert_eq!(clock.state(), GameState::WaitingToStart);
        assert_eq!(clock.countdown_remaining(), secs(3));
        assert_eq!(clock.playing_elapsed_normalized(), Fixed64::ZERO);
    }
}
