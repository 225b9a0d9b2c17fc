//! One kitchen session and the borrowed context its components share.
//!
//! [`Session`] owns every component and is the only thing a frame driver
//! talks to. Components never reach each other through globals: operations
//! that span several of them take a [`SessionContext`] of borrowed
//! references, built fresh for each call.
//!
//! # Tick order
//!
//! 1. clock (emits state changes synchronously)
//! 2. transport agent reacts to the clock signal
//! 3. order book spawn timer
//! 4. transport agent step
//! 5. dialogue
//! 6. results flush on the first game over

use crate::catalog::RecipeCatalog;
use crate::clock::{ClockTick, GameClock, GameMode};
use crate::config::KitchenConfig;
use crate::counter::{DeliveryCounter, SubmitOutcome};
use crate::dialogue::DialogueScheduler;
use crate::event::{DisposeReason, Event, EventBus, EventKind, Listener};
use crate::fixed::Seconds;
use crate::id::{ItemId, SubscriptionId};
use crate::item::{Holder, ItemArena, ItemKind};
use crate::ledger::{LedgerError, ResultLedger};
use crate::order_book::{OrderBook, SpawnReport};
use crate::rng::SimRng;
use crate::transport::TransportAgent;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("the player is already holding an item")]
    HandsFull,
    #[error("the player is not holding anything")]
    NothingHeld,
    #[error("no results path configured")]
    NoResultsPath,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Borrowed view of the session handed to cross-component operations.
pub struct SessionContext<'a> {
    pub catalog: &'a RecipeCatalog,
    pub order_book: &'a mut OrderBook,
    pub clock: &'a GameClock,
    pub agent: Option<&'a mut TransportAgent>,
    pub items: &'a mut ItemArena,
    pub events: &'a mut EventBus,
    pub ledger: &'a mut ResultLedger,
}

/// What one [`Session::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub clock: ClockTick,
    pub spawn: SpawnReport,
    /// Results were written to disk during this tick.
    pub flushed: bool,
}

pub struct Session {
    catalog: RecipeCatalog,
    rng: SimRng,
    order_book: OrderBook,
    clock: GameClock,
    agent: Option<TransportAgent>,
    counter: DeliveryCounter,
    items: ItemArena,
    events: EventBus,
    ledger: ResultLedger,
    dialogue: DialogueScheduler,
    results_path: Option<PathBuf>,
    results_flushed: bool,
}

impl Session {
    pub fn new(catalog: RecipeCatalog, config: KitchenConfig) -> Self {
        let mut events = EventBus::new(config.event_history);
        let agent = config.transport.map(TransportAgent::new);
        if agent.as_ref().is_some_and(|a| !a.is_available()) {
            events.emit(Event::AgentDisabled);
        }

        Self {
            catalog,
            rng: SimRng::new(config.seed),
            order_book: OrderBook::new(config.order_book),
            clock: GameClock::new(config.clock),
            agent,
            counter: DeliveryCounter::new(),
            items: ItemArena::new(),
            events,
            ledger: ResultLedger::new(),
            dialogue: DialogueScheduler::new(config.dialogue),
            results_path: config.results_path,
            results_flushed: false,
        }
    }

    /// Reset the clock to `WaitingToStart` under `mode`. `npc_flow` is the
    /// selection made on the feedback screen.
    pub fn start_session(&mut self, mode: GameMode, npc_flow: bool) {
        self.clock.start_session(mode, npc_flow, &mut self.events);
        self.results_flushed = false;
        self.signal_agent();
    }

    /// Switch mode without resetting the clock.
    pub fn set_mode(&mut self, mode: GameMode) {
        self.clock.set_mode(mode);
        self.signal_agent();
    }

    /// Force game over.
    pub fn end_session(&mut self) {
        if self.clock.end_session(&mut self.events) {
            self.signal_agent();
        }
    }

    pub fn tick(&mut self, dt: Seconds) -> TickReport {
        let clock = self.clock.tick(dt, &mut self.events);
        if clock.notifications > 0 {
            self.signal_agent();
        }

        let spawn = self
            .order_book
            .tick(dt, &self.catalog, &mut self.rng, &mut self.events);
        if self.clock.is_recording() {
            self.ledger.record_spawned(spawn.spawned);
        }

        if let Some(agent) = self.agent.as_mut() {
            agent.step(dt, &mut self.items, &mut self.events);
            self.dialogue
                .step(dt, self.clock.mode(), agent, &mut self.rng, &mut self.events);
        }

        TickReport {
            clock,
            spawn,
            flushed: self.flush_on_game_over(),
        }
    }

    fn signal_agent(&mut self) {
        let activity = self.clock.activity();
        if let Some(agent) = self.agent.as_mut() {
            agent.on_signal(activity);
        }
    }

    fn flush_on_game_over(&mut self) -> bool {
        if !self.clock.is_game_over() || self.results_flushed {
            return false;
        }
        self.results_flushed = true;
        let Some(path) = self.results_path.as_deref() else {
            return false;
        };
        match self.ledger.flush(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "failed to save results");
                false
            }
        }
    }

    // -- Player actions --

    /// Put a new item in the player's hands.
    pub fn give_player(&mut self, kind: ItemKind) -> Result<ItemId, SessionError> {
        if self.player_item().is_some() {
            return Err(SessionError::HandsFull);
        }
        Ok(self.items.spawn(kind, Holder::Player))
    }

    pub fn player_item(&self) -> Option<ItemId> {
        self.items.held_by(Holder::Player).next()
    }

    /// Hand whatever the player holds to the delivery counter.
    pub fn submit(&mut self) -> SubmitOutcome {
        let item = self.player_item();
        let mut ctx = SessionContext {
            catalog: &self.catalog,
            order_book: &mut self.order_book,
            clock: &self.clock,
            agent: self.agent.as_mut(),
            items: &mut self.items,
            events: &mut self.events,
            ledger: &mut self.ledger,
        };
        self.counter.submit(item, &mut ctx)
    }

    /// Throw away whatever the player holds.
    pub fn trash(&mut self) -> Result<ItemId, SessionError> {
        let id = self.player_item().ok_or(SessionError::NothingHeld)?;
        self.items.dispose(id);
        if self.clock.is_recording() {
            self.ledger.record_trashed();
        }
        self.events.emit(Event::ItemDisposed {
            item: id,
            reason: DisposeReason::Trashed,
        });
        Ok(id)
    }

    // -- Results --

    pub fn flush_results(&self) -> Result<&Path, SessionError> {
        let path = self.results_path.as_deref().ok_or(SessionError::NoResultsPath)?;
        self.ledger.flush(path)?;
        Ok(path)
    }

    pub fn reset_results(&mut self) {
        self.ledger.reset();
    }

    // -- Subscriptions --

    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) -> SubscriptionId {
        self.events.subscribe(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Drop every listener. Call when the owning scene goes away.
    pub fn teardown(&mut self) {
        self.events.unsubscribe_all();
    }

    // -- Accessors --

    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    pub fn order_book(&self) -> &OrderBook {
        &self.order_book
    }

    /// Direct access for seeding orders in scenarios and replays.
    pub fn order_book_mut(&mut self) -> &mut OrderBook {
        &mut self.order_book
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn agent(&self) -> Option<&TransportAgent> {
        self.agent.as_ref()
    }

    pub fn counter(&self) -> &DeliveryCounter {
        &self.counter
    }

    pub fn items(&self) -> &ItemArena {
        &self.items
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    pub fn dialogue(&self) -> &DialogueScheduler {
        &self.dialogue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::GameState;
    use crate::counter::Route;
    use crate::fixed::secs;
    use crate::test_utils::*;
    use crate::transport::{AgentPhase, TransportConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn standard_session_reaches_playing_and_records_spawns() {
        let mut session = playing_session(GameMode::Standard);
        assert_eq!(session.clock().state(), GameState::Playing);
        let before = session.ledger().spawned;

        let report = session.tick(secs(8));
        assert_eq!(report.spawn.spawned, 2);
        assert_eq!(session.ledger().spawned, before + 2);
    }

    #[test]
    fn tutorial_session_never_records() {
        let mut session = playing_session(GameMode::Tutorial);
        session.tick(secs(20));
        let plate = session
            .give_player(ItemKind::Plate(bundle_for(session.catalog(), "burger")))
            .unwrap();
        assert!(session.submit().is_accepted());
        assert!(!session.items().contains(plate));
        assert_eq!(session.ledger(), &ResultLedger::default());
    }

    #[test]
    fn standard_delivery_goes_through_agent() {
        let mut session = playing_session(GameMode::Standard);
        let plate = session
            .give_player(ItemKind::Plate(bundle_for(session.catalog(), "salad")))
            .unwrap();

        assert!(matches!(
            session.submit(),
            SubmitOutcome::Accepted {
                route: Route::Queued,
                ..
            }
        ));
        assert_eq!(session.items().holder(plate), Some(Holder::Counter));

        for _ in 0..300 {
            session.tick(fixed(0.1));
        }
        assert!(!session.items().contains(plate));
        assert_eq!(session.events().total_emitted(EventKind::PlatePickedUp), 1);
    }

    #[test]
    fn hands_hold_one_item() {
        let mut session = playing_session(GameMode::Standard);
        session.give_player(ItemKind::Plate(Default::default())).unwrap();
        assert!(matches!(
            session.give_player(ItemKind::Plate(Default::default())),
            Err(SessionError::HandsFull)
        ));
    }

    #[test]
    fn trash_records_only_while_recording() {
        let mut session = playing_session(GameMode::Standard);
        let bread = session.catalog().ingredient_id("bread").unwrap();
        session.give_player(ItemKind::Ingredient(bread)).unwrap();
        session.trash().unwrap();
        assert_eq!(session.ledger().trashed, 1);
        assert!(matches!(session.trash(), Err(SessionError::NothingHeld)));

        session.end_session();
        session.give_player(ItemKind::Ingredient(bread)).unwrap();
        session.trash().unwrap();
        assert_eq!(session.ledger().trashed, 1);
        assert_eq!(session.events().total_emitted(EventKind::ItemDisposed), 2);
    }

    #[test]
    fn game_over_suspends_agent() {
        let mut session = playing_session(GameMode::Standard);
        session.tick(fixed(0.5));
        assert!(session.agent().is_some_and(|a| a.is_running()));

        session.end_session();
        assert!(session.agent().is_some_and(|a| !a.is_running()));
    }

    #[test]
    fn mode_switch_suspends_and_resumes_agent() {
        let mut session = playing_session(GameMode::Standard);
        session.set_mode(GameMode::Tutorial);
        assert!(session.agent().is_some_and(|a| !a.is_running()));
        session.set_mode(GameMode::Standard);
        session.tick(fixed(0.1));
        assert!(session.agent().is_some_and(|a| a.is_running()));
        assert_ne!(session.agent().map(|a| a.phase()), Some(AgentPhase::Idle));
    }

    #[test]
    fn disabled_agent_is_announced_and_falls_back() {
        let config = KitchenConfig {
            transport: Some(TransportConfig::default()),
            ..test_config()
        };
        let mut session = Session::new(kitchen_catalog(), config);
        assert_eq!(session.events().total_emitted(EventKind::AgentDisabled), 1);

        session.start_session(GameMode::Standard, true);
        session.tick(secs(5));
        session
            .give_player(ItemKind::Plate(bundle_for(session.catalog(), "burger")))
            .unwrap();
        assert!(matches!(
            session.submit(),
            SubmitOutcome::Accepted {
                route: Route::FallbackDisposed,
                ..
            }
        ));
    }

    #[test]
    fn listeners_run_synchronously_until_teardown() {
        let mut session = playing_session(GameMode::Standard);
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        session.subscribe(
            EventKind::OrderSpawned,
            Box::new(move |_: &Event| *sink.borrow_mut() += 1),
        );

        let report = session.tick(secs(4));
        assert_eq!(*seen.borrow(), report.spawn.spawned as usize);

        session.teardown();
        session.tick(secs(4));
        assert_eq!(*seen.borrow(), report.spawn.spawned as usize);
    }

    #[test]
    fn game_over_flushes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        let config = KitchenConfig {
            results_path: Some(path.clone()),
            ..test_config()
        };
        let mut session = Session::new(kitchen_catalog(), config);
        session.start_session(GameMode::Standard, true);

        let report = session.tick(secs(10_000));
        assert!(report.flushed);
        assert!(!session.tick(secs(1)).flushed);
        assert_eq!(ResultLedger::load(&path).unwrap(), *session.ledger());
    }

    #[test]
    fn manual_flush_needs_path() {
        let session = playing_session(GameMode::Standard);
        assert!(matches!(session.flush_results(), Err(SessionError::NoResultsPath)));
    }
}
