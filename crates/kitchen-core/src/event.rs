//! Synchronous event fan-out with bounded per-kind history.
//!
//! Components emit [`Event`]s into the session's [`EventBus`]. Emission is
//! synchronous: every listener subscribed to that [`EventKind`] runs, in
//! registration order, before `emit` returns. The event is then appended to
//! a per-kind [`EventBuffer`] so pollers (UI, tests, the headless driver) can
//! read recent history without subscribing.
//!
//! # Teardown
//!
//! [`EventBus::subscribe`] hands back a [`SubscriptionId`]. Owners must call
//! [`EventBus::unsubscribe`] when they go away; a removed listener is never
//! called again.

use crate::clock::{GameMode, GameState};
use crate::id::{ItemId, RecipeId, SubscriptionId};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why an item left play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisposeReason {
    /// Tutorial deliveries vanish on the counter.
    Tutorial,
    /// Standard mode without a usable transport agent.
    Fallback,
    /// The transport agent carried it off-stage.
    Delivered,
    /// The player threw it away.
    Trashed,
}

/// A kitchen event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Orders --
    OrderSpawned { recipe: RecipeId, waiting: usize },
    RecipeSucceeded { recipe: RecipeId, waiting: usize },
    RecipeFailed { waiting: usize },

    // -- Clock --
    StateChanged { state: GameState, mode: GameMode },
    FeedbackExitRequested,

    // -- Items --
    PlateQueued { item: ItemId },
    PlatePickedUp { item: ItemId },
    ItemDisposed { item: ItemId, reason: DisposeReason },

    // -- Agent --
    AgentDisabled,
    DialogueShown { line: usize },
    DialogueHidden { line: usize },
}

/// Discriminant tag for event types, used for subscriptions and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OrderSpawned,
    RecipeSucceeded,
    RecipeFailed,
    StateChanged,
    FeedbackExitRequested,
    PlateQueued,
    PlatePickedUp,
    ItemDisposed,
    AgentDisabled,
    DialogueShown,
    DialogueHidden,
}

const EVENT_KIND_COUNT: usize = 11;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::OrderSpawned { .. } => EventKind::OrderSpawned,
            Event::RecipeSucceeded { .. } => EventKind::RecipeSucceeded,
            Event::RecipeFailed { .. } => EventKind::RecipeFailed,
            Event::StateChanged { .. } => EventKind::StateChanged,
            Event::FeedbackExitRequested => EventKind::FeedbackExitRequested,
            Event::PlateQueued { .. } => EventKind::PlateQueued,
            Event::PlatePickedUp { .. } => EventKind::PlatePickedUp,
            Event::ItemDisposed { .. } => EventKind::ItemDisposed,
            Event::AgentDisabled => EventKind::AgentDisabled,
            Event::DialogueShown { .. } => EventKind::DialogueShown,
            Event::DialogueHidden { .. } => EventKind::DialogueHidden,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Bounded history of one event kind. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    capacity: usize,
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Event> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.back()
    }

    /// Clears stored events; `total_written` is a lifetime counter and stays.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A listener receives events read-only.
pub type Listener = Box<dyn FnMut(&Event)>;

struct SubscriberEntry {
    id: SubscriptionId,
    listener: Listener,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The session event bus.
pub struct EventBus {
    history: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    history_capacity: usize,
    next_subscription: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("history", &self.history)
            .field("suppressed", &self.suppressed)
            .field("history_capacity", &self.history_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: Default::default(),
            history_capacity,
            next_subscription: 0,
        }
    }

    /// Register a listener for one event kind. Listeners of the same kind run
    /// in registration order.
    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers[kind.index()].push(SubscriberEntry { id, listener });
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in &mut self.subscribers {
            if let Some(pos) = list.iter().position(|entry| entry.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Drop every listener. Called on session teardown.
    pub fn unsubscribe_all(&mut self) {
        for list in &mut self.subscribers {
            list.clear();
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers[kind.index()].len()
    }

    /// Suppressed kinds are neither delivered nor recorded.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.history[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Deliver to every listener of the event's kind, then record it.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }

        for entry in &mut self.subscribers[idx] {
            (entry.listener)(&event);
        }

        let capacity = self.history_capacity;
        self.history[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn history(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.history[kind.index()].as_ref()
    }

    /// Events of `kind` currently held in history.
    pub fn recorded_count(&self, kind: EventKind) -> usize {
        self.history[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Events of `kind` ever emitted (including ones dropped from history).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.history[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    pub fn latest(&self, kind: EventKind) -> Option<&Event> {
        self.history[kind.index()].as_ref().and_then(|b| b.latest())
    }

    /// Clear all history. Subscribers and suppression stay.
    pub fn clear_history(&mut self) {
        for buffer in self.history.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
