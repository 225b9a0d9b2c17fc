//! The NPC that carries delivered plates off-stage.
//!
//! [`TransportAgent`] is an explicit state machine advanced by
//! [`TransportAgent::step`] once per frame. Each step does at most one
//! movement or one timed wait, then yields back to the driver.
//!
//! # Cycle
//!
//! ```text
//! Idle -> MovingToIdlePoint -> WaitingForWork -> MovingToPickupPoint
//!      -> PickingUp -> Carrying -> Releasing -> Idle
//! ```
//!
//! A one-time `StartDelay` precedes the first move of the agent's life.
//!
//! # Suspension
//!
//! [`TransportAgent::on_signal`] freezes the loop on [`Activity::Inactive`]
//! without touching the task queue, the dequeued task, or the held plate.
//! On [`Activity::Active`] a stopped loop restarts from `Idle`, which routes
//! straight back to delivery if a plate is held, or back to the pickup point
//! if a task was already dequeued. A task is dequeued once and collected at
//! most once.

use crate::clock::Activity;
use crate::event::{DisposeReason, Event, EventBus};
use crate::fixed::{Fixed64, Seconds, f64_to_fixed64, fixed64_to_f64, secs};
use crate::id::ItemId;
use crate::item::{Holder, ItemArena};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point on the kitchen floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(with = "crate::fixed::serde_fixed")]
    pub x: Fixed64,
    #[serde(with = "crate::fixed::serde_fixed")]
    pub y: Fixed64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: f64_to_fixed64(x),
            y: f64_to_fixed64(y),
        }
    }

    fn distance_squared(self, other: Point) -> Fixed64 {
        let dx = self.x.saturating_sub(other.x);
        let dy = self.y.saturating_sub(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Straight-line distance. Goes through f64 for the square root, so only
    /// call it when a leg starts, not every tick.
    fn distance(self, other: Point) -> Fixed64 {
        f64_to_fixed64(fixed64_to_f64(self.distance_squared(other)).sqrt())
    }
}

/// The three stops of the delivery route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoints {
    /// Off-stage drop point. The agent starts here.
    pub exit: Point,
    /// Rest spot between deliveries.
    pub idle: Point,
    /// Beside the delivery counter.
    pub pickup: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaypointKind {
    Exit,
    Idle,
    Pickup,
}

impl Waypoints {
    pub fn get(&self, kind: WaypointKind) -> Point {
        match kind {
            WaypointKind::Exit => self.exit,
            WaypointKind::Idle => self.idle,
            WaypointKind::Pickup => self.pickup,
        }
    }
}

/// One straight walk between two points. Travel is tracked as distance
/// covered so per-tick updates stay in fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Leg {
    from: Point,
    target: WaypointKind,
    to: Point,
    length: Fixed64,
    travelled: Fixed64,
}

impl Leg {
    fn new(from: Point, target: WaypointKind, to: Point) -> Self {
        Self {
            from,
            target,
            to,
            length: from.distance(to),
            travelled: Fixed64::ZERO,
        }
    }

    /// Walk `distance` further. Returns true once within `arrive` of the end.
    fn advance(&mut self, distance: Fixed64, arrive: Fixed64) -> bool {
        self.travelled = self.travelled.saturating_add(distance).min(self.length);
        self.length - self.travelled <= arrive
    }

    fn position(&self) -> Point {
        let Some(t) = self.travelled.checked_div(self.length) else {
            return self.to;
        };
        Point {
            x: self.from.x + (self.to.x - self.from.x) * t,
            y: self.from.y + (self.to.y - self.from.y) * t,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Required. Without a route the agent disables itself for the session.
    pub waypoints: Option<Waypoints>,
    /// Floor units per second.
    #[serde(with = "crate::fixed::serde_non_negative")]
    pub move_speed: Fixed64,
    #[serde(with = "crate::fixed::serde_seconds")]
    pub pickup_delay: Seconds,
    /// Wait at the exit before the very first move.
    #[serde(with = "crate::fixed::serde_seconds")]
    pub initial_start_delay: Seconds,
    /// A waypoint counts as reached within this distance.
    #[serde(with = "crate::fixed::serde_non_negative")]
    pub arrive_distance: Fixed64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            waypoints: None,
            move_speed: secs(2),
            pickup_delay: f64_to_fixed64(0.25),
            initial_start_delay: secs(3),
            arrive_distance: f64_to_fixed64(0.1),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport agent needs exit, idle and pickup waypoints")]
    MissingWaypoints,
    #[error("transport agent move speed must be positive")]
    NonPositiveSpeed,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A plate waiting on the counter for collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTask {
    pub item: ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    StartDelay,
    MovingToIdlePoint,
    WaitingForWork,
    MovingToPickupPoint,
    PickingUp,
    Carrying,
    Releasing,
}

#[derive(Debug, Clone)]
pub struct TransportAgent {
    config: TransportConfig,
    route: Result<Waypoints, TransportError>,
    phase: AgentPhase,
    running: bool,
    walking: bool,
    position: Point,
    leg: Option<Leg>,
    wait: Seconds,
    queue: VecDeque<TransportTask>,
    pending: Option<TransportTask>,
    held: Option<ItemId>,
    start_delay_done: bool,
    returned_from_exit: bool,
}

impl TransportAgent {
    /// Build an agent parked at the exit. A bad configuration disables the
    /// agent for good; the error is logged here, once.
    pub fn new(config: TransportConfig) -> Self {
        let route = match config.waypoints {
            None => Err(TransportError::MissingWaypoints),
            Some(_) if config.move_speed <= Fixed64::ZERO => Err(TransportError::NonPositiveSpeed),
            Some(w) => Ok(w),
        };
        if let Err(e) = &route {
            tracing::error!(error = %e, "transport agent disabled");
        }
        let position = route.as_ref().map(|w| w.exit).unwrap_or(Point {
            x: Fixed64::ZERO,
            y: Fixed64::ZERO,
        });

        Self {
            config,
            route,
            phase: AgentPhase::Idle,
            running: false,
            walking: false,
            position,
            leg: None,
            wait: Seconds::ZERO,
            queue: VecDeque::new(),
            pending: None,
            held: None,
            start_delay_done: false,
            returned_from_exit: false,
        }
    }

    /// False once the agent has disabled itself.
    pub fn is_available(&self) -> bool {
        self.route.is_ok()
    }

    pub fn disabled_reason(&self) -> Option<&TransportError> {
        self.route.as_ref().err()
    }

    /// Queue a plate for collection. Works whether or not the loop runs.
    pub fn enqueue(&mut self, task: TransportTask) {
        self.queue.push_back(task);
    }

    /// React to a clock or mode change.
    pub fn on_signal(&mut self, activity: Activity) {
        if !self.is_available() {
            return;
        }
        match activity {
            Activity::Inactive => {
                if self.running {
                    tracing::debug!(phase = ?self.phase, "transport agent suspended");
                }
                self.running = false;
                self.walking = false;
            }
            Activity::Active => {
                if !self.running {
                    tracing::debug!(held = self.held.is_some(), "transport agent resumed");
                    self.running = true;
                    self.phase = AgentPhase::Idle;
                    self.leg = None;
                }
            }
        }
    }

    /// Advance the loop by one frame.
    pub fn step(&mut self, dt: Seconds, items: &mut ItemArena, events: &mut EventBus) {
        let Ok(&route) = self.route.as_ref() else {
            return;
        };
        if !self.running {
            return;
        }

        loop {
            match self.phase {
                AgentPhase::Idle => {
                    self.phase = self.next_from_idle();
                    if self.phase == AgentPhase::StartDelay {
                        self.wait = self.config.initial_start_delay;
                    }
                }
                AgentPhase::StartDelay => {
                    self.wait -= dt;
                    if self.wait <= Seconds::ZERO {
                        self.start_delay_done = true;
                        self.phase = AgentPhase::Idle;
                    }
                    return;
                }
                AgentPhase::MovingToIdlePoint => {
                    if self.travel(&route, WaypointKind::Idle, dt) {
                        self.phase = AgentPhase::WaitingForWork;
                    }
                    return;
                }
                AgentPhase::WaitingForWork => {
                    if self.held.is_some() {
                        self.phase = AgentPhase::Carrying;
                        continue;
                    }
                    match self.queue.pop_front() {
                        Some(task) => {
                            self.pending = Some(task);
                            self.phase = AgentPhase::MovingToPickupPoint;
                        }
                        None => return,
                    }
                }
                AgentPhase::MovingToPickupPoint => {
                    if self.travel(&route, WaypointKind::Pickup, dt) {
                        self.collect(items, events);
                    }
                    return;
                }
                AgentPhase::PickingUp => {
                    self.wait -= dt;
                    if self.wait <= Seconds::ZERO {
                        self.phase = AgentPhase::Carrying;
                    }
                    return;
                }
                AgentPhase::Carrying => {
                    if self.travel(&route, WaypointKind::Exit, dt) {
                        self.phase = AgentPhase::Releasing;
                    }
                    return;
                }
                AgentPhase::Releasing => {
                    if let Some(item) = self.held.take() {
                        items.dispose(item);
                        events.emit(Event::ItemDisposed {
                            item,
                            reason: DisposeReason::Delivered,
                        });
                    }
                    self.returned_from_exit = true;
                    self.phase = AgentPhase::Idle;
                    return;
                }
            }
        }
    }

    fn next_from_idle(&self) -> AgentPhase {
        if !self.start_delay_done {
            AgentPhase::StartDelay
        } else if self.held.is_some() {
            AgentPhase::Carrying
        } else if self.pending.is_some() {
            AgentPhase::MovingToPickupPoint
        } else {
            AgentPhase::MovingToIdlePoint
        }
    }

    /// Take the dequeued plate off the counter. The task is consumed whether
    /// or not the plate is still there, so it is never collected twice.
    fn collect(&mut self, items: &mut ItemArena, events: &mut EventBus) {
        let Some(task) = self.pending.take() else {
            self.phase = AgentPhase::Idle;
            return;
        };
        match items.transfer(task.item, Holder::Counter, Holder::Agent) {
            Ok(()) => {
                self.held = Some(task.item);
                self.wait = self.config.pickup_delay;
                self.phase = AgentPhase::PickingUp;
                events.emit(Event::PlatePickedUp { item: task.item });
            }
            Err(e) => {
                tracing::warn!(error = %e, "queued plate no longer on the counter");
                self.phase = AgentPhase::Idle;
            }
        }
    }

    /// Walk toward `target`. Returns true on arrival.
    fn travel(&mut self, route: &Waypoints, target: WaypointKind, dt: Seconds) -> bool {
        let to = route.get(target);
        if self.leg.is_some_and(|leg| leg.target != target) {
            self.leg = None;
        }
        let from = self.position;
        let leg = self.leg.get_or_insert_with(|| Leg::new(from, target, to));

        let arrived = leg.advance(
            self.config.move_speed.saturating_mul(dt),
            self.config.arrive_distance,
        );
        if arrived {
            self.position = to;
            self.leg = None;
            self.walking = false;
        } else {
            self.position = leg.position();
            self.walking = true;
        }
        arrived
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Walking animation flag.
    pub fn is_moving(&self) -> bool {
        self.walking
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn held_item(&self) -> Option<ItemId> {
        self.held
    }

    /// Tasks not yet dequeued.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// The dequeued task the agent is walking to collect, if any.
    pub fn pending_task(&self) -> Option<TransportTask> {
        self.pending
    }

    /// Closest route stop to the agent, or `None` when disabled.
    pub fn nearest_waypoint(&self) -> Option<WaypointKind> {
        let route = self.route.as_ref().ok()?;
        [WaypointKind::Exit, WaypointKind::Idle, WaypointKind::Pickup]
            .into_iter()
            .min_by_key(|kind| self.position.distance_squared(route.get(*kind)))
    }

    /// Reports, once, that the agent has come back from the exit since the
    /// last call.
    pub fn take_returned_from_exit(&mut self) -> bool {
        std::mem::take(&mut self.returned_from_exit)
    }
}
