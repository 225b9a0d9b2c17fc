//! The hand-off point between the player and the rest of the kitchen.

use crate::clock::GameMode;
use crate::event::{DisposeReason, Event};
use crate::id::ItemId;
use crate::item::Holder;
use crate::session::SessionContext;
use crate::transport::TransportTask;

/// Why a submission was ignored. Rejections are not logged or counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NothingHeld,
    /// The item exists but the player is not the one holding it.
    NotHeldByPlayer,
    CounterOccupied,
    NotAPlate,
}

/// Where an accepted plate went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Tutorial: gone immediately.
    Disposed,
    /// Standard: left on the counter for the transport agent.
    Queued,
    /// Standard, but no usable agent.
    FallbackDisposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(RejectReason),
    Accepted { matched: bool, route: Route },
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryCounter {
    accepted: u32,
    fallbacks: u32,
}

impl DeliveryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plates accepted over the counter's lifetime.
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    /// Accepted plates that had to be disposed for lack of an agent.
    pub fn fallbacks(&self) -> u32 {
        self.fallbacks
    }

    /// Take the player's plate, match it, and route it on.
    pub fn submit(&mut self, item: Option<ItemId>, ctx: &mut SessionContext<'_>) -> SubmitOutcome {
        let Some(id) = item else {
            return SubmitOutcome::Rejected(RejectReason::NothingHeld);
        };
        if ctx.items.count_held_by(Holder::Counter) > 0 {
            return SubmitOutcome::Rejected(RejectReason::CounterOccupied);
        }
        let bundle = match ctx.items.get(id) {
            None => return SubmitOutcome::Rejected(RejectReason::NothingHeld),
            Some(item) if item.holder() != Holder::Player => {
                return SubmitOutcome::Rejected(RejectReason::NotHeldByPlayer);
            }
            Some(item) => match item.kind.as_plate() {
                Some(bundle) => bundle.clone(),
                None => return SubmitOutcome::Rejected(RejectReason::NotAPlate),
            },
        };
        if ctx.items.transfer(id, Holder::Player, Holder::Counter).is_err() {
            return SubmitOutcome::Rejected(RejectReason::NotHeldByPlayer);
        }
        self.accepted += 1;

        let result = ctx.order_book.match_bundle(&bundle, ctx.catalog, ctx.events);
        if ctx.clock.is_recording() {
            ctx.ledger.record_result(result.matched);
        }

        let route = match ctx.clock.mode() {
            GameMode::Tutorial => {
                dispose(ctx, id, DisposeReason::Tutorial);
                Route::Disposed
            }
            GameMode::Standard => {
                let agent = ctx.agent.as_deref_mut().filter(|a| a.is_available());
                if let Some(agent) = agent {
                    agent.enqueue(TransportTask { item: id });
                    ctx.events.emit(Event::PlateQueued { item: id });
                    Route::Queued
                } else {
                    tracing::warn!("no transport agent available, disposing plate on the counter");
                    self.fallbacks += 1;
                    dispose(ctx, id, DisposeReason::Fallback);
                    Route::FallbackDisposed
                }
            }
        };

        SubmitOutcome::Accepted {
            matched: result.matched,
            route,
        }
    }
}

fn dispose(ctx: &mut SessionContext<'_>, id: ItemId, reason: DisposeReason) {
    if ctx.items.dispose(id).is_some() {
        ctx.events.emit(Event::ItemDisposed { item: id, reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RecipeCatalog;
    use crate::clock::{ClockConfig, GameClock};
    use crate::event::{EventBus, EventKind};
    use crate::item::{ItemArena, ItemKind};
    use crate::ledger::ResultLedger;
    use crate::order_book::{OrderBook, OrderBookConfig};
    use crate::test_utils::*;
    use crate::transport::{TransportAgent, TransportConfig};

    struct Parts {
        catalog: RecipeCatalog,
        order_book: OrderBook,
        clock: GameClock,
        agent: Option<TransportAgent>,
        items: ItemArena,
        events: EventBus,
        ledger: ResultLedger,
    }

    impl Parts {
        fn new(mode: GameMode, agent: Option<TransportAgent>) -> Self {
            let catalog = kitchen_catalog();
            let mut order_book = OrderBook::new(OrderBookConfig::default());
            order_book.push_order(catalog.recipe_id("burger").unwrap());
            let mut events = EventBus::default();
            let mut clock = GameClock::new(ClockConfig::default());
            clock.start_session(mode, false, &mut events);
            // Through waiting and countdown into Playing.
            clock.tick(fixed(4.5), &mut events);
            Self {
                catalog,
                order_book,
                clock,
                agent,
                items: ItemArena::new(),
                events,
                ledger: ResultLedger::new(),
            }
        }

        fn ctx(&mut self) -> SessionContext<'_> {
            SessionContext {
                catalog: &self.catalog,
                order_book: &mut self.order_book,
                clock: &self.clock,
                agent: self.agent.as_mut(),
                items: &mut self.items,
                events: &mut self.events,
                ledger: &mut self.ledger,
            }
        }

        fn plate(&mut self, recipe: &str) -> ItemId {
            let bundle = bundle_for(&self.catalog, recipe);
            self.items.spawn(ItemKind::Plate(bundle), Holder::Player)
        }
    }

    #[test]
    fn rejects_silently() {
        let mut parts = Parts::new(GameMode::Standard, None);
        let mut counter = DeliveryCounter::new();

        assert_eq!(
            counter.submit(None, &mut parts.ctx()),
            SubmitOutcome::Rejected(RejectReason::NothingHeld)
        );

        let bread = parts.catalog.ingredient_id("bread").unwrap();
        let loose = parts.items.spawn(ItemKind::Ingredient(bread), Holder::Player);
        assert_eq!(
            counter.submit(Some(loose), &mut parts.ctx()),
            SubmitOutcome::Rejected(RejectReason::NotAPlate)
        );

        let elsewhere = parts.items.spawn(ItemKind::Plate(Default::default()), Holder::Agent);
        assert_eq!(
            counter.submit(Some(elsewhere), &mut parts.ctx()),
            SubmitOutcome::Rejected(RejectReason::NotHeldByPlayer)
        );

        assert_eq!(counter.accepted(), 0);
        assert_eq!(parts.ledger, ResultLedger::default());
        assert_eq!(parts.events.total_emitted(EventKind::RecipeFailed), 0);
    }

    #[test]
    fn occupied_counter_rejects() {
        let mut parts = Parts::new(GameMode::Standard, Some(TransportAgent::new(transport_config())));
        let mut counter = DeliveryCounter::new();
        let first = parts.plate("burger");
        let second = parts.plate("salad");

        assert!(counter.submit(Some(first), &mut parts.ctx()).is_accepted());
        assert_eq!(
            counter.submit(Some(second), &mut parts.ctx()),
            SubmitOutcome::Rejected(RejectReason::CounterOccupied)
        );
        assert_eq!(parts.items.holder(second), Some(Holder::Player));
    }

    #[test]
    fn tutorial_disposes_and_does_not_record() {
        let mut parts = Parts::new(GameMode::Tutorial, None);
        let mut counter = DeliveryCounter::new();
        let plate = parts.plate("burger");

        assert_eq!(
            counter.submit(Some(plate), &mut parts.ctx()),
            SubmitOutcome::Accepted {
                matched: true,
                route: Route::Disposed
            }
        );
        assert!(!parts.items.contains(plate));
        assert_eq!(parts.order_book.successful(), 1);
        assert_eq!(parts.ledger, ResultLedger::default());
        assert_eq!(
            parts.events.latest(EventKind::ItemDisposed),
            Some(&Event::ItemDisposed {
                item: plate,
                reason: DisposeReason::Tutorial
            })
        );
    }

    #[test]
    fn standard_queues_for_agent_and_records() {
        let mut parts = Parts::new(GameMode::Standard, Some(TransportAgent::new(transport_config())));
        let mut counter = DeliveryCounter::new();
        let plate = parts.plate("salad");

        assert_eq!(
            counter.submit(Some(plate), &mut parts.ctx()),
            SubmitOutcome::Accepted {
                matched: false,
                route: Route::Queued
            }
        );
        assert_eq!(parts.items.holder(plate), Some(Holder::Counter));
        assert_eq!(parts.agent.as_ref().map(|a| a.queued()), Some(1));
        assert_eq!(parts.ledger.wrong, 1);
        assert_eq!(parts.order_book.wanted().len(), 1);
        assert_eq!(parts.events.total_emitted(EventKind::PlateQueued), 1);
    }

    #[test]
    fn standard_without_usable_agent_falls_back() {
        for agent in [None, Some(TransportAgent::new(TransportConfig::default()))] {
            let mut parts = Parts::new(GameMode::Standard, agent);
            let mut counter = DeliveryCounter::new();
            let plate = parts.plate("burger");

            assert_eq!(
                counter.submit(Some(plate), &mut parts.ctx()),
                SubmitOutcome::Accepted {
                    matched: true,
                    route: Route::FallbackDisposed
                }
            );
            assert!(!parts.items.contains(plate));
            assert_eq!(counter.fallbacks(), 1);
            assert_eq!(parts.ledger.correct, 1);
            assert_eq!(parts.items.count_held_by(Holder::Counter), 0);
        }
    }
}
