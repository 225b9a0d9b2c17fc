//! The bounded queue of wanted recipes, its spawn timer, and the delivery
//! matcher.
//!
//! # Matching
//!
//! An order matches a bundle when both have the same number of ingredients
//! and every ingredient the recipe lists is present somewhere in the bundle.
//! Presence is a membership test, not a per-unit count: a recipe of
//! `{A, A, B}` accepts a bundle of `{A, B, B}`. This is the shipped
//! behaviour and is kept as-is.
//!
//! Orders are scanned in insertion order and the first match wins.

use crate::catalog::RecipeCatalog;
use crate::event::{Event, EventBus};
use crate::fixed::{Seconds, secs};
use crate::id::{IngredientId, RecipeId};
use crate::item::Bundle;
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

/// Tuning for the order book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderBookConfig {
    /// Seconds between spawn attempts.
    #[serde(with = "crate::fixed::serde_seconds")]
    pub spawn_interval: Seconds,
    /// Maximum number of wanted orders at once.
    pub capacity: usize,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            spawn_interval: secs(4),
            capacity: 4,
        }
    }
}

/// A recipe the kitchen currently wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WantedOrder {
    pub recipe: RecipeId,
    /// Order-book clock reading when the order appeared. Informational only.
    #[serde(with = "crate::fixed::serde_seconds")]
    pub spawned_at: Seconds,
}

/// Outcome of [`OrderBook::match_bundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    /// The recipe that was fulfilled, if any.
    pub recipe: Option<RecipeId>,
}

/// What a single [`OrderBook::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    /// Whole spawn intervals that elapsed during the call.
    pub intervals: u32,
    /// Orders actually added (intervals at capacity add nothing).
    pub spawned: u32,
}

/// Returns true if `recipe` is satisfied by `bundle` under the
/// count-plus-membership rule described in the module docs.
pub fn recipe_matches(recipe: &[IngredientId], bundle: &Bundle) -> bool {
    recipe.len() == bundle.len() && recipe.iter().all(|ingredient| bundle.contains(*ingredient))
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    config: OrderBookConfig,
    wanted: Vec<WantedOrder>,
    spawn_timer: Seconds,
    elapsed: Seconds,
    successful: u32,
    failed: u32,
}

impl OrderBook {
    /// An empty book with the spawn timer at its full interval.
    pub fn new(config: OrderBookConfig) -> Self {
        let spawn_timer = config.spawn_interval;
        Self {
            config,
            wanted: Vec::new(),
            spawn_timer,
            elapsed: Seconds::ZERO,
            successful: 0,
            failed: 0,
        }
    }

    /// Advance the spawn timer by `dt`. Every whole interval that elapses is
    /// one spawn attempt; attempts while the book is full are skipped but the
    /// time still counts.
    pub fn tick(
        &mut self,
        dt: Seconds,
        catalog: &RecipeCatalog,
        rng: &mut SimRng,
        events: &mut EventBus,
    ) -> SpawnReport {
        let mut report = SpawnReport::default();
        if self.config.spawn_interval <= Seconds::ZERO {
            // A zero interval would never drain.
            return report;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        self.spawn_timer -= dt;

        while self.spawn_timer <= Seconds::ZERO {
            self.spawn_timer += self.config.spawn_interval;
            report.intervals += 1;

            if self.wanted.len() >= self.config.capacity {
                continue;
            }
            let Some(recipe) = catalog.draw(rng) else {
                continue;
            };

            self.wanted.push(WantedOrder {
                recipe,
                spawned_at: self.elapsed,
            });
            report.spawned += 1;
            tracing::debug!(
                recipe = catalog.recipe_name(recipe),
                waiting = self.wanted.len(),
                "order spawned"
            );
            events.emit(Event::OrderSpawned {
                recipe,
                waiting: self.wanted.len(),
            });
        }

        report
    }

    /// Match a delivered bundle against the wanted orders. At most one order
    /// is removed. The bundle itself is left untouched; disposal is the
    /// caller's business.
    pub fn match_bundle(
        &mut self,
        bundle: &Bundle,
        catalog: &RecipeCatalog,
        events: &mut EventBus,
    ) -> MatchResult {
        let hit = self.wanted.iter().position(|order| {
            catalog
                .get_recipe(order.recipe)
                .is_some_and(|def| recipe_matches(&def.ingredients, bundle))
        });

        match hit {
            Some(index) => {
                let order = self.wanted.remove(index);
                self.successful += 1;
                tracing::debug!(recipe = catalog.recipe_name(order.recipe), "recipe delivered");
                events.emit(Event::RecipeSucceeded {
                    recipe: order.recipe,
                    waiting: self.wanted.len(),
                });
                MatchResult {
                    matched: true,
                    recipe: Some(order.recipe),
                }
            }
            None => {
                self.failed += 1;
                tracing::debug!(ingredients = bundle.len(), "wrong recipe delivered");
                events.emit(Event::RecipeFailed {
                    waiting: self.wanted.len(),
                });
                MatchResult {
                    matched: false,
                    recipe: None,
                }
            }
        }
    }

    /// Wanted orders in insertion (scan) order.
    pub fn wanted(&self) -> &[WantedOrder] {
        &self.wanted
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Correct deliveries over the book's lifetime.
    pub fn successful(&self) -> u32 {
        self.successful
    }

    /// Wrong deliveries over the book's lifetime.
    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Seconds until the next spawn attempt.
    pub fn spawn_timer(&self) -> Seconds {
        self.spawn_timer
    }

    /// Append an order directly, respecting capacity. Returns false when full.
    /// Used to seed scenarios and by replay tooling.
    pub fn push_order(&mut self, recipe: RecipeId) -> bool {
        if self.wanted.len() >= self.config.capacity {
            return false;
        }
        self.wanted.push(WantedOrder {
            recipe,
            spawned_at: self.elapsed,
        });
        true
    }
}
