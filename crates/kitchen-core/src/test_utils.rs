//! Shared fixtures for unit and integration tests.
//!
//! Enabled for this crate's own tests and, through the `test-utils`
//! feature, for dependent crates.

use crate::catalog::{CatalogBuilder, RecipeCatalog};
use crate::clock::GameMode;
use crate::config::KitchenConfig;
use crate::fixed::{Fixed64, Seconds, f64_to_fixed64, secs};
use crate::item::Bundle;
use crate::session::Session;
use crate::transport::{Point, TransportConfig, Waypoints};

pub fn fixed(v: f64) -> Fixed64 {
    f64_to_fixed64(v)
}

/// Ingredients: bread, cooked_patty, cheese_slice, tomato_slice,
/// cabbage_slice. Recipes: burger, salad, cheeseburger, mega_burger.
pub fn kitchen_catalog() -> RecipeCatalog {
    let mut b = CatalogBuilder::new();
    let bread = b.register_ingredient("bread");
    let patty = b.register_ingredient("cooked_patty");
    let cheese = b.register_ingredient("cheese_slice");
    let tomato = b.register_ingredient("tomato_slice");
    let cabbage = b.register_ingredient("cabbage_slice");

    let recipes = [
        ("burger", vec![bread, patty]),
        ("salad", vec![tomato, cabbage]),
        ("cheeseburger", vec![bread, patty, cheese]),
        ("mega_burger", vec![bread, patty, cheese, tomato, cabbage]),
    ];
    for (name, ingredients) in recipes {
        b.register_recipe(name, ingredients).expect("fixture recipe");
    }
    b.build().expect("fixture catalog")
}

/// A plate holding exactly the ingredients of `recipe`.
pub fn bundle_for(catalog: &RecipeCatalog, recipe: &str) -> Bundle {
    let id = catalog.recipe_id(recipe).expect("fixture recipe name");
    let def = catalog.get_recipe(id).expect("fixture recipe id");
    def.ingredients.iter().copied().collect()
}

/// Exit at the origin, idle point 4 units east, pickup 3 units north of
/// idle.
pub fn route() -> Waypoints {
    Waypoints {
        exit: Point::new(0.0, 0.0),
        idle: Point::new(4.0, 0.0),
        pickup: Point::new(4.0, 3.0),
    }
}

pub fn transport_config() -> TransportConfig {
    TransportConfig {
        waypoints: Some(route()),
        ..TransportConfig::default()
    }
}

/// Default tuning with a working transport agent.
pub fn test_config() -> KitchenConfig {
    KitchenConfig {
        seed: 42,
        transport: Some(transport_config()),
        ..KitchenConfig::default()
    }
}

/// Drive a fresh session through waiting and countdown so it is playing.
pub fn playing_session(mode: GameMode) -> Session {
    let mut session = Session::new(kitchen_catalog(), test_config());
    session.start_session(mode, false);
    let lead_in: Seconds = secs(4);
    session.tick(lead_in);
    session
}
