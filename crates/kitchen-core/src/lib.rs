//! Kitchen simulation core.
//!
//! Tracks a rolling set of wanted recipes, matches delivered plates against
//! them, and runs the transport agent that carries finished plates
//! off-stage. Everything advances from one cooperative tick driven by an
//! external frame loop through [`session::Session`].
//!
//! All simulation time is fixed-point ([`fixed::Seconds`]) and recipe draws
//! come from a seeded [`rng::SimRng`], so a session replays identically from
//! the same seed and tick sequence.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod counter;
pub mod dialogue;
pub mod event;
pub mod fixed;
pub mod flow;
pub mod id;
pub mod item;
pub mod ledger;
pub mod order_book;
pub mod rng;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
