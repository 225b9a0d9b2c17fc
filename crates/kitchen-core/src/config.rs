//! Tuning for one kitchen session.
//!
//! Every section has defaults, so a data file only needs the values it
//! changes.

use crate::clock::ClockConfig;
use crate::dialogue::DialogueConfig;
use crate::order_book::OrderBookConfig;
use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitchenConfig {
    /// Seed for recipe draws and dialogue timing.
    pub seed: u64,
    pub order_book: OrderBookConfig,
    pub clock: ClockConfig,
    /// `None` runs the session without a transport agent.
    pub transport: Option<TransportConfig>,
    pub dialogue: DialogueConfig,
    /// Where results are written at game over. `None` disables the
    /// automatic flush.
    pub results_path: Option<PathBuf>,
    /// Per-kind event history length.
    pub event_history: usize,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            order_book: OrderBookConfig::default(),
            clock: ClockConfig::default(),
            transport: None,
            dialogue: DialogueConfig::default(),
            results_path: None,
            event_history: 256,
        }
    }
}
