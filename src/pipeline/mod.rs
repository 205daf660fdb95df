// src/pipeline/mod.rs
pub mod batch;
pub mod ticker;

pub use batch::{BatchConfig, BatchOrchestrator};
pub use ticker::TickerProcessor;
