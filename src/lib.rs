//! fxsim - Simulated forex tick engine
//!
//! A synthetic price feed drives an order book of limit and stop-limit
//! orders against a single virtual margin account.

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::SimulationConfig;
pub use error::{Result, TradingError, ValidationError};
