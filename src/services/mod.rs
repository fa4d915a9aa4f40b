pub mod candles;
pub mod clock;
pub mod engine;
pub mod ledger;
pub mod order_book;
pub mod positions;
pub mod price_generator;
pub mod trigger;

pub use candles::CandleHistory;
pub use clock::{SimulationClock, SimulationHandle};
pub use engine::MarketSimulator;
pub use ledger::Ledger;
pub use order_book::{validate_order, OrderBook, OrderRules};
pub use positions::{HoldingsTracker, PermissiveTracker, PositionTracker};
pub use price_generator::{PriceGenerator, RandomWalkGenerator, ReplayGenerator};
pub use trigger::{scan, trigger_price, TriggeredOrder};
