use rust_decimal::Decimal;
use thiserror::Error;

/// Order parameter problems caught at placement. Orders failing these checks
/// never enter the book.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Limit price must be positive")]
    InvalidPrice,

    #[error("Stop-limit order requires a positive stop price")]
    InvalidStopPrice,

    #[error("Order size too large")]
    AmountTooLarge,

    #[error("Leverage must be at least 1")]
    InvalidLeverage,

    #[error("Leverage exceeds maximum: {requested} > {max}")]
    LeverageExceeded { requested: u32, max: u32 },

    #[error("Symbol mismatch: simulating {expected}, order is for {got}")]
    SymbolMismatch { expected: String, got: String },
}

/// Trading engine errors. None of these are fatal to the simulation loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradingError {
    #[error("Invalid order: {0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Insufficient holdings of {symbol}: need {needed}, have {available}")]
    InsufficientHoldings {
        symbol: String,
        needed: Decimal,
        available: Decimal,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Simulation is not running")]
    EngineStopped,
}

pub type Result<T> = std::result::Result<T, TradingError>;
