//! Trading Types
//!
//! Types for the simulated account: orders, fills and the ledger account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Execute immediately at the current price
    Market,
    /// Execute at the limit price once the market reaches it
    Limit,
    /// Arm at the stop price, execute at the limit price
    StopLimit,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::StopLimit => write!(f, "stop_limit"),
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Resting in the book, waiting for its trigger
    Open,
    /// Executed against the ledger
    Filled,
    /// Withdrawn by the user
    Canceled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// Virtual account owned by one simulation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Uncommitted cash
    pub balance: Decimal,
    /// Balance plus unrealized effects (tracks balance for now)
    pub equity: Decimal,
    /// Capital locked by leveraged exposure
    pub margin_used: Decimal,
    /// Always `balance - margin_used`, refreshed by `recalculate`
    pub free_margin: Decimal,
}

impl Account {
    /// Create an account funded with `starting_balance`.
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            balance: starting_balance,
            equity: starting_balance,
            margin_used: Decimal::ZERO,
            free_margin: starting_balance,
        }
    }

    /// Refresh the derived fields. Call after every balance or margin change.
    pub fn recalculate(&mut self) {
        self.equity = self.balance;
        self.free_margin = self.balance - self.margin_used;
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// A trading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique order ID
    pub id: String,
    /// Currency pair (e.g. "EUR/USD")
    pub symbol: String,
    /// Buy or sell
    pub side: OrderSide,
    /// Order kind
    pub kind: OrderKind,
    /// Limit price (limit and stop-limit orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    /// Stop price (stop-limit orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Units of the base currency
    pub amount: Decimal,
    /// Margin multiplier, at least 1
    pub leverage: u32,
    /// Current status
    pub status: OrderStatus,
    /// When the order was placed (ms)
    pub created_at: i64,
    /// When the order reached a terminal status (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    /// Execution price once filled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_price: Option<Decimal>,
}

impl Order {
    /// Build an order from a placement request. Market orders never rest,
    /// so the status here is only meaningful for limit and stop-limit kinds.
    pub fn from_request(request: &PlaceOrderRequest, created_at: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: request.symbol.clone(),
            side: request.side,
            kind: request.kind,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            amount: request.amount,
            leverage: request.leverage,
            status: OrderStatus::Open,
            created_at,
            resolved_at: None,
            fill_price: None,
        }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, OrderStatus::Filled | OrderStatus::Canceled)
    }

    /// Check if order is resting in the book.
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Notional value at the given price, `None` if it overflows.
    pub fn notional(&self, price: Decimal) -> Option<Decimal> {
        self.amount.checked_mul(price)
    }

    /// Transition to `Filled`. No-op on terminal orders.
    pub fn mark_filled(&mut self, fill_price: Decimal, at: i64) {
        if self.is_terminal() {
            return;
        }
        self.status = OrderStatus::Filled;
        self.fill_price = Some(fill_price);
        self.resolved_at = Some(at);
    }

    /// Transition to `Canceled`. No-op on terminal orders.
    pub fn mark_canceled(&mut self, at: i64) {
        if self.is_terminal() {
            return;
        }
        self.status = OrderStatus::Canceled;
        self.resolved_at = Some(at);
    }
}

/// Request to place an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
}

fn default_leverage() -> u32 {
    1
}

impl PlaceOrderRequest {
    /// A market order request.
    pub fn market(symbol: impl Into<String>, side: OrderSide, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind: OrderKind::Market,
            amount,
            limit_price: None,
            stop_price: None,
            leverage: default_leverage(),
        }
    }

    /// A limit order request.
    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        amount: Decimal,
        limit_price: Decimal,
    ) -> Self {
        let mut request = Self::market(symbol, side, amount);
        request.kind = OrderKind::Limit;
        request.limit_price = Some(limit_price);
        request
    }

    /// A stop-limit order request.
    pub fn stop_limit(
        symbol: impl Into<String>,
        side: OrderSide,
        amount: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Self {
        let mut request = Self::limit(symbol, side, amount, limit_price);
        request.kind = OrderKind::StopLimit;
        request.stop_price = Some(stop_price);
        request
    }

    /// Set leverage.
    pub fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = leverage;
        self
    }
}

// =============================================================================
// Fill Types
// =============================================================================

/// Immutable record of an executed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    /// Unique fill ID
    pub id: String,
    /// Order that produced this fill
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub amount: Decimal,
    /// Execution price
    pub fill_price: Decimal,
    /// `amount * fill_price`
    pub total: Decimal,
    pub leverage: u32,
    /// Margin locked by this fill (zero for sells)
    pub margin_locked: Decimal,
    /// When the fill happened (ms)
    pub timestamp: i64,
}

impl Fill {
    /// Create a fill record for `order` executed at `fill_price` for `total`.
    pub fn new(
        order: &Order,
        fill_price: Decimal,
        total: Decimal,
        margin_locked: Decimal,
        timestamp: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            amount: order.amount,
            fill_price,
            total,
            leverage: order.leverage,
            margin_locked,
            timestamp,
        }
    }
}

/// Result of placing an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Placement {
    /// Limit or stop-limit order now resting in the book
    Resting { order: Order },
    /// Market order executed on placement
    Filled { order: Order, fill: Fill },
}

impl Placement {
    /// The placed order, whatever its outcome.
    pub fn order(&self) -> &Order {
        match self {
            Placement::Resting { order } | Placement::Filled { order, .. } => order,
        }
    }

    /// The fill, if the order executed immediately.
    pub fn fill(&self) -> Option<&Fill> {
        match self {
            Placement::Resting { .. } => None,
            Placement::Filled { fill, .. } => Some(fill),
        }
    }
}

/// An order whose trigger fired but whose execution the ledger refused.
/// The order stays open; this is surfaced to the user as a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRejection {
    pub order_id: String,
    pub reason: String,
}
