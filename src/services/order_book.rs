//! Order Book
//!
//! Holds every order placed during the session in placement order. Open
//! orders are the ones the trigger evaluator scans; terminal orders stay
//! behind as history.

use crate::error::{Result, TradingError, ValidationError};
use crate::types::{Account, Order, OrderKind, OrderSide, PlaceOrderRequest};
use rust_decimal::Decimal;
use tracing::info;

/// Parameters checked before an order is admitted.
#[derive(Debug, Clone)]
pub struct OrderRules {
    /// Symbol the session simulates
    pub symbol: String,
    /// Highest accepted leverage
    pub max_leverage: u32,
}

/// Validate a placement request against the account.
///
/// `market_price` sizes the funds check for market orders; limit and
/// stop-limit orders are sized at their limit price. Orders whose notional or
/// margin cannot be represented are refused on either side.
pub fn validate_order(
    request: &PlaceOrderRequest,
    rules: &OrderRules,
    account: &Account,
    market_price: Decimal,
) -> Result<()> {
    if !request.symbol.eq_ignore_ascii_case(&rules.symbol) {
        return Err(ValidationError::SymbolMismatch {
            expected: rules.symbol.clone(),
            got: request.symbol.clone(),
        }
        .into());
    }

    if request.amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidAmount.into());
    }

    if request.leverage < 1 {
        return Err(ValidationError::InvalidLeverage.into());
    }
    if request.leverage > rules.max_leverage {
        return Err(ValidationError::LeverageExceeded {
            requested: request.leverage,
            max: rules.max_leverage,
        }
        .into());
    }

    match request.kind {
        OrderKind::Market => {}
        OrderKind::Limit => {
            require_positive(request.limit_price, ValidationError::InvalidPrice)?;
        }
        OrderKind::StopLimit => {
            require_positive(request.limit_price, ValidationError::InvalidPrice)?;
            require_positive(request.stop_price, ValidationError::InvalidStopPrice)?;
        }
    }

    let reference = match request.kind {
        OrderKind::Market => market_price,
        OrderKind::Limit | OrderKind::StopLimit => request.limit_price.unwrap_or(market_price),
    };
    let needed = request
        .amount
        .checked_mul(reference)
        .ok_or(ValidationError::AmountTooLarge)?;
    needed
        .checked_mul(Decimal::from(request.leverage))
        .ok_or(ValidationError::AmountTooLarge)?;

    if request.side == OrderSide::Buy && needed > account.balance {
        return Err(TradingError::InsufficientFunds {
            needed,
            available: account.balance,
        });
    }

    Ok(())
}

fn require_positive(price: Option<Decimal>, error: ValidationError) -> Result<()> {
    match price {
        Some(p) if p > Decimal::ZERO => Ok(()),
        _ => Err(error.into()),
    }
}

/// Orders placed during a session.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: Vec<Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an already-validated order.
    pub fn insert(&mut self, order: Order) {
        info!(
            "Placed {} {} order {} for {} {}",
            order.kind, order.side, order.id, order.amount, order.symbol
        );
        self.orders.push(order);
    }

    /// Cancel an open order. Unknown and terminal ids are `OrderNotFound`.
    pub fn cancel(&mut self, order_id: &str, at: i64) -> Result<Order> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.is_open())
            .ok_or_else(|| TradingError::OrderNotFound(order_id.to_string()))?;

        order.mark_canceled(at);
        info!("Canceled order {}", order_id);
        Ok(order.clone())
    }

    /// Mark an open order filled. Returns the updated order.
    pub fn mark_filled(&mut self, order_id: &str, fill_price: Decimal, at: i64) -> Option<Order> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id && o.is_open())?;
        order.mark_filled(fill_price, at);
        Some(order.clone())
    }

    /// Look up an order by id.
    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == order_id)
    }

    /// Every order in placement order.
    pub fn all(&self) -> &[Order] {
        &self.orders
    }

    /// Open orders in placement order.
    pub fn open(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open().count()
    }

    /// Terminal orders, newest first, paged by `offset` and `limit`.
    pub fn history(&self, limit: usize, offset: usize) -> Vec<Order> {
        self.orders
            .iter()
            .rev()
            .filter(|o| o.is_terminal())
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
