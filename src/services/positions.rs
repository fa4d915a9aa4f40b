//! Position Tracking
//!
//! Seam between the ledger and whatever notion of inventory a session uses.
//! The simulator has no holdings model: a sell always credits cash and is
//! never checked against a prior buy. `PermissiveTracker` keeps that
//! behavior; `HoldingsTracker` refuses sells larger than the net amount
//! bought so far.

use crate::error::{Result, TradingError};
use crate::types::{Fill, Order, OrderSide};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Inventory checks applied by the ledger around every execution.
pub trait PositionTracker: Send {
    /// Called before the ledger mutates the account. An error aborts the fill.
    fn check(&self, order: &Order) -> Result<()>;

    /// Called once a fill has been applied.
    fn record(&mut self, fill: &Fill);

    /// Net amount bought minus sold for `symbol`.
    fn net_position(&self, symbol: &str) -> Decimal;
}

#[derive(Debug, Clone, Default)]
struct NetPositions(HashMap<String, Decimal>);

impl NetPositions {
    fn apply(&mut self, fill: &Fill) {
        let entry = self.0.entry(fill.symbol.to_uppercase()).or_insert(Decimal::ZERO);
        match fill.side {
            OrderSide::Buy => *entry += fill.amount,
            OrderSide::Sell => *entry -= fill.amount,
        }
    }

    fn get(&self, symbol: &str) -> Decimal {
        self.0
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Accepts every order. Sells may take the net position negative.
#[derive(Debug, Clone, Default)]
pub struct PermissiveTracker {
    net: NetPositions,
}

impl PermissiveTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PositionTracker for PermissiveTracker {
    fn check(&self, _order: &Order) -> Result<()> {
        Ok(())
    }

    fn record(&mut self, fill: &Fill) {
        self.net.apply(fill);
    }

    fn net_position(&self, symbol: &str) -> Decimal {
        self.net.get(symbol)
    }
}

/// Rejects sells that exceed the net amount held.
#[derive(Debug, Clone, Default)]
pub struct HoldingsTracker {
    net: NetPositions,
}

impl HoldingsTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PositionTracker for HoldingsTracker {
    fn check(&self, order: &Order) -> Result<()> {
        if order.side == OrderSide::Buy {
            return Ok(());
        }

        let available = self.net.get(&order.symbol);
        if order.amount > available {
            return Err(TradingError::InsufficientHoldings {
                symbol: order.symbol.clone(),
                needed: order.amount,
                available,
            });
        }
        Ok(())
    }

    fn record(&mut self, fill: &Fill) {
        self.net.apply(fill);
    }

    fn net_position(&self, symbol: &str) -> Decimal {
        self.net.get(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlaceOrderRequest;
    use rust_decimal_macros::dec;

    fn filled(side: OrderSide, amount: Decimal) -> (Order, Fill) {
        let order = Order::from_request(&PlaceOrderRequest::market("EUR/USD", side, amount), 0);
        let fill = Fill::new(&order, dec!(1.08), amount * dec!(1.08), Decimal::ZERO, 0);
        (order, fill)
    }

    #[test]
    fn test_permissive_allows_naked_sell() {
        let mut tracker = PermissiveTracker::new();
        let (order, fill) = filled(OrderSide::Sell, dec!(500));

        assert!(tracker.check(&order).is_ok());
        tracker.record(&fill);
        assert_eq!(tracker.net_position("eur/usd"), dec!(-500));
    }

    #[test]
    fn test_holdings_limits_sells_to_net_bought() {
        let mut tracker = HoldingsTracker::new();
        let (_, bought) = filled(OrderSide::Buy, dec!(300));
        tracker.record(&bought);

        let (ok_sell, _) = filled(OrderSide::Sell, dec!(300));
        assert!(tracker.check(&ok_sell).is_ok());

        let (too_big, _) = filled(OrderSide::Sell, dec!(301));
        assert_eq!(
            tracker.check(&too_big),
            Err(TradingError::InsufficientHoldings {
                symbol: "EUR/USD".to_string(),
                needed: dec!(301),
                available: dec!(300),
            })
        );
    }
}
