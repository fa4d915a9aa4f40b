//! Trigger Evaluation
//!
//! Decides which open orders fire at a given price and what they execute at.

use crate::types::{Order, OrderKind, OrderSide};
use rust_decimal::Decimal;

/// An open order whose trigger condition holds at the current price.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredOrder {
    pub order_id: String,
    pub exec_price: Decimal,
}

/// Execution price for `order` if it fires at `price`.
///
/// | kind       | side | fires when      | executes at |
/// |------------|------|-----------------|-------------|
/// | limit      | buy  | price <= limit  | limit       |
/// | limit      | sell | price >= limit  | limit       |
/// | stop_limit | buy  | price >= stop   | limit       |
/// | stop_limit | sell | price <= stop   | limit       |
///
/// Market orders never rest, so they never trigger here.
pub fn trigger_price(order: &Order, price: Decimal) -> Option<Decimal> {
    if !order.is_open() {
        return None;
    }

    let limit = order.limit_price?;
    let fires = match order.kind {
        OrderKind::Market => false,
        OrderKind::Limit => match order.side {
            OrderSide::Buy => price <= limit,
            OrderSide::Sell => price >= limit,
        },
        OrderKind::StopLimit => {
            let stop = order.stop_price?;
            match order.side {
                OrderSide::Buy => price >= stop,
                OrderSide::Sell => price <= stop,
            }
        }
    };

    fires.then_some(limit)
}

/// Scan orders in placement order and collect the ones that fire.
pub fn scan<'a>(orders: impl IntoIterator<Item = &'a Order>, price: Decimal) -> Vec<TriggeredOrder> {
    orders
        .into_iter()
        .filter_map(|order| {
            trigger_price(order, price).map(|exec_price| TriggeredOrder {
                order_id: order.id.clone(),
                exec_price,
            })
        })
        .collect()
}
