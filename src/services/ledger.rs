//! Ledger
//!
//! Applies the monetary effect of fills to the session account.
//!
//! - Buy: `balance -= total`, `margin_used += total * leverage`. Refused with
//!   `InsufficientFunds` when `total > balance`, so a fill can never take the
//!   balance negative.
//! - Sell: `balance += total`. Whether the account actually held anything to
//!   sell is left to the `PositionTracker`.
//!
//! Every check runs before the first mutation, so an execution either applies
//! in full or leaves the account untouched. Arithmetic that would overflow is
//! refused with `AmountTooLarge`.

use crate::error::{Result, TradingError, ValidationError};
use crate::services::positions::{PermissiveTracker, PositionTracker};
use crate::types::{Account, Fill, Order, OrderSide};
use rust_decimal::Decimal;
use tracing::info;

pub struct Ledger {
    account: Account,
    positions: Box<dyn PositionTracker>,
}

impl Ledger {
    /// Ledger with the permissive position tracker.
    pub fn new(starting_balance: Decimal) -> Self {
        Self::with_tracker(starting_balance, Box::new(PermissiveTracker::new()))
    }

    pub fn with_tracker(starting_balance: Decimal, positions: Box<dyn PositionTracker>) -> Self {
        Self {
            account: Account::new(starting_balance),
            positions,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn net_position(&self, symbol: &str) -> Decimal {
        self.positions.net_position(symbol)
    }

    /// Execute `order` at `exec_price`. The caller owns the order's status
    /// transition; on error nothing here has changed.
    pub fn execute(&mut self, order: &Order, exec_price: Decimal, at: i64) -> Result<Fill> {
        let total = order
            .notional(exec_price)
            .ok_or(ValidationError::AmountTooLarge)?;
        self.positions.check(order)?;

        let (balance, margin_used, margin_locked) = match order.side {
            OrderSide::Buy => {
                if total > self.account.balance {
                    return Err(TradingError::InsufficientFunds {
                        needed: total,
                        available: self.account.balance,
                    });
                }
                let margin = total
                    .checked_mul(Decimal::from(order.leverage))
                    .ok_or(ValidationError::AmountTooLarge)?;
                let margin_used = self
                    .account
                    .margin_used
                    .checked_add(margin)
                    .ok_or(ValidationError::AmountTooLarge)?;
                (self.account.balance - total, margin_used, margin)
            }
            OrderSide::Sell => {
                let balance = self
                    .account
                    .balance
                    .checked_add(total)
                    .ok_or(ValidationError::AmountTooLarge)?;
                (balance, self.account.margin_used, Decimal::ZERO)
            }
        };

        self.account.balance = balance;
        self.account.margin_used = margin_used;
        self.account.recalculate();

        let fill = Fill::new(order, exec_price, total, margin_locked, at);
        self.positions.record(&fill);

        info!(
            "Filled {} {} {} @ {} (total {}, balance {}, free margin {})",
            order.side,
            order.amount,
            order.symbol,
            exec_price,
            total,
            self.account.balance,
            self.account.free_margin
        );

        Ok(fill)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::positions::HoldingsTracker;
    use crate::types::PlaceOrderRequest;
    use rust_decimal_macros::dec;

    fn order(side: OrderSide, amount: Decimal, leverage: u32) -> Order {
        Order::from_request(
            &PlaceOrderRequest::limit("EUR/USD", side, amount, dec!(1.08)).with_leverage(leverage),
            0,
        )
    }

    fn assert_free_margin_invariant(account: &Account) {
        assert_eq!(account.free_margin, account.balance - account.margin_used);
    }

    #[test]
    fn test_buy_debits_balance_and_locks_margin() {
        let mut ledger = Ledger::new(dec!(10000));
        let fill = ledger.execute(&order(OrderSide::Buy, dec!(1000), 1), dec!(1.0800), 1).unwrap();

        assert_eq!(fill.total, dec!(1080));
        assert_eq!(fill.fill_price, dec!(1.0800));
        let account = ledger.account();
        assert_eq!(account.balance, dec!(8920));
        assert_eq!(account.margin_used, dec!(1080));
        assert_eq!(account.free_margin, dec!(7840));
        assert_free_margin_invariant(account);
    }

    #[test]
    fn test_leverage_scales_margin() {
        let mut ledger = Ledger::new(dec!(10000));
        let fill = ledger.execute(&order(OrderSide::Buy, dec!(1000), 10), dec!(1.08), 1).unwrap();

        assert_eq!(fill.margin_locked, dec!(10800));
        assert_eq!(ledger.account().balance, dec!(8920));
        assert_eq!(ledger.account().free_margin, dec!(-1880));
        assert_free_margin_invariant(ledger.account());
    }

    #[test]
    fn test_buy_exceeding_balance_leaves_account_untouched() {
        let mut ledger = Ledger::new(dec!(500));
        let before = ledger.account().clone();

        let result = ledger.execute(&order(OrderSide::Buy, dec!(1000), 1), dec!(1.08), 1);

        assert_eq!(
            result,
            Err(TradingError::InsufficientFunds {
                needed: dec!(1080),
                available: dec!(500)
            })
        );
        assert_eq!(ledger.account(), &before);
    }

    #[test]
    fn test_buy_of_exact_balance_allowed() {
        let mut ledger = Ledger::new(dec!(1080));
        ledger.execute(&order(OrderSide::Buy, dec!(1000), 1), dec!(1.08), 1).unwrap();

        assert_eq!(ledger.account().balance, Decimal::ZERO);
    }

    #[test]
    fn test_sell_credits_balance() {
        let mut ledger = Ledger::new(dec!(100));
        let fill = ledger.execute(&order(OrderSide::Sell, dec!(1000), 5), dec!(1.09), 1).unwrap();

        assert_eq!(fill.margin_locked, Decimal::ZERO);
        assert_eq!(ledger.account().balance, dec!(1190));
        assert_eq!(ledger.account().margin_used, Decimal::ZERO);
        assert_eq!(ledger.net_position("EUR/USD"), dec!(-1000));
        assert_free_margin_invariant(ledger.account());
    }

    #[test]
    fn test_credit_overflow_rejected_without_mutation() {
        let mut ledger = Ledger::new(Decimal::MAX);
        let before = ledger.account().clone();

        let result = ledger.execute(&order(OrderSide::Sell, dec!(1), 1), dec!(2), 1);

        assert_eq!(
            result,
            Err(TradingError::Validation(ValidationError::AmountTooLarge))
        );
        assert_eq!(ledger.account(), &before);
        assert_eq!(ledger.net_position("EUR/USD"), Decimal::ZERO);
    }

    #[test]
    fn test_notional_overflow_rejected() {
        let mut ledger = Ledger::new(dec!(10000));

        let result = ledger.execute(&order(OrderSide::Sell, Decimal::MAX, 1), dec!(2), 1);

        assert_eq!(
            result,
            Err(TradingError::Validation(ValidationError::AmountTooLarge))
        );
        assert_eq!(ledger.account().balance, dec!(10000));
    }

    #[test]
    fn test_holdings_tracker_blocks_naked_sell() {
        let mut ledger = Ledger::with_tracker(dec!(100), Box::new(HoldingsTracker::new()));
        let before = ledger.account().clone();

        let result = ledger.execute(&order(OrderSide::Sell, dec!(10), 1), dec!(1.09), 1);

        assert!(matches!(result, Err(TradingError::InsufficientHoldings { .. })));
        assert_eq!(ledger.account(), &before);
    }
}
