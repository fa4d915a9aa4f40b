//! Market Simulator
//!
//! One simulation session: the current price, the order book, the ledger and
//! the rolling candle history. Every mutation goes through `&mut self`, so
//! whoever owns the simulator is its only writer. `SimulationClock` runs it
//! inside a task; tests drive it directly.

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::services::candles::CandleHistory;
use crate::services::ledger::Ledger;
use crate::services::order_book::{validate_order, OrderBook, OrderRules};
use crate::services::positions::{PermissiveTracker, PositionTracker};
use crate::services::price_generator::{PriceGenerator, RandomWalkGenerator};
use crate::services::trigger;
use crate::types::{
    Account, Candle, Fill, FillRejection, MarketSummary, Order, OrderKind, Placement,
    PlaceOrderRequest, PriceTick, SessionState, TickSnapshot,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

pub struct MarketSimulator {
    symbol: String,
    price: Decimal,
    session_open: Decimal,
    seq: u64,
    generator: Box<dyn PriceGenerator>,
    book: OrderBook,
    ledger: Ledger,
    history: CandleHistory,
    fills: Vec<Fill>,
    rules: OrderRules,
}

impl MarketSimulator {
    pub fn new(
        config: &SimulationConfig,
        generator: Box<dyn PriceGenerator>,
        positions: Box<dyn PositionTracker>,
    ) -> Self {
        info!(
            "New {} session at {} with balance {}",
            config.symbol, config.start_price, config.starting_balance
        );

        Self {
            symbol: config.symbol.clone(),
            price: config.start_price,
            session_open: config.start_price,
            seq: 0,
            generator,
            book: OrderBook::new(),
            ledger: Ledger::with_tracker(config.starting_balance, positions),
            history: CandleHistory::new(config.history_len, config.ticks_per_candle),
            fills: Vec::new(),
            rules: OrderRules {
                symbol: config.symbol.clone(),
                max_leverage: config.max_leverage,
            },
        }
    }

    /// Random-walk session with the permissive position tracker.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let generator = match config.seed {
            Some(seed) => RandomWalkGenerator::with_seed(seed, config.volatility, config.max_drift),
            None => RandomWalkGenerator::new(config.volatility, config.max_drift),
        };
        Self::new(config, Box::new(generator), Box::new(PermissiveTracker::new()))
    }

    /// Validate and admit an order.
    ///
    /// Market orders execute immediately at the current price and never rest.
    /// Limit and stop-limit orders rest in the book until a tick triggers them.
    pub fn place_order(&mut self, request: PlaceOrderRequest, at: i64) -> Result<Placement> {
        validate_order(&request, &self.rules, self.ledger.account(), self.price)?;

        let mut order = Order::from_request(&request, at);
        order.symbol = self.symbol.clone();

        if order.kind != OrderKind::Market {
            self.book.insert(order.clone());
            return Ok(Placement::Resting { order });
        }

        let fill = self.ledger.execute(&order, self.price, at)?;
        order.mark_filled(self.price, at);
        self.book.insert(order.clone());
        self.fills.push(fill.clone());

        Ok(Placement::Filled { order, fill })
    }

    /// Cancel an open order. Unknown and terminal ids are `OrderNotFound`.
    pub fn cancel_order(&mut self, order_id: &str, at: i64) -> Result<Order> {
        self.book.cancel(order_id, at)
    }

    /// Advance one tick using the price generator.
    pub fn tick(&mut self, at: i64) -> TickSnapshot {
        let next = self.generator.next_price(&self.symbol, self.price);
        self.apply_price(next, at)
    }

    /// Advance one tick at an explicit price.
    ///
    /// Orders are evaluated in placement order against the new price. A
    /// triggered order the ledger refuses stays open and is reported in
    /// `rejections`; it is evaluated again on the next tick.
    pub fn apply_price(&mut self, price: Decimal, at: i64) -> TickSnapshot {
        self.seq += 1;
        self.price = price;

        let tick = PriceTick {
            seq: self.seq,
            price,
            time: at,
        };
        let candle = self.history.push(tick);

        let mut new_fills = Vec::new();
        let mut rejections = Vec::new();

        for triggered in trigger::scan(self.book.open(), price) {
            let Some(order) = self.book.get(&triggered.order_id).cloned() else {
                continue;
            };

            match self.ledger.execute(&order, triggered.exec_price, at) {
                Ok(fill) => {
                    let filled = self.book.mark_filled(&order.id, triggered.exec_price, at);
                    debug_assert!(filled.is_some(), "filled order {} not open in book", order.id);
                    self.fills.push(fill.clone());
                    new_fills.push(fill);
                }
                Err(e) => {
                    warn!("Order {} triggered at {} but was not filled: {}", order.id, price, e);
                    rejections.push(FillRejection {
                        order_id: order.id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "Tick {} {} @ {}: {} filled, {} rejected, {} open",
            self.seq,
            self.symbol,
            price,
            new_fills.len(),
            rejections.len(),
            self.book.open_count()
        );

        TickSnapshot {
            symbol: self.symbol.clone(),
            tick,
            candle: Some(candle),
            summary: self.summary(),
            account: self.ledger.account().clone(),
            open_orders: self.open_orders(),
            new_fills,
            rejections,
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            symbol: self.symbol.clone(),
            price: self.price,
            ticks: self.seq,
            summary: self.summary(),
            account: self.ledger.account().clone(),
            open_orders: self.open_orders(),
            candles: self.history.candles(),
            fills: self.fills.clone(),
        }
    }

    pub fn summary(&self) -> MarketSummary {
        MarketSummary::new(self.session_open, self.price)
    }

    pub fn account(&self) -> &Account {
        self.ledger.account()
    }

    /// Open orders in placement order.
    pub fn open_orders(&self) -> Vec<Order> {
        self.book.open().cloned().collect()
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.book.get(order_id)
    }

    /// Filled and canceled orders, newest first.
    pub fn order_history(&self, limit: usize, offset: usize) -> Vec<Order> {
        self.book.history(limit, offset)
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn candles(&self) -> Vec<Candle> {
        self.history.candles()
    }

    pub fn current_price(&self) -> Decimal {
        self.price
    }

    /// Ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.seq
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Net amount bought minus sold for the session symbol.
    pub fn net_position(&self) -> Decimal {
        self.ledger.net_position(&self.symbol)
    }
}

impl std::fmt::Debug for MarketSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketSimulator")
            .field("symbol", &self.symbol)
            .field("price", &self.price)
            .field("seq", &self.seq)
            .field("ledger", &self.ledger)
            .field("open_orders", &self.book.open_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TradingError;
    use crate::services::price_generator::ReplayGenerator;
    use crate::types::{OrderSide, OrderStatus};
    use rust_decimal_macros::dec;

    fn simulator(balance: Decimal, prices: Vec<Decimal>) -> MarketSimulator {
        let config = SimulationConfig::default()
            .with_balance(balance)
            .with_start_price(dec!(1.0850));
        MarketSimulator::new(
            &config,
            Box::new(ReplayGenerator::new(prices)),
            Box::new(PermissiveTracker::new()),
        )
    }

    #[test]
    fn test_market_order_fills_at_current_price() {
        let mut sim = simulator(dec!(10000), vec![]);
        let placement = sim
            .place_order(PlaceOrderRequest::market("EUR/USD", OrderSide::Buy, dec!(1000)), 1)
            .unwrap();

        let fill = placement.fill().unwrap();
        assert_eq!(fill.fill_price, dec!(1.0850));
        assert_eq!(placement.order().status, OrderStatus::Filled);
        assert_eq!(sim.account().balance, dec!(8915));
        assert!(sim.open_orders().is_empty());
        assert_eq!(sim.order_history(10, 0).len(), 1);
    }

    #[test]
    fn test_limit_order_rests_until_triggered() {
        let mut sim = simulator(dec!(10000), vec![dec!(1.0850), dec!(1.0820), dec!(1.0795)]);
        let placement = sim
            .place_order(
                PlaceOrderRequest::limit("EUR/USD", OrderSide::Buy, dec!(1000), dec!(1.0800)),
                0,
            )
            .unwrap();
        let id = placement.order().id.clone();

        assert!(sim.tick(1).new_fills.is_empty());
        assert!(sim.tick(2).new_fills.is_empty());
        let snapshot = sim.tick(3);

        assert_eq!(snapshot.tick.seq, 3);
        assert_eq!(snapshot.new_fills.len(), 1);
        assert_eq!(snapshot.new_fills[0].fill_price, dec!(1.0800));
        assert_eq!(snapshot.account.balance, dec!(8920));
        assert_eq!(snapshot.account.margin_used, dec!(1080));
        assert_eq!(snapshot.account.free_margin, dec!(7840));
        assert_eq!(sim.order(&id).map(|o| o.status), Some(OrderStatus::Filled));
    }

    #[test]
    fn test_rejected_fill_stays_open() {
        let mut sim = simulator(dec!(1100), vec![dec!(1.0700)]);
        let first = sim
            .place_order(
                PlaceOrderRequest::limit("EUR/USD", OrderSide::Buy, dec!(1000), dec!(1.08)),
                0,
            )
            .unwrap();
        let second = sim
            .place_order(
                PlaceOrderRequest::limit("EUR/USD", OrderSide::Buy, dec!(1000), dec!(1.08)),
                0,
            )
            .unwrap();

        let snapshot = sim.tick(1);

        assert_eq!(snapshot.new_fills.len(), 1);
        assert_eq!(snapshot.new_fills[0].order_id, first.order().id);
        assert_eq!(snapshot.rejections.len(), 1);
        assert_eq!(snapshot.rejections[0].order_id, second.order().id);
        assert_eq!(snapshot.open_orders.len(), 1);
        assert_eq!(snapshot.account.balance, dec!(20));
    }

    #[test]
    fn test_cancel_then_tick_does_not_fill() {
        let mut sim = simulator(dec!(10000), vec![dec!(1.0700)]);
        let placement = sim
            .place_order(
                PlaceOrderRequest::limit("EUR/USD", OrderSide::Buy, dec!(1000), dec!(1.08)),
                0,
            )
            .unwrap();
        let id = placement.order().id.clone();

        sim.cancel_order(&id, 1).unwrap();
        let snapshot = sim.tick(2);

        assert!(snapshot.new_fills.is_empty());
        assert_eq!(snapshot.account.balance, dec!(10000));
        assert_eq!(sim.order(&id).map(|o| o.status), Some(OrderStatus::Canceled));
        assert_eq!(sim.cancel_order(&id, 3), Err(TradingError::OrderNotFound(id)));
    }

    #[test]
    fn test_state_reflects_session() {
        let mut sim = simulator(dec!(10000), vec![dec!(1.0900), dec!(1.0800)]);
        sim.tick(1);
        sim.tick(2);

        let state = sim.state();
        assert_eq!(state.ticks, 2);
        assert_eq!(state.price, dec!(1.0800));
        assert_eq!(state.candles.len(), 2);
        assert_eq!(state.candles[0].open, dec!(1.0900));
        assert_eq!(state.candles[1].open, dec!(1.0900));
        assert_eq!(state.summary.session_open, dec!(1.0850));
    }
}
