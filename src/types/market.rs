//! Market Types
//!
//! Currency pair metadata, price ticks, candles and per-tick snapshots.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::trading::{Account, Fill, FillRejection, Order};

/// Static metadata for a currency pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSpec {
    /// Typical quote used to seed a session
    pub base_price: Decimal,
    /// Conventional number of decimal places
    pub decimals: u32,
    /// Multiplier applied to the base volatility
    pub volatility_multiplier: f64,
}

/// (symbol, base price) for the pairs the simulator knows about.
pub const KNOWN_PAIRS: &[(&str, Decimal)] = &[
    ("EUR/USD", dec!(1.0850)),
    ("GBP/USD", dec!(1.2650)),
    ("USD/JPY", dec!(145.80)),
    ("AUD/USD", dec!(0.6750)),
    ("USD/CAD", dec!(1.3570)),
    ("NZD/USD", dec!(0.6150)),
    ("USD/CHF", dec!(0.8950)),
    ("EUR/GBP", dec!(0.8550)),
    ("EUR/JPY", dec!(158.20)),
    ("GBP/JPY", dec!(184.40)),
];

impl PairSpec {
    /// Look up metadata for `symbol`. Unknown pairs quote around 1.0000.
    pub fn for_symbol(symbol: &str) -> Self {
        let upper = symbol.to_uppercase();
        let base_price = KNOWN_PAIRS
            .iter()
            .find(|(s, _)| *s == upper)
            .map(|(_, p)| *p)
            .unwrap_or(dec!(1.0000));

        // JPY pairs quote with fewer fractional digits and move in larger steps
        let (decimals, volatility_multiplier) = if upper.contains("JPY") {
            (3, 2.0)
        } else if upper.contains("GBP") {
            (4, 1.5)
        } else {
            (4, 1.0)
        };

        Self {
            base_price,
            decimals,
            volatility_multiplier,
        }
    }

    /// Smallest representable price increment.
    pub fn tick_size(&self) -> Decimal {
        Decimal::new(1, self.decimals)
    }
}

/// A single price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTick {
    /// Sequence number within the session, starting at 1
    pub seq: u64,
    pub price: Decimal,
    /// Timestamp (ms)
    pub time: i64,
}

/// OHLC bar synthesized from ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time (ms)
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Candle {
    /// Open a new bar at `open` and immediately apply `price`.
    pub fn new(time: i64, open: Decimal, price: Decimal) -> Self {
        Self {
            time,
            open,
            high: open.max(price),
            low: open.min(price),
            close: price,
        }
    }

    /// Fold another price into the bar.
    pub fn update(&mut self, price: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }
}

/// Direction of the session so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
}

/// Session-level price summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    /// Price when the session started
    pub session_open: Decimal,
    /// Change since the session open, in percent (2 dp)
    pub change_pct: Decimal,
    pub trend: Trend,
}

impl MarketSummary {
    pub fn new(session_open: Decimal, price: Decimal) -> Self {
        let change_pct = price
            .checked_sub(session_open)
            .and_then(|diff| diff.checked_div(session_open))
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .map(|pct| pct.round_dp(2))
            .unwrap_or(Decimal::ZERO);
        let trend = if change_pct >= Decimal::ZERO {
            Trend::Bullish
        } else {
            Trend::Bearish
        };

        Self {
            session_open,
            change_pct,
            trend,
        }
    }
}

/// State published to subscribers after each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSnapshot {
    pub symbol: String,
    pub tick: PriceTick,
    /// Bar the tick was folded into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candle: Option<Candle>,
    pub summary: MarketSummary,
    pub account: Account,
    /// Orders still resting after this tick, in placement order
    pub open_orders: Vec<Order>,
    /// Fills produced by this tick
    pub new_fills: Vec<Fill>,
    /// Triggered orders the ledger refused; they remain open
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<FillRejection>,
}

/// Point-in-time view of a session, available between ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub symbol: String,
    pub price: Decimal,
    /// Ticks processed so far
    pub ticks: u64,
    pub summary: MarketSummary,
    pub account: Account,
    pub open_orders: Vec<Order>,
    pub candles: Vec<Candle>,
    /// Every fill of the session, oldest first
    pub fills: Vec<Fill>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_spec_jpy() {
        let spec = PairSpec::for_symbol("USD/JPY");
        assert_eq!(spec.base_price, dec!(145.80));
        assert_eq!(spec.decimals, 3);
        assert_eq!(spec.tick_size(), dec!(0.001));
        assert_eq!(spec.volatility_multiplier, 2.0);
    }

    #[test]
    fn test_pair_spec_unknown_defaults() {
        let spec = PairSpec::for_symbol("XAU/XAG");
        assert_eq!(spec.base_price, dec!(1.0000));
        assert_eq!(spec.decimals, 4);
    }

    #[test]
    fn test_candle_tracks_extremes() {
        let mut candle = Candle::new(0, dec!(1.0850), dec!(1.0860));
        candle.update(dec!(1.0840));
        candle.update(dec!(1.0855));

        assert_eq!(candle.open, dec!(1.0850));
        assert_eq!(candle.high, dec!(1.0860));
        assert_eq!(candle.low, dec!(1.0840));
        assert_eq!(candle.close, dec!(1.0855));
    }

    #[test]
    fn test_market_summary_trend() {
        let up = MarketSummary::new(dec!(1.0000), dec!(1.0100));
        assert_eq!(up.change_pct, dec!(1.00));
        assert_eq!(up.trend, Trend::Bullish);

        let down = MarketSummary::new(dec!(1.0000), dec!(0.9950));
        assert_eq!(down.change_pct, dec!(-0.50));
        assert_eq!(down.trend, Trend::Bearish);
    }

    #[test]
    fn test_market_summary_unrepresentable_change_is_zero() {
        assert_eq!(MarketSummary::new(Decimal::ZERO, dec!(1.08)).change_pct, Decimal::ZERO);
        assert_eq!(
            MarketSummary::new(dec!(0.0001), Decimal::MAX).change_pct,
            Decimal::ZERO
        );
    }
}
