//! Price Generators
//!
//! Produces the next synthetic quote for a currency pair on every tick.
//! The random walk is the default source; a replay generator feeds fixed
//! sequences for deterministic sessions and tests. A live feed can be
//! plugged in through the same trait.

use crate::types::PairSpec;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Source of the next price for a symbol.
pub trait PriceGenerator: Send {
    /// Return the price following `previous` for `symbol`.
    fn next_price(&mut self, symbol: &str, previous: Decimal) -> Decimal;
}

/// Share of the volatility added as a directional bias each step.
const TREND_BIAS: f64 = 0.3;

/// Largest accepted base volatility (a 100% move per tick).
const MAX_VOLATILITY: f64 = 1.0;

/// Bounded random walk.
///
/// Each step draws a relative change uniformly from `[-v, v]` and adds a
/// bias of `±0.3 v`, where `v` is the base volatility scaled by the pair's
/// multiplier. The result is clamped to `max_drift` around the first price
/// seen for the symbol and rounded to the pair's conventional decimals.
pub struct RandomWalkGenerator {
    rng: StdRng,
    volatility: f64,
    max_drift: Decimal,
    anchors: HashMap<String, Decimal>,
}

impl RandomWalkGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new(volatility: f64, max_drift: Decimal) -> Self {
        Self::with_rng(StdRng::from_entropy(), volatility, max_drift)
    }

    /// Create a reproducible generator.
    pub fn with_seed(seed: u64, volatility: f64, max_drift: Decimal) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), volatility, max_drift)
    }

    /// Non-finite volatility is treated as zero; larger values are capped.
    fn with_rng(rng: StdRng, volatility: f64, max_drift: Decimal) -> Self {
        let volatility = if volatility.is_finite() {
            volatility.abs().min(MAX_VOLATILITY)
        } else {
            0.0
        };

        Self {
            rng,
            volatility,
            max_drift: max_drift.abs(),
            anchors: HashMap::new(),
        }
    }

    fn step(&mut self, spec: &PairSpec) -> Decimal {
        let v = self.volatility * spec.volatility_multiplier;
        let direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let change = self.rng.gen_range(-v..=v) + direction * v * TREND_BIAS;
        Decimal::from_f64(change).unwrap_or(Decimal::ZERO)
    }
}

impl PriceGenerator for RandomWalkGenerator {
    fn next_price(&mut self, symbol: &str, previous: Decimal) -> Decimal {
        let spec = PairSpec::for_symbol(symbol);
        let anchor = *self
            .anchors
            .entry(symbol.to_string())
            .or_insert(previous);

        let step = self.step(&spec);
        let raw = previous
            .checked_mul(Decimal::ONE + step)
            .unwrap_or(previous);
        let lower = anchor
            .checked_mul(Decimal::ONE - self.max_drift)
            .unwrap_or(Decimal::ZERO);
        let upper = Decimal::ONE
            .checked_add(self.max_drift)
            .and_then(|factor| anchor.checked_mul(factor))
            .unwrap_or(Decimal::MAX);

        let price = raw
            .max(lower)
            .min(upper)
            .round_dp_with_strategy(spec.decimals, RoundingStrategy::MidpointAwayFromZero)
            .max(spec.tick_size());

        debug!("{} {} -> {}", symbol, previous, price);
        price
    }
}

/// Replays a fixed sequence of prices, then holds the last one.
#[derive(Debug, Clone, Default)]
pub struct ReplayGenerator {
    prices: VecDeque<Decimal>,
}

impl ReplayGenerator {
    pub fn new(prices: impl IntoIterator<Item = Decimal>) -> Self {
        Self {
            prices: prices.into_iter().collect(),
        }
    }

    /// Queue more prices behind the remaining ones.
    pub fn extend(&mut self, prices: impl IntoIterator<Item = Decimal>) {
        self.prices.extend(prices);
    }

    /// Number of prices not yet replayed.
    pub fn remaining(&self) -> usize {
        self.prices.len()
    }
}

impl PriceGenerator for ReplayGenerator {
    fn next_price(&mut self, _symbol: &str, previous: Decimal) -> Decimal {
        self.prices.pop_front().unwrap_or(previous)
    }
}
