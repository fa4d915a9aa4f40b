//! Candle History
//!
//! Rolling tick history and the OHLC bars synthesized from it.

use crate::types::{Candle, PriceTick};
use std::collections::VecDeque;

/// Bounded tick and candle history for the active symbol.
#[derive(Debug, Clone)]
pub struct CandleHistory {
    ticks: VecDeque<PriceTick>,
    candles: VecDeque<Candle>,
    max_len: usize,
    ticks_per_candle: u64,
    ticks_in_current: u64,
}

impl CandleHistory {
    /// Keep at most `max_len` ticks and `max_len` candles, closing a candle
    /// every `ticks_per_candle` ticks.
    pub fn new(max_len: usize, ticks_per_candle: u64) -> Self {
        let max_len = max_len.max(1);
        Self {
            ticks: VecDeque::with_capacity(max_len),
            candles: VecDeque::with_capacity(max_len),
            max_len,
            ticks_per_candle: ticks_per_candle.max(1),
            ticks_in_current: 0,
        }
    }

    /// Record a tick. A new bar opens at the previous close so consecutive
    /// bars connect. Returns the bar the tick was folded into.
    pub fn push(&mut self, tick: PriceTick) -> Candle {
        let previous_close = self.ticks.back().map(|t| t.price).unwrap_or(tick.price);

        self.ticks.push_back(tick);
        while self.ticks.len() > self.max_len {
            self.ticks.pop_front();
        }

        if self.ticks_in_current > 0 && self.ticks_in_current < self.ticks_per_candle {
            if let Some(last) = self.candles.back_mut() {
                last.update(tick.price);
                self.ticks_in_current += 1;
                return *last;
            }
        }

        let candle = Candle::new(tick.time, previous_close, tick.price);
        self.candles.push_back(candle);
        while self.candles.len() > self.max_len {
            self.candles.pop_front();
        }
        self.ticks_in_current = 1;
        candle
    }

    pub fn last_tick(&self) -> Option<&PriceTick> {
        self.ticks.back()
    }

    pub fn ticks(&self) -> impl Iterator<Item = &PriceTick> {
        self.ticks.iter()
    }

    /// Candles oldest first.
    pub fn candles(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }
}
