use crate::types::PairSpec;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::time::Duration;

/// Simulation session configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Currency pair to simulate.
    pub symbol: String,
    /// Cash the account starts with.
    pub starting_balance: Decimal,
    /// First price of the session (defaults to the pair's base price).
    pub start_price: Decimal,
    /// Time between ticks.
    pub tick_interval: Duration,
    /// Ticks and candles kept in the rolling history.
    pub history_len: usize,
    /// Ticks folded into each candle.
    pub ticks_per_candle: u64,
    /// Base relative volatility per tick.
    pub volatility: f64,
    /// Maximum relative distance from the start price.
    pub max_drift: Decimal,
    /// Highest leverage accepted at placement.
    pub max_leverage: u32,
    /// Seed for the random walk (random when unset).
    pub seed: Option<u64>,
    /// Capacity of the snapshot broadcast channel.
    pub event_buffer: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::for_symbol("EUR/USD")
    }
}

impl SimulationConfig {
    /// Defaults for `symbol`, starting at its catalogue price.
    pub fn for_symbol(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            starting_balance: dec!(10000),
            start_price: PairSpec::for_symbol(symbol).base_price,
            tick_interval: Duration::from_millis(1000),
            history_len: 100,
            ticks_per_candle: 1,
            volatility: 0.0005,
            max_drift: dec!(0.2),
            max_leverage: 100,
            seed: None,
            event_buffer: 256,
        }
    }

    /// Set the starting balance.
    pub fn with_balance(mut self, starting_balance: Decimal) -> Self {
        self.starting_balance = starting_balance;
        self
    }

    /// Set the first price of the session.
    pub fn with_start_price(mut self, start_price: Decimal) -> Self {
        self.start_price = start_price;
        self
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let symbol = env::var("SIM_SYMBOL").unwrap_or_else(|_| "EUR/USD".to_string());
        let defaults = Self::for_symbol(&symbol);

        Self {
            starting_balance: env::var("SIM_STARTING_BALANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.starting_balance),
            start_price: env::var("SIM_START_PRICE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|p: &Decimal| *p > Decimal::ZERO)
                .unwrap_or(defaults.start_price),
            tick_interval: env::var("SIM_TICK_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            history_len: env::var("SIM_HISTORY_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_len),
            ticks_per_candle: env::var("SIM_TICKS_PER_CANDLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ticks_per_candle),
            volatility: env::var("SIM_VOLATILITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &f64| v.is_finite() && *v >= 0.0)
                .unwrap_or(defaults.volatility),
            max_drift: env::var("SIM_MAX_DRIFT_PCT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_drift),
            max_leverage: env::var("SIM_MAX_LEVERAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_leverage),
            seed: env::var("SIM_SEED").ok().and_then(|v| v.parse().ok()),
            event_buffer: env::var("SIM_EVENT_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.event_buffer),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_pair_catalogue() {
        let config = SimulationConfig::for_symbol("usd/jpy");
        assert_eq!(config.symbol, "USD/JPY");
        assert_eq!(config.start_price, dec!(145.80));
        assert_eq!(config.starting_balance, dec!(10000));
        assert_eq!(config.history_len, 100);
    }

    #[test]
    fn test_from_env_ignores_non_finite_volatility() {
        for raw in ["NaN", "inf", "-0.5"] {
            env::set_var("SIM_VOLATILITY", raw);
            let config = SimulationConfig::from_env();
            env::remove_var("SIM_VOLATILITY");

            assert_eq!(config.volatility, 0.0005, "SIM_VOLATILITY={}", raw);
        }
    }

    #[test]
    fn test_builders() {
        let config = SimulationConfig::default()
            .with_balance(dec!(500))
            .with_start_price(dec!(1.0850))
            .with_tick_interval(Duration::from_millis(250));

        assert_eq!(config.symbol, "EUR/USD");
        assert_eq!(config.starting_balance, dec!(500));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
    }
}
