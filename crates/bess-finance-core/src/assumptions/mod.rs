pub mod configuration;
pub mod input;
pub mod market_rates;
