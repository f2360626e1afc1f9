//! Incremental indicators for per-bar strategies.
//!
//! Unlike batch indicators that compute a whole series at once, these are
//! fed one close at a time by a strategy inside the bar loop and return
//! `None` until their warm-up window has been observed.

pub mod rsi;
pub mod sma;

pub use rsi::WilderRsi;
pub use sma::RollingSma;
