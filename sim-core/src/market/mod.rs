pub mod candle;
pub mod matching;
pub mod order;

pub use candle::{Candle, build_candle, vwap_cents};
pub use matching::{Trade, match_incoming_order};
pub use order::{MarketOrder, price_time_key};
