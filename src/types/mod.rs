pub mod candle;
pub mod signal;
pub mod snapshot;
pub mod timeframe;

pub use candle::*;
pub use signal::*;
pub use snapshot::*;
pub use timeframe::*;
