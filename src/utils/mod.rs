mod pool;
mod recency;
mod seq;

pub use pool::*;
pub use recency::*;
pub use seq::*;

/// Monotonic tick count; wraps, compare with `wrapping_sub`.
pub type Tick = u32;
