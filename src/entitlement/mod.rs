//! Entitlement gate: quota, status, and rate-limit enforcement (spec §4.2).

pub mod clock;
pub mod gate;
pub mod period;
pub mod rate_limiter;
pub mod session_cache;

pub use clock::{Clock, SystemClock};
pub use gate::{finalize_tool_execution, pre_authorize_tool, Reservation, MCP_UNITS_METER};
pub use rate_limiter::RateLimiter;
pub use session_cache::SessionCache;
