//! In-memory response cache with age-based expiry
//!
//! Entries are keyed by request URL and hold the raw response body. A
//! background sweep task removes entries once they are older than the
//! configured interval; lookups never check age themselves.

mod expiring;

pub use expiring::{Cache, CacheError};
