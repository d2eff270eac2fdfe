//! Data-fetch cache: keyed response cache plus per-consumer request
//! sequencing with cancellation.

mod cache;
mod error;
mod key;
mod mock;
mod session;
mod transport;

pub use cache::{CacheEntry, DEFAULT_STALENESS, ResponseCache, ResponseCacheConfig};
pub use error::FetchError;
pub use key::{CacheKey, RequestConfig};
pub use mock::MockTransport;
pub use session::{FetchRequest, FetchSession, FetchState};
pub use transport::{HttpTransport, HttpTransportConfig, Transport};
