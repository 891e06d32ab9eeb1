//! Remote time source port

use core::fmt::Debug;
use core::future::Future;

/// A remote wall-clock reference (SNTP server, cellular network time, ...)
///
/// Contacting the source costs network traffic, so callers rate-limit it.
pub trait TimeSource {
    /// Transport or protocol failure
    type Error: Debug;

    /// Fetch the current UTC time as seconds since the Unix epoch
    fn fetch_unix_secs(&mut self) -> impl Future<Output = Result<u64, Self::Error>>;
}
