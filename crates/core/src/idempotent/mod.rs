//! Idempotency key derivation.
//!
//! A key groups a logical request with its own retries. It is derived from
//! the identity and the submit time truncated to a one-second window:
//!
//! ```text
//! key = identity ++ ":" ++ floor(timestamp_millis / 1000) * 1000
//! ```
//!
//! A retry issued milliseconds after the original lands on the same key; two
//! submissions at least one second apart never do. A human resubmitting the
//! identical form within the same second is treated as the same logical
//! request as an automatic retry.
//!
//! # Example
//!
//! ```
//! use tally_core::idempotent::derive;
//! use tally_core::Identity;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = Identity::parse("a@x.com")?;
//! let first = derive(&identity, 1_700_000_000_123);
//! let retry = derive(&identity, 1_700_000_000_999);
//! assert_eq!(first, retry);
//! assert_eq!(first.to_string(), "a@x.com:1700000000000");
//! # Ok(())
//! # }
//! ```

pub mod keys;

pub use keys::{IdempotencyKey, KEY_WINDOW_MILLIS, derive, derive_at};
