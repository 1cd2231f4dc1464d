//! Fetch collaborator abstraction.
//!
//! The orchestrator never talks to a backend directly; it drives a
//! [`Fetcher`] that resolves one identifier to an integer value and honours
//! the cancellation token it is handed.

mod checksum;
mod types;

pub use checksum::{checksum_price, ChecksumFetcher};
pub use types::*;
