//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`Fetcher`](crate::fetcher::Fetcher), allowing
//! orchestrator behaviour (bounds, fail-fast, cancellation) to be exercised
//! without a real backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanout_core::testing::{fixtures, MockFetcher};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.fail("bad").await;
//!
//! let ids = fixtures::ids(&["a", "bad", "c"]);
//! ```

mod mock_fetcher;

pub use mock_fetcher::{MockBehavior, MockFetcher};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;

    use crate::fetcher::checksum_price;

    /// Turn string literals into an owned item list.
    pub fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    /// `count` distinct identifiers named `<prefix>-<n>`.
    pub fn numbered_ids(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}-{}", prefix, i)).collect()
    }

    /// Expected result map when every identifier is priced by checksum.
    pub fn checksum_map(raw: &[&str]) -> HashMap<String, i64> {
        raw.iter()
            .map(|id| (id.to_string(), checksum_price(id)))
            .collect()
    }
}
