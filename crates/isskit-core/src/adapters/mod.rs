//! Concrete [`IssProvider`](crate::IssProvider) implementations.
//!
//! | Adapter | Backing |
//! |---------|---------|
//! | [`IssAdapter`] | MOEX ISS JSON over HTTP |
//! | [`FixtureProvider`] | In-memory canned data |

mod fixture;
mod iss;

pub use fixture::{FixtureProvider, FixtureSecurity};
pub use iss::IssAdapter;
