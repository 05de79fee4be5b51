//! Service layer coordinating listing records, their image assets and dependent reviews.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in `models` crate.
//! - Every external store is injected behind a trait so the lifecycle can be tested in memory.

pub mod errors;
pub mod asset;
pub mod listing;
#[cfg(test)]
pub mod test_support;

pub use listing::ListingService;
