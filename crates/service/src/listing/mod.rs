//! Listing module: three-layer architecture (domain, repository, service).
//!
//! The service coordinates the listing record, its image in the asset store
//! and the reviews that must not outlive it.

pub mod domain;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::ListingService;
