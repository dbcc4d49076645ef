//! PostgreSQL repository implementations.
//!
//! Queries are bound at runtime with SQLx; the schema lives in `migrations/`.
//!
//! - [`PgMappingRepository`] - URL mapping storage and click write-back

pub mod pg_mapping_repository;

pub use pg_mapping_repository::PgMappingRepository;
