//! Repository traits for catalog operations.

pub mod records;
pub mod schema;
pub mod sites;
pub mod tables;

pub use records::RecordRepo;
pub use schema::{SchemaRepo, apply_schema_ops};
pub use sites::SiteRepo;
pub use tables::TableRepo;
