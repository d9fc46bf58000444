//! HTTP request handlers.

pub mod common;
pub mod events;
pub mod health;
pub mod images;
pub mod records;
pub mod sites;
pub mod tables;

pub use events::*;
pub use health::*;
pub use images::*;
pub use records::*;
pub use sites::*;
pub use tables::*;
