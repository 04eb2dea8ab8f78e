pub mod builder;
pub mod sanitizer;

pub use builder::{validate_resource_id, QueryBuilder};
pub use sanitizer::{sanitize, Sanitized};
