//! Custom Axum extractors.

pub mod actor;

pub use actor::{AdminActor, ADMIN_ID_HEADER, ADMIN_NAME_HEADER};
