//! Entity store operations
//!
//! One module per entity kind, each exposing the typed filter / create /
//! update operations the engine needs. Predicates are limited to equality
//! and set-membership on indexed fields.

pub mod events;
pub mod records;
pub mod tasks;
pub mod users;
