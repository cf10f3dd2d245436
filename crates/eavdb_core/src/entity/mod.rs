//! Entity types.

mod id;
mod model;

pub use id::EntityId;
pub use model::Entity;
