//! Hierarchical tag store.
//!
//! Tags are interned dotted names (`"Status.Burning"`) carrying their own
//! hierarchy. The module provides the tag value type and registry surface,
//! plain containers with set algebra, the per-entity store combining
//! permanent base tags with reference-counted modifier tags, and the
//! required/forbidden gates the effect and ability runtimes evaluate.

pub mod container;
pub mod plugin;
pub mod requirements;
pub mod store;
pub mod systems;
pub mod tag;

pub use container::TagContainer;
pub use plugin::TagsPlugin;
pub use requirements::TagRequirements;
pub use store::{EntityTags, TagCountMap};
pub use systems::{AddBaseTagRequest, RemoveBaseTagRequest};
pub use tag::{GameplayTag, TagQuery, TagRegistry};
