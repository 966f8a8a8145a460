//! Attribute aggregation.
//!
//! Attributes are clamped integers aggregated across ordered channels of
//! flat, percent and override slots. Mutation passes stay silent until the
//! owning entity publishes them in one batch, so observers never see
//! intermediate values.

pub mod attribute;
pub mod plugin;
pub mod set;
pub mod systems;

pub use attribute::Attribute;
pub use plugin::AttributePlugin;
pub use set::{AttributeChange, AttributeKey, AttributeSet};
pub use systems::AttributeChangedEvent;
