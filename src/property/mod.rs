//! Property resolution and editing module
//!
//! Finds every declaration of a property across the document's property
//! groups and rewrites them so exactly one unconditional declaration holds
//! the new value. Condition-aware queries answer which declaration applies
//! for a given set of global properties.

mod query;
mod resolver;

#[cfg(test)]
mod property_tests;

pub use query::*;
pub use resolver::*;
