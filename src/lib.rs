//! Project Props Core - property editing for MSBuild-style project files
//!
//! This crate loads project XML, resolves every declaration of a property
//! across conditional and unconditional property groups, and rewrites them
//! so one unconditional declaration holds the new value. Conditions such as
//! `'$(Configuration)' == 'Debug'` are parsed and evaluated with three-valued
//! semantics. Python bindings are available behind the `python` feature.
//!
//! ```
//! use project_props_core::{set_property, ProjectDocument};
//!
//! let mut doc = ProjectDocument::parse(
//!     "<Project><PropertyGroup><Version>1.0</Version></PropertyGroup></Project>",
//! )?;
//! set_property(&mut doc, "Version", "2.0")?;
//! assert_eq!(doc.property("Version", false).map(|e| e.value()), Some("2.0"));
//! # Ok::<(), project_props_core::error::ProjectEditError>(())
//! ```

pub mod condition;
pub mod config;
pub mod document;
pub mod error;
pub mod property;

#[cfg(feature = "python")]
mod python;

pub use crate::condition::{parse, ConditionEvaluationState, ConditionExpression, ExpressionNode};
pub use crate::config::GlobalProperties;
pub use crate::document::{EditPlan, ElementId, ProjectDocument, PropertyElement, PropertyGroup};
pub use crate::error::{ProjectEditError, Result};
pub use crate::property::{
    active_groups, effective_value, evaluate_properties, find_existing, plan_replace, replace_with,
    set_property, ResolutionResult,
};
