//! Error types for the project property editor

use crate::condition::{EvaluationError, ParseError};
use crate::document::{ElementId, GroupId};
use thiserror::Error;

/// Main error type for project property editing
#[derive(Error, Debug)]
pub enum ProjectEditError {
    #[error("Invalid condition: {0}")]
    Parse(#[from] ParseError),

    #[error("Condition evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Project has no unconditional property group to hold new properties")]
    MissingPrimaryGroup,

    #[error("Elements {first} and {second} share a document position")]
    AmbiguousOrdering { first: ElementId, second: ElementId },

    #[error("Malformed project XML: {0}")]
    Xml(String),

    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("Element {0} appears more than once in an edit")]
    DuplicateElement(ElementId),

    #[error("Unknown property group: {0}")]
    UnknownGroup(GroupId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for ProjectEditError {
    fn from(err: quick_xml::Error) -> Self {
        ProjectEditError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for ProjectEditError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        ProjectEditError::Xml(err.to_string())
    }
}

impl From<serde_json::Error> for ProjectEditError {
    fn from(err: serde_json::Error) -> Self {
        ProjectEditError::Config(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<ProjectEditError> for pyo3::PyErr {
    fn from(err: ProjectEditError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyKeyError, PyOSError, PyRuntimeError, PyValueError};

        match err {
            ProjectEditError::Parse(e) => PyValueError::new_err(format!("Invalid condition: {}", e)),
            ProjectEditError::Xml(msg) => {
                PyValueError::new_err(format!("Malformed project XML: {}", msg))
            }
            ProjectEditError::Config(msg) => {
                PyValueError::new_err(format!("Invalid configuration: {}", msg))
            }
            ProjectEditError::UnknownElement(id) => {
                PyKeyError::new_err(format!("Unknown element: {}", id))
            }
            ProjectEditError::UnknownGroup(id) => {
                PyKeyError::new_err(format!("Unknown property group: {}", id))
            }
            ProjectEditError::Io(e) => PyOSError::new_err(e.to_string()),
            other => PyRuntimeError::new_err(other.to_string()),
        }
    }
}

/// Result type alias for project property editing
pub type Result<T> = std::result::Result<T, ProjectEditError>;
