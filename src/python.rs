//! Python bindings

use crate::condition::{cache_size, check_condition, clear_cache};
use crate::config::GlobalProperties;
use crate::document::ProjectDocument;
use crate::error::ProjectEditError;
use crate::property;
use pyo3::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Helper Functions
// ============================================================================

fn globals_from(properties: Option<HashMap<String, String>>) -> GlobalProperties {
    properties.unwrap_or_default().into_iter().collect()
}

// ============================================================================
// Python Functions
// ============================================================================

/// Set a property in project XML and return the rewritten XML
///
/// An empty or whitespace `value` deletes the property.
///
/// # Raises
/// ValueError if the XML is malformed, RuntimeError if the project has no
/// unconditional property group to hold a new property
#[pyfunction]
fn set_property(xml: &str, name: &str, value: &str) -> PyResult<String> {
    let mut doc = ProjectDocument::parse(xml)?;
    property::set_property(&mut doc, name, value)?;
    Ok(doc.to_xml())
}

/// Read a property from project XML
///
/// Without `properties`, returns the last unconditional declaration, falling
/// back to the last conditional one. With `properties`, returns the
/// declaration whose conditions hold for those global properties.
#[pyfunction]
#[pyo3(signature = (xml, name, properties=None))]
fn get_property(
    xml: &str,
    name: &str,
    properties: Option<HashMap<String, String>>,
) -> PyResult<Option<String>> {
    let doc = ProjectDocument::parse(xml)?;
    let element = match properties {
        None => doc.property(name, true),
        Some(properties) => {
            let globals = globals_from(Some(properties));
            property::effective_value(&doc, name, &globals)?
        }
    };
    Ok(element.map(|e| e.value().to_string()))
}

/// Evaluate every property declaration of project XML in document order
#[pyfunction]
#[pyo3(signature = (xml, properties=None))]
fn evaluate_properties(
    xml: &str,
    properties: Option<HashMap<String, String>>,
) -> PyResult<HashMap<String, String>> {
    let doc = ProjectDocument::parse(xml)?;
    let evaluated = property::evaluate_properties(&doc, &globals_from(properties))?;
    Ok(evaluated
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect())
}

/// Evaluate a condition string
///
/// # Returns
/// True or False, or None when the condition references unknown names
///
/// # Raises
/// ValueError if the condition is malformed
#[pyfunction]
#[pyo3(signature = (condition, properties=None))]
fn evaluate_condition(
    condition: &str,
    properties: Option<HashMap<String, String>>,
) -> PyResult<Option<bool>> {
    let globals = globals_from(properties);
    let result = check_condition(condition, &globals).map_err(ProjectEditError::from)?;
    Ok(result)
}

/// Set a property in a project file without blocking the event loop
///
/// # Example (Python)
/// ```python
/// await set_property_in_file_async("App.csproj", "Version", "2.0")
/// ```
#[pyfunction]
fn set_property_in_file_async<'py>(
    py: Python<'py>,
    path: String,
    name: String,
    value: String,
) -> PyResult<Bound<'py, PyAny>> {
    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        tokio::task::spawn_blocking(move || {
            let mut doc = ProjectDocument::load(&path)?;
            property::set_property(&mut doc, &name, &value)?;
            doc.save(&path)?;
            Ok::<(), PyErr>(())
        })
        .await
        .map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Property update task panicked: {}",
                e
            ))
        })?
    })
}

/// Drop every cached condition
#[pyfunction]
fn clear_condition_cache() {
    clear_cache();
}

/// Number of cached conditions
#[pyfunction]
fn condition_cache_size() -> usize {
    cache_size()
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn project_props_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(set_property, m)?)?;
    m.add_function(wrap_pyfunction!(get_property, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_properties, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_condition, m)?)?;
    m.add_function(wrap_pyfunction!(set_property_in_file_async, m)?)?;
    m.add_function(wrap_pyfunction!(clear_condition_cache, m)?)?;
    m.add_function(wrap_pyfunction!(condition_cache_size, m)?)?;
    Ok(())
}
