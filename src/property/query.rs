//! Condition-aware property queries
//!
//! Conditions that cannot be evaluated against the supplied state mark their
//! declarations as inapplicable: those groups and elements are skipped.

use crate::condition::{check_condition, expand_text, ConditionEvaluationState};
use crate::document::{ProjectDocument, PropertyElement, PropertyGroup};
use crate::error::Result;
use ahash::AHashMap;
use tracing::debug;

/// Whether a declaration guarded by `condition` applies
fn applies(condition: Option<&str>, state: &dyn ConditionEvaluationState) -> Result<bool> {
    let Some(condition) = condition else {
        return Ok(true);
    };

    match check_condition(condition, state)? {
        Some(result) => Ok(result),
        None => {
            debug!(condition, "Condition not evaluable, skipping declaration");
            Ok(false)
        }
    }
}

/// Groups whose condition is absent or holds for `state`
pub fn active_groups<'d>(
    document: &'d ProjectDocument,
    state: &dyn ConditionEvaluationState,
) -> Result<Vec<&'d PropertyGroup>> {
    let mut active = Vec::new();
    for group in document.property_groups() {
        if applies(group.condition(), state)? {
            active.push(group);
        }
    }
    Ok(active)
}

/// The declaration of `name` that takes effect for `state`
///
/// Later applicable declarations override earlier ones.
pub fn effective_value<'d>(
    document: &'d ProjectDocument,
    name: &str,
    state: &dyn ConditionEvaluationState,
) -> Result<Option<&'d PropertyElement>> {
    let mut effective = None;
    for group in active_groups(document, state)? {
        for element in group.elements().filter(|e| e.local_name() == name) {
            if applies(element.condition(), state)? {
                effective = Some(element);
            }
        }
    }
    Ok(effective)
}

/// Property values produced by reading the document top to bottom
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatedProperties {
    values: AHashMap<String, String>,
}

impl EvaluatedProperties {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Evaluated values keyed by lowercase name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConditionEvaluationState for EvaluatedProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }
}

/// Document properties layered over a base state
///
/// Names neither layer defines read as empty, so every reference can be
/// expanded during a full pass.
struct Layered<'a> {
    base: &'a dyn ConditionEvaluationState,
    local: &'a EvaluatedProperties,
}

impl ConditionEvaluationState for Layered<'_> {
    fn property(&self, name: &str) -> Option<String> {
        Some(
            self.base
                .property(name)
                .or_else(|| self.local.property(name))
                .unwrap_or_default(),
        )
    }

    fn item(&self, name: &str) -> Option<Vec<String>> {
        self.base.item(name)
    }

    fn path_exists(&self, path: &str) -> Option<bool> {
        self.base.path_exists(path)
    }
}

/// Evaluate every property declaration in document order
///
/// Properties set earlier in the document are visible to later conditions
/// and values. Names known to `globals` cannot be overridden by the document.
pub fn evaluate_properties(
    document: &ProjectDocument,
    globals: &dyn ConditionEvaluationState,
) -> Result<EvaluatedProperties> {
    let mut evaluated = EvaluatedProperties::default();

    for group in document.property_groups() {
        let group_applies = {
            let state = Layered {
                base: globals,
                local: &evaluated,
            };
            applies(group.condition(), &state)?
        };
        if !group_applies {
            continue;
        }

        for element in group.elements() {
            let name = element.local_name();
            if globals.property(name).is_some() {
                continue;
            }

            let value = {
                let state = Layered {
                    base: globals,
                    local: &evaluated,
                };
                if !applies(element.condition(), &state)? {
                    continue;
                }
                expand_text(element.value(), &state).unwrap_or_else(|| element.value().to_string())
            };

            evaluated.values.insert(name.to_ascii_lowercase(), value);
        }
    }

    Ok(evaluated)
}
