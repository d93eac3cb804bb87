//! Property tests for property module
//!
//! Setting a property leaves exactly one unconditional declaration holding
//! the new value, never rewrites conditional declarations, and setting the
//! same value twice changes nothing further.

use proptest::prelude::*;

use crate::document::{EditPlan, ProjectDocument};
use crate::error::ProjectEditError;
use crate::property::{find_existing, set_property};

// ═══════════════════════════════════════════════════════════════════════════
// Strategy generators for property tests
// ═══════════════════════════════════════════════════════════════════════════

/// Generate a property name
fn name_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("OutputPath"), Just("Version"), Just("Nullable")]
}

/// Generate a non-blank property value
fn value_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9.]{1,8}"
}

/// Generate an optional condition
fn condition_strategy() -> impl Strategy<Value = Option<&'static str>> {
    prop::option::of(prop_oneof![
        Just("'$(Configuration)' == 'Debug'"),
        Just("'$(Platform)' != 'x64'"),
    ])
}

/// Generate a project: groups with conditions, elements with optional conditions
fn project_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (
            condition_strategy(),
            prop::collection::vec(
                (name_strategy(), value_strategy(), condition_strategy()),
                0..=4,
            ),
        ),
        1..=5,
    )
    .prop_map(|groups| {
        let mut doc = ProjectDocument::new("Project");
        let mut plan = EditPlan::new();
        for (condition, elements) in groups {
            let group = doc.add_property_group(condition);
            for (name, value, element_condition) in elements {
                let mut element = doc.new_element(name, value);
                if let Some(c) = element_condition {
                    element = element.with_attribute("Condition", c);
                }
                plan.append(group, element);
            }
        }
        doc.apply(plan).unwrap();
        doc.to_xml()
    })
}

fn values(doc: &ProjectDocument, name: &str) -> (Vec<String>, Vec<String>) {
    let (unconditional, conditional) = doc.property_all(name);
    (
        unconditional.iter().map(|e| e.value().to_string()).collect(),
        conditional.iter().map(|(_, e)| e.value().to_string()).collect(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// Property Tests
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// A set leaves one unconditional declaration holding the value
    #[test]
    fn prop_set_leaves_single_unconditional(
        xml in project_strategy(),
        name in name_strategy(),
        value in value_strategy()
    ) {
        let mut doc = ProjectDocument::parse(&xml).unwrap();
        prop_assume!(doc.primary_property_group().is_ok());

        set_property(&mut doc, name, &value).unwrap();

        let (unconditional, conditional) = values(&doc, name);
        prop_assert_eq!(unconditional, vec![value]);
        prop_assert!(conditional.len() <= 1);
    }

    /// The surviving conditional declaration keeps its id and value
    #[test]
    fn prop_conditional_values_are_never_rewritten(
        xml in project_strategy(),
        name in name_strategy(),
        value in value_strategy()
    ) {
        let mut doc = ProjectDocument::parse(&xml).unwrap();
        prop_assume!(doc.primary_property_group().is_ok());

        let before = find_existing(&doc, &[name]).unwrap().last_conditional.map(|id| {
            (id, doc.element(id).unwrap().value().to_string())
        });

        set_property(&mut doc, name, &value).unwrap();

        let after = find_existing(&doc, &[name]).unwrap().last_conditional.map(|id| {
            (id, doc.element(id).unwrap().value().to_string())
        });
        prop_assert_eq!(before, after);
    }

    /// Deleting removes every declaration
    #[test]
    fn prop_delete_leaves_nothing(xml in project_strategy(), name in name_strategy()) {
        let mut doc = ProjectDocument::parse(&xml).unwrap();
        set_property(&mut doc, name, "").unwrap();

        prop_assert!(find_existing(&doc, &[name]).unwrap().is_empty());
        let reloaded = ProjectDocument::parse(&doc.to_xml()).unwrap();
        prop_assert!(find_existing(&reloaded, &[name]).unwrap().is_empty());
    }

    /// Setting the same value twice equals setting it once
    #[test]
    fn prop_set_is_idempotent(
        xml in project_strategy(),
        name in name_strategy(),
        value in value_strategy()
    ) {
        let mut doc = ProjectDocument::parse(&xml).unwrap();
        prop_assume!(doc.primary_property_group().is_ok());

        set_property(&mut doc, name, &value).unwrap();
        let once = doc.to_xml();
        set_property(&mut doc, name, &value).unwrap();
        prop_assert_eq!(doc.to_xml(), once);
    }

    /// A failed set leaves the document as it was
    #[test]
    fn prop_failed_set_is_atomic(
        xml in project_strategy(),
        name in name_strategy(),
        value in value_strategy()
    ) {
        let mut doc = ProjectDocument::parse(&xml).unwrap();
        let before = doc.to_xml();

        match set_property(&mut doc, name, &value) {
            Ok(()) => prop_assert!(doc.primary_property_group().is_ok()),
            Err(err) => {
                prop_assert!(matches!(err, ProjectEditError::MissingPrimaryGroup));
                prop_assert_eq!(doc.to_xml(), before);
            }
        }
    }
}
