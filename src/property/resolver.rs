//! Property resolution
//!
//! A property may be declared several times, in unconditional groups and
//! under conditions. Resolution picks the authoritative ("last") declaration
//! of each class by document order and treats the others as superseded.

use crate::document::{EditPlan, ElementId, ProjectDocument, PropertyElement};
use crate::error::{ProjectEditError, Result};
use ahash::AHashSet;
use smallvec::SmallVec;
use std::cmp::Ordering;
use tracing::debug;

/// Superseded declarations, usually none or a handful
pub type Superseded = SmallVec<[ElementId; 4]>;

/// Declarations found for a set of property names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionResult {
    pub last_unconditional: Option<ElementId>,
    pub last_conditional: Option<ElementId>,
    /// Superseded unconditional declarations, in discovery order
    pub other_unconditional: Superseded,
    /// Superseded conditional declarations, in discovery order
    pub other_conditional: Superseded,
}

impl ResolutionResult {
    pub fn found_any(&self) -> bool {
        self.last_unconditional.is_some() || self.last_conditional.is_some()
    }

    /// The last conditional declaration comes after every unconditional one
    pub fn last_is_conditional(&self) -> bool {
        match (self.last_conditional, self.last_unconditional) {
            (Some(conditional), Some(unconditional)) => conditional.is_after(unconditional),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// The last unconditional declaration comes after every conditional one
    pub fn last_is_unconditional(&self) -> bool {
        match (self.last_unconditional, self.last_conditional) {
            (Some(unconditional), Some(conditional)) => unconditional.is_after(conditional),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// The single declaration positioned last in the document
    pub fn overall_last(&self) -> Option<ElementId> {
        if self.last_is_conditional() {
            self.last_conditional
        } else {
            self.last_unconditional
        }
    }

    /// Superseded unconditional declarations followed by the last one
    pub fn all_unconditional(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.other_unconditional.iter().copied().chain(self.last_unconditional)
    }

    /// Superseded conditional declarations followed by the last one
    pub fn all_conditional(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.other_conditional.iter().copied().chain(self.last_conditional)
    }

    /// Every declaration, ending with the class that holds the overall last
    pub fn all(&self) -> Vec<ElementId> {
        let mut all: Vec<ElementId> = Vec::with_capacity(self.len());
        if self.last_is_conditional() {
            all.extend(self.all_unconditional());
            all.extend(self.all_conditional());
        } else {
            all.extend(self.all_conditional());
            all.extend(self.all_unconditional());
        }
        all
    }

    /// Number of declarations found
    pub fn len(&self) -> usize {
        self.other_unconditional.len()
            + self.other_conditional.len()
            + usize::from(self.last_unconditional.is_some())
            + usize::from(self.last_conditional.is_some())
    }

    pub fn is_empty(&self) -> bool {
        !self.found_any()
    }
}

/// Keep `candidate` as the class's last declaration if it comes later
fn store(candidate: ElementId, last: &mut Option<ElementId>, others: &mut Superseded) -> Result<()> {
    let Some(current) = *last else {
        *last = Some(candidate);
        return Ok(());
    };

    match candidate.cmp(&current) {
        Ordering::Greater => {
            others.push(current);
            *last = Some(candidate);
        }
        Ordering::Less => others.push(candidate),
        Ordering::Equal => {
            return Err(ProjectEditError::AmbiguousOrdering {
                first: current,
                second: candidate,
            })
        }
    }
    Ok(())
}

/// Find every declaration of any of `names`
///
/// Names are treated as an ordered set: repeats are ignored.
pub fn find_existing<S: AsRef<str>>(document: &ProjectDocument, names: &[S]) -> Result<ResolutionResult> {
    let mut result = ResolutionResult::default();
    let mut seen = AHashSet::with_capacity(names.len());

    for name in names {
        let name = name.as_ref();
        if !seen.insert(name) {
            continue;
        }

        let (unconditional, conditional) = document.property_all(name);
        for element in unconditional {
            store(
                element.id(),
                &mut result.last_unconditional,
                &mut result.other_unconditional,
            )?;
        }
        for (_, element) in conditional {
            store(
                element.id(),
                &mut result.last_conditional,
                &mut result.other_conditional,
            )?;
        }
    }

    Ok(result)
}

/// Compute the edits that make `new_element` the declaration of `names`
///
/// `None` deletes every declaration. Conditional declarations are never
/// rewritten: the new value always lands in an unconditional group.
pub fn plan_replace<S: AsRef<str>>(
    document: &ProjectDocument,
    new_element: Option<PropertyElement>,
    names: &[S],
) -> Result<EditPlan> {
    let found = find_existing(document, names)?;
    let mut plan = EditPlan::new();

    if !found.found_any() {
        if let Some(element) = new_element {
            plan.append(document.primary_property_group()?.id(), element);
        }
        return Ok(plan);
    }

    for superseded in found.other_unconditional.iter().chain(&found.other_conditional) {
        plan.remove(*superseded);
    }

    let Some(element) = new_element else {
        // Delete: nothing of the property may survive
        for last in found.last_unconditional.into_iter().chain(found.last_conditional) {
            plan.remove(last);
        }
        return Ok(plan);
    };

    match (found.overall_last(), found.last_unconditional) {
        (Some(last), _) if found.last_is_unconditional() => plan.replace(last, element),
        (Some(conditional), Some(unconditional)) => {
            debug!(
                conditional = %conditional,
                replaced = %unconditional,
                "Keeping later conditional declaration, replacing unconditional one"
            );
            plan.replace(unconditional, element);
        }
        (Some(conditional), None) => {
            debug!(conditional = %conditional, "Adding unconditional declaration beside conditional one");
            plan.append(document.primary_property_group()?.id(), element);
        }
        (None, _) => plan.append(document.primary_property_group()?.id(), element),
    }

    Ok(plan)
}

/// Replace every declaration of `names` with `new_element`, or delete them
pub fn replace_with<S: AsRef<str>>(
    document: &mut ProjectDocument,
    new_element: Option<PropertyElement>,
    names: &[S],
) -> Result<()> {
    let plan = plan_replace(document, new_element, names)?;
    document.apply(plan)
}

/// Set a property; an empty or whitespace value deletes it
pub fn set_property(document: &mut ProjectDocument, name: &str, value: &str) -> Result<()> {
    let element = if value.trim().is_empty() {
        None
    } else {
        Some(document.new_element(name, value))
    };

    debug!(name, delete = element.is_none(), "Setting property");
    replace_with(document, element, &[name])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(xml: &str) -> ProjectDocument {
        ProjectDocument::parse(xml).unwrap()
    }

    fn values(doc: &ProjectDocument, name: &str) -> (Vec<String>, Vec<String>) {
        let (unconditional, conditional) = doc.property_all(name);
        (
            unconditional.iter().map(|e| e.value().to_string()).collect(),
            conditional.iter().map(|(_, e)| e.value().to_string()).collect(),
        )
    }

    const ORDERING: &str = r#"<Project>
  <PropertyGroup>
    <X>a</X>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)' == 'Debug'">
    <X>b</X>
  </PropertyGroup>
  <PropertyGroup>
    <X>c</X>
  </PropertyGroup>
</Project>
"#;

    #[test]
    fn test_find_existing_ordering() {
        let doc = doc(ORDERING);
        let found = find_existing(&doc, &["X"]).unwrap();

        let value = |id: Option<ElementId>| doc.element(id.unwrap()).unwrap().value().to_string();
        assert_eq!(value(found.last_unconditional), "c");
        assert_eq!(value(found.last_conditional), "b");
        assert_eq!(value(found.overall_last()), "c");
        assert_eq!(found.other_unconditional.len(), 1);
        assert!(found.other_conditional.is_empty());
        assert!(found.last_is_unconditional());
        assert!(!found.last_is_conditional());
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_set_property_replaces_last_unconditional_in_place() {
        let mut doc = doc(ORDERING);
        set_property(&mut doc, "X", "z").unwrap();

        assert_eq!(
            doc.to_xml(),
            r#"<Project>
  <PropertyGroup />
  <PropertyGroup Condition="'$(Configuration)' == 'Debug'">
    <X>b</X>
  </PropertyGroup>
  <PropertyGroup>
    <X>z</X>
  </PropertyGroup>
</Project>
"#
        );
    }

    #[test]
    fn test_conditional_only_gets_new_unconditional() {
        let mut doc = doc(
            r#"<Project>
  <PropertyGroup>
    <Other>1</Other>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Config)'=='Debug'">
    <Y>1</Y>
  </PropertyGroup>
</Project>"#,
        );
        set_property(&mut doc, "Y", "2").unwrap();

        assert_eq!(values(&doc, "Y"), (vec!["2".to_string()], vec!["1".to_string()]));
        let primary = doc.primary_property_group().unwrap();
        assert_eq!(primary.elements().last().unwrap().value(), "2");
    }

    #[test]
    fn test_later_conditional_is_kept() {
        let mut doc = doc(
            r#"<Project>
  <PropertyGroup><Y>0</Y></PropertyGroup>
  <PropertyGroup Condition="'$(Config)'=='Debug'"><Y>1</Y></PropertyGroup>
</Project>"#,
        );
        set_property(&mut doc, "Y", "2").unwrap();
        assert_eq!(values(&doc, "Y"), (vec!["2".to_string()], vec!["1".to_string()]));
    }

    #[test]
    fn test_order_after_replace_matches_reload() {
        let mut doc = doc(
            r#"<Project>
  <PropertyGroup><X>a</X></PropertyGroup>
  <PropertyGroup Condition="'$(Config)'=='Debug'"><X>b</X></PropertyGroup>
</Project>"#,
        );
        set_property(&mut doc, "X", "z").unwrap();

        let found = find_existing(&doc, &["X"]).unwrap();
        assert!(found.last_is_conditional());
        assert_eq!(doc.element(found.overall_last().unwrap()).unwrap().value(), "b");

        let reloaded = ProjectDocument::parse(&doc.to_xml()).unwrap();
        let reloaded_found = find_existing(&reloaded, &["X"]).unwrap();
        assert_eq!(found.last_is_conditional(), reloaded_found.last_is_conditional());
    }

    #[test]
    fn test_empty_document_fails_without_creating_group() {
        let mut doc = doc("<Project></Project>");
        let before = doc.to_xml();
        assert!(matches!(
            set_property(&mut doc, "X", "1"),
            Err(ProjectEditError::MissingPrimaryGroup)
        ));
        assert_eq!(doc.to_xml(), before);
        assert_eq!(doc.property_groups().count(), 0);
    }

    #[test]
    fn test_missing_primary_group_leaves_document_unchanged() {
        let mut doc = doc(
            r#"<Project>
  <PropertyGroup Condition="'$(A)'=='1'"><X>1</X><X>2</X></PropertyGroup>
</Project>"#,
        );
        let before = doc.to_xml();
        assert!(matches!(
            set_property(&mut doc, "X", "3"),
            Err(ProjectEditError::MissingPrimaryGroup)
        ));
        assert_eq!(doc.to_xml(), before);
    }

    #[test]
    fn test_delete_removes_everything() {
        let mut doc = doc(ORDERING);
        set_property(&mut doc, "X", "  ").unwrap();
        assert!(find_existing(&doc, &["X"]).unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_is_a_no_op() {
        let mut doc = doc("<Project></Project>");
        set_property(&mut doc, "X", "").unwrap();
        assert_eq!(doc.to_xml(), "<Project />\n");
    }

    #[test]
    fn test_append_to_primary_group() {
        let mut doc = doc(
            r#"<Project>
  <PropertyGroup Condition="'$(A)'=='1'"><Z>1</Z></PropertyGroup>
  <PropertyGroup><First>1</First></PropertyGroup>
  <PropertyGroup><Second>1</Second></PropertyGroup>
</Project>"#,
        );
        set_property(&mut doc, "New", "v").unwrap();

        let primary = doc.primary_property_group().unwrap();
        let names: Vec<&str> = primary.elements().map(|e| e.name()).collect();
        assert_eq!(names, vec!["First", "New"]);
    }

    #[test]
    fn test_multiple_names_merge_into_one() {
        let mut doc = doc(
            r#"<Project>
  <PropertyGroup>
    <TargetFrameworkVersion>v4.5</TargetFrameworkVersion>
    <TargetFramework>net45</TargetFramework>
  </PropertyGroup>
</Project>"#,
        );
        let element = doc.new_element("TargetFrameworks", "net45;net46");
        replace_with(
            &mut doc,
            Some(element),
            &["TargetFrameworkVersion", "TargetFramework", "TargetFrameworks"],
        )
        .unwrap();

        let primary = doc.primary_property_group().unwrap();
        let names: Vec<&str> = primary.elements().map(|e| e.name()).collect();
        assert_eq!(names, vec!["TargetFrameworks"]);
    }

    #[test]
    fn test_duplicate_names_are_ignored() {
        let doc = doc(ORDERING);
        let once = find_existing(&doc, &["X"]).unwrap();
        let twice = find_existing(&doc, &["X", "X"]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_store_detects_ties() {
        let doc = doc(ORDERING);
        let id = doc.property("X", false).unwrap().id();

        let mut last = None;
        let mut others = Superseded::new();
        store(id, &mut last, &mut others).unwrap();
        assert!(matches!(
            store(id, &mut last, &mut others),
            Err(ProjectEditError::AmbiguousOrdering { .. })
        ));
    }

    #[test]
    fn test_all_ends_with_overall_last() {
        let doc = doc(ORDERING);
        let found = find_existing(&doc, &["X"]).unwrap();
        let all = found.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().copied(), found.overall_last());
        assert_eq!(found.all_conditional().count(), 1);
        assert_eq!(found.all_unconditional().count(), 2);
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let mut doc = doc(ORDERING);
        let before = doc.to_xml();
        let element = doc.new_element("X", "z");
        let plan = plan_replace(&doc, Some(element), &["X"]).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(doc.to_xml(), before);
    }
}
