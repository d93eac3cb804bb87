//! Document mutations
//!
//! Edits are computed against a borrowed document first and applied in one
//! step afterwards. `apply` validates the whole plan before touching the
//! document, so a rejected plan leaves it unchanged.

use super::{GroupEntry, GroupId, ProjectDocument, PropertyElement};
use crate::document::ElementId;
use crate::error::{ProjectEditError, Result};
use ahash::AHashSet;
use tracing::debug;

/// A single document mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Remove an element from its group
    Remove(ElementId),
    /// Put `element` where `target` is; it takes over the target's position and id
    Replace {
        target: ElementId,
        element: PropertyElement,
    },
    /// Add `element` at the end of `group`
    Append {
        group: GroupId,
        element: PropertyElement,
    },
}

/// Ordered list of edits applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    edits: Vec<Edit>,
}

impl EditPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&mut self, target: ElementId) {
        self.edits.push(Edit::Remove(target));
    }

    pub fn replace(&mut self, target: ElementId, element: PropertyElement) {
        self.edits.push(Edit::Replace { target, element });
    }

    pub fn append(&mut self, group: GroupId, element: PropertyElement) {
        self.edits.push(Edit::Append { group, element });
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Ids of the elements this plan removes or replaces
    pub fn removed(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.edits.iter().filter_map(|edit| match edit {
            Edit::Remove(target) | Edit::Replace { target, .. } => Some(*target),
            Edit::Append { .. } => None,
        })
    }
}

impl IntoIterator for EditPlan {
    type Item = Edit;
    type IntoIter = std::vec::IntoIter<Edit>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.into_iter()
    }
}

impl ProjectDocument {
    /// Apply every edit of `plan`, or none of them
    pub fn apply(&mut self, plan: EditPlan) -> Result<()> {
        self.validate(&plan)?;

        for edit in plan {
            match edit {
                Edit::Remove(target) => {
                    let (group, index) = self.locate(target)?;
                    self.groups[group.index()].entries.remove(index);
                    self.locations.remove(&target);
                    debug!(element = %target, %group, "Removed property");
                }
                Edit::Replace { target, mut element } => {
                    let (group, index) = self.locate(target)?;
                    element.id = target;
                    debug!(element = %target, name = %element.name, "Replaced property");
                    self.groups[group.index()].entries[index] = GroupEntry::Property(element);
                }
                Edit::Append { group, element } => {
                    self.adopt(group, &element);
                    debug!(element = %element.id, name = %element.name, %group, "Appended property");
                    self.groups[group.index()].entries.push(GroupEntry::Property(element));
                }
            }
        }

        Ok(())
    }

    fn validate(&self, plan: &EditPlan) -> Result<()> {
        let mut touched = AHashSet::new();
        let mut inserted = AHashSet::new();

        for edit in plan.edits() {
            match edit {
                Edit::Remove(target) | Edit::Replace { target, .. } => {
                    if !self.contains(*target) {
                        return Err(ProjectEditError::UnknownElement(*target));
                    }
                    if !touched.insert(*target) {
                        return Err(ProjectEditError::DuplicateElement(*target));
                    }
                }
                Edit::Append { group, .. } => {
                    if self.group(*group).is_none() {
                        return Err(ProjectEditError::UnknownGroup(*group));
                    }
                }
            }

            if let Edit::Append { element, .. } = edit {
                if self.contains(element.id) || !inserted.insert(element.id) {
                    return Err(ProjectEditError::DuplicateElement(element.id));
                }
            }
        }

        Ok(())
    }

    fn locate(&self, id: ElementId) -> Result<(GroupId, usize)> {
        let group = *self
            .locations
            .get(&id)
            .ok_or(ProjectEditError::UnknownElement(id))?;
        let index = self.groups[group.index()]
            .position_of(id)
            .ok_or(ProjectEditError::UnknownElement(id))?;
        Ok((group, index))
    }

    /// Register an element created elsewhere as living in `group`
    fn adopt(&mut self, group: GroupId, element: &PropertyElement) {
        self.locations.insert(element.id, group);
        self.next_id = self.next_id.max(element.id.index() + 1);
    }
}
