//! In-memory model of a project file
//!
//! A project is an ordered sequence of property groups, each optionally
//! guarded by a `Condition`, each holding ordered property elements. Every
//! element carries an [`ElementId`] drawn from a per-document counter, so
//! comparing ids is comparing document order.

mod edit;
mod reader;
mod writer;


pub use edit::*;

use crate::error::{ProjectEditError, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Name of the attribute guarding groups and elements
pub const CONDITION_ATTRIBUTE: &str = "Condition";

/// Local name of a property group element
pub const PROPERTY_GROUP: &str = "PropertyGroup";

/// Document position of a property element
///
/// Ids increase monotonically with creation: elements loaded from source are
/// numbered in source order, elements created later sort after them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(u64);

impl ElementId {
    pub fn index(self) -> u64 {
        self.0
    }

    /// True if `self` is positioned after `other`
    pub fn is_after(self, other: ElementId) -> bool {
        self > other
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a property group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(usize);

impl GroupId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}", self.0)
    }
}

/// Attribute list in source order
pub type Attributes = Vec<(String, String)>;

fn attribute<'a>(attributes: &'a Attributes, name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Present and non-blank `Condition` attribute
fn condition(attributes: &Attributes) -> Option<&str> {
    attribute(attributes, CONDITION_ATTRIBUTE).filter(|c| !c.trim().is_empty())
}

/// Element name without its namespace prefix
pub fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// A named property declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyElement {
    id: ElementId,
    name: String,
    value: String,
    attributes: Attributes,
    /// `value` is inner markup to be written verbatim
    raw: bool,
}

impl PropertyElement {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The element's own `Condition`, if any
    pub fn condition(&self) -> Option<&str> {
        condition(&self.attributes)
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// Add or overwrite an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }
}

/// Content of a property group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEntry {
    Property(PropertyElement),
    /// Comments and other markup kept as written
    Markup(String),
}

/// An ordered container of property elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyGroup {
    id: GroupId,
    attributes: Attributes,
    entries: Vec<GroupEntry>,
}

impl PropertyGroup {
    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The group's `Condition`; blank conditions count as absent
    pub fn condition(&self) -> Option<&str> {
        condition(&self.attributes)
    }

    pub fn is_conditional(&self) -> bool {
        self.condition().is_some()
    }

    pub fn entries(&self) -> &[GroupEntry] {
        &self.entries
    }

    /// Property elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &PropertyElement> {
        self.entries.iter().filter_map(|entry| match entry {
            GroupEntry::Property(element) => Some(element),
            GroupEntry::Markup(_) => None,
        })
    }

    fn position_of(&self, id: ElementId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| matches!(entry, GroupEntry::Property(e) if e.id == id))
    }
}

/// Top-level content of the project element
#[derive(Debug, Clone, PartialEq, Eq)]
enum RootNode {
    Group(GroupId),
    Markup(String),
}

/// A loaded project file
#[derive(Debug, Clone, Default)]
pub struct ProjectDocument {
    /// Declaration and comments before the root element
    prolog: String,
    root_name: String,
    root_attributes: Attributes,
    children: Vec<RootNode>,
    groups: Vec<PropertyGroup>,
    locations: AHashMap<ElementId, GroupId>,
    next_id: u64,
    /// Anything after the root element
    epilog: String,
}

impl ProjectDocument {
    /// An empty project with the given root element name
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            ..Default::default()
        }
    }

    /// Parse a project from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        reader::read_document(xml)
    }

    /// Load a project file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    /// Serialize the project back to XML
    pub fn to_xml(&self) -> String {
        writer::write_document(self)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_xml())?;
        Ok(())
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Property groups in document order
    pub fn property_groups(&self) -> impl Iterator<Item = &PropertyGroup> {
        self.children.iter().filter_map(move |child| match child {
            RootNode::Group(id) => self.groups.get(id.0),
            RootNode::Markup(_) => None,
        })
    }

    pub fn unconditional_groups(&self) -> impl Iterator<Item = &PropertyGroup> {
        self.property_groups().filter(|g| !g.is_conditional())
    }

    pub fn conditional_groups(&self) -> impl Iterator<Item = &PropertyGroup> {
        self.property_groups().filter(|g| g.is_conditional())
    }

    /// The first unconditional group; new properties are appended here
    pub fn primary_property_group(&self) -> Result<&PropertyGroup> {
        self.unconditional_groups()
            .next()
            .ok_or(ProjectEditError::MissingPrimaryGroup)
    }

    pub fn group(&self, id: GroupId) -> Option<&PropertyGroup> {
        self.groups.get(id.0)
    }

    /// Append a new property group after all existing content
    pub fn add_property_group(&mut self, condition: Option<&str>) -> GroupId {
        let attributes = condition
            .map(|c| vec![(CONDITION_ATTRIBUTE.to_string(), c.to_string())])
            .unwrap_or_default();
        self.push_group(attributes)
    }

    /// Create a detached element positioned after everything created so far
    pub fn new_element(&mut self, name: impl Into<String>, value: impl Into<String>) -> PropertyElement {
        PropertyElement {
            id: self.allocate_id(),
            name: name.into(),
            value: value.into(),
            attributes: Vec::new(),
            raw: false,
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&PropertyElement> {
        let group = self.groups.get(self.locations.get(&id)?.0)?;
        group.elements().find(|e| e.id == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.locations.contains_key(&id)
    }

    pub fn group_of(&self, id: ElementId) -> Option<&PropertyGroup> {
        self.locations.get(&id).and_then(|g| self.groups.get(g.0))
    }

    /// The condition guarding an element: its own, else its group's
    pub fn condition_of(&self, id: ElementId) -> Option<&str> {
        let element = self.element(id)?;
        element
            .condition()
            .or_else(|| self.group_of(id).and_then(|g| g.condition()))
    }

    pub fn is_conditional(&self, id: ElementId) -> bool {
        self.condition_of(id).is_some()
    }

    /// Every element named `name`, split by whether a condition guards it
    ///
    /// Names match on the local part, ignoring any namespace prefix.
    pub fn property_all(&self, name: &str) -> (Vec<&PropertyElement>, Vec<(&str, &PropertyElement)>) {
        let mut unconditional = Vec::new();
        let mut conditional = Vec::new();

        for group in self.property_groups() {
            for element in group.elements().filter(|e| e.local_name() == name) {
                match element.condition().or_else(|| group.condition()) {
                    Some(condition) => conditional.push((condition, element)),
                    None => unconditional.push(element),
                }
            }
        }

        (unconditional, conditional)
    }

    /// The last unconditional declaration, or optionally the last conditional one
    pub fn property(&self, name: &str, try_conditional: bool) -> Option<&PropertyElement> {
        let (unconditional, conditional) = self.property_all(name);
        unconditional.last().copied().or_else(|| {
            if try_conditional {
                conditional.last().map(|(_, element)| *element)
            } else {
                None
            }
        })
    }

    /// Count of property elements across all groups
    pub fn element_count(&self) -> usize {
        self.locations.len()
    }

    fn allocate_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn push_group(&mut self, attributes: Attributes) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups.push(PropertyGroup {
            id,
            attributes,
            entries: Vec::new(),
        });
        self.children.push(RootNode::Group(id));
        id
    }

    pub(crate) fn push_root_markup(&mut self, markup: String) {
        self.children.push(RootNode::Markup(markup));
    }

    pub(crate) fn push_group_markup(&mut self, group: GroupId, markup: String) {
        self.groups[group.0].entries.push(GroupEntry::Markup(markup));
    }

    pub(crate) fn push_loaded_element(
        &mut self,
        group: GroupId,
        name: String,
        value: String,
        attributes: Attributes,
        raw: bool,
    ) -> ElementId {
        let id = self.allocate_id();
        self.groups[group.0].entries.push(GroupEntry::Property(PropertyElement {
            id,
            name,
            value,
            attributes,
            raw,
        }));
        self.locations.insert(id, group);
        id
    }
}
