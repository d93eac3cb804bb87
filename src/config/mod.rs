//! Global properties configuration
//!
//! Global properties are the values a caller supplies when evaluating
//! conditions, typically loaded from JSON:
//!
//! ```json
//! {
//!   "properties": { "Configuration": "Release", "Platform": "AnyCPU" },
//!   "items": { "Compile": ["a.cs", "b.cs"] },
//!   "known_paths": ["obj/", "packages.config"]
//! }
//! ```
//!
//! Names are case-insensitive, like the references in conditions.

use crate::condition::ConditionEvaluationState;
use crate::error::Result;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk shape of [`GlobalProperties`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct GlobalPropertiesFile {
    properties: AHashMap<String, String>,
    items: AHashMap<String, Vec<String>>,
    known_paths: Option<Vec<String>>,
}

/// Property, item and path knowledge used to evaluate conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GlobalPropertiesFile")]
pub struct GlobalProperties {
    properties: AHashMap<String, String>,
    items: AHashMap<String, Vec<String>>,
    /// `None` when the caller cannot tell which paths exist
    known_paths: Option<AHashSet<String>>,
}

impl From<GlobalPropertiesFile> for GlobalProperties {
    fn from(file: GlobalPropertiesFile) -> Self {
        let mut globals = GlobalProperties::new();
        for (name, value) in file.properties {
            globals.set_property(&name, value);
        }
        for (name, values) in file.items {
            globals.items.insert(name.to_ascii_lowercase(), values);
        }
        if let Some(paths) = file.known_paths {
            let known = globals.known_paths.get_or_insert_with(AHashSet::new);
            known.extend(paths.iter().map(|p| normalize_path(p)));
        }
        globals
    }
}

/// Lowercase, forward slashes, no trailing separator
fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/").to_ascii_lowercase();
    match path.trim_end_matches('/') {
        "" if !path.is_empty() => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

impl GlobalProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse global properties from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load global properties from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn with_item(mut self, name: &str, values: Vec<String>) -> Self {
        self.items.insert(name.to_ascii_lowercase(), values);
        self
    }

    /// Mark `path` as existing; once any path is known, others are reported missing
    pub fn with_path(mut self, path: &str) -> Self {
        self.known_paths
            .get_or_insert_with(AHashSet::new)
            .insert(normalize_path(path));
        self
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        self.properties.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for GlobalProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut globals = GlobalProperties::new();
        for (name, value) in iter {
            globals.set_property(name.as_ref(), value);
        }
        globals
    }
}

impl ConditionEvaluationState for GlobalProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    fn item(&self, name: &str) -> Option<Vec<String>> {
        self.items.get(&name.to_ascii_lowercase()).cloned()
    }

    fn path_exists(&self, path: &str) -> Option<bool> {
        self.known_paths
            .as_ref()
            .map(|known| known.contains(&normalize_path(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::check_condition;

    #[test]
    fn test_names_are_case_insensitive() {
        let globals = GlobalProperties::new().with_property("Configuration", "Debug");
        assert_eq!(globals.get("configuration"), Some("Debug"));
        assert_eq!(globals.property("CONFIGURATION"), Some("Debug".to_string()));
        assert_eq!(globals.get("Platform"), None);
    }

    #[test]
    fn test_from_json() {
        let globals = GlobalProperties::from_json(
            r#"{
                "properties": { "Configuration": "Release" },
                "items": { "Compile": ["a.cs", "b.cs"] },
                "known_paths": ["obj\\"]
            }"#,
        )
        .unwrap();

        assert_eq!(globals.get("configuration"), Some("Release"));
        assert_eq!(
            globals.item("compile"),
            Some(vec!["a.cs".to_string(), "b.cs".to_string()])
        );
        assert_eq!(globals.path_exists("OBJ"), Some(true));
        assert_eq!(globals.path_exists("bin/"), Some(false));
    }

    #[test]
    fn test_from_json_defaults() {
        let globals = GlobalProperties::from_json("{}").unwrap();
        assert!(globals.is_empty());
        assert_eq!(globals.path_exists("obj"), None);
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(matches!(
            GlobalProperties::from_json(r#"{"properties": []}"#),
            Err(crate::error::ProjectEditError::Config(_))
        ));
    }

    #[test]
    fn test_from_iterator() {
        let globals: GlobalProperties = [("A", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(globals.len(), 2);
        assert_eq!(globals.get("a"), Some("1"));
        assert_eq!(globals.get("B"), Some("2"));
    }

    #[test]
    fn test_drives_condition_evaluation() {
        let globals = GlobalProperties::new()
            .with_property("Configuration", "Debug")
            .with_item("Compile", vec!["a.cs".to_string()])
            .with_path("src/");

        assert_eq!(check_condition("'$(configuration)' == 'debug'", &globals), Ok(Some(true)));
        assert_eq!(check_condition("'@(Compile)' == 'a.cs'", &globals), Ok(Some(true)));
        assert_eq!(check_condition("Exists('src')", &globals), Ok(Some(true)));
        assert_eq!(check_condition("Exists('lib')", &globals), Ok(Some(false)));
        assert_eq!(check_condition("'$(Platform)' == 'x64'", &globals), Ok(None));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("Bin\\Debug\\"), "bin/debug");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "");
    }
}
