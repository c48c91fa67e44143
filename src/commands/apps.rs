//! Registry of applications the remote can start and stop.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Name passed to the terminate command.
    pub executable_name: String,
    /// Name as it appears in the process table (compared case-insensitively).
    pub process_name: String,
    pub launch_command: String,
    #[serde(default = "default_closable")]
    pub closable: bool,
}

fn default_closable() -> bool {
    true
}

/// Immutable lookup table built once from settings.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    apps: BTreeMap<String, AppDescriptor>,
}

impl AppRegistry {
    pub fn new(apps: BTreeMap<String, AppDescriptor>) -> Self {
        Self { apps }
    }

    pub fn get(&self, key: &str) -> Option<&AppDescriptor> {
        self.apps.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AppDescriptor)> {
        self.apps.iter()
    }
}

/// `task_manager` → `Task_Manager`.
pub fn display_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut at_word_start = true;
    for c in key.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_title_cases_each_word() {
        assert_eq!(display_name("steam"), "Steam");
        assert_eq!(display_name("task_manager"), "Task_Manager");
        assert_eq!(display_name("npp2go"), "Npp2Go");
    }

    #[test]
    fn test_descriptor_closable_defaults_to_true() {
        let json = r#"{"executable_name":"vlc","process_name":"vlc","launch_command":"vlc"}"#;
        let app: AppDescriptor = serde_json::from_str(json).unwrap();
        assert!(app.closable);
    }

    #[test]
    fn test_registry_lookup() {
        let mut apps = BTreeMap::new();
        apps.insert(
            "vlc".to_string(),
            AppDescriptor {
                executable_name: "vlc".into(),
                process_name: "vlc".into(),
                launch_command: "vlc".into(),
                closable: true,
            },
        );
        let registry = AppRegistry::new(apps);
        assert_eq!(registry.iter().count(), 1);
        assert!(registry.get("vlc").is_some());
        assert!(registry.get("steam").is_none());
    }
}
