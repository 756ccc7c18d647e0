//! Assistant configuration.
//!
//! The subfolder list and the keyword-to-tag table are office policy,
//! not code. They ship as compiled-in defaults matching the office
//! standard and can be overridden from a TOML file (`config/default.toml`)
//! without recompiling.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// Fixed, ordered set of subfolders created under every project folder.
const STANDARD_SUBFOLDERS: [&str; 8] = [
    "01_Admin",
    "02_Pläne",
    "03_Korrespondenz",
    "04_Fotos",
    "05_Berechnungen",
    "06_Ausschreibung",
    "07_Verträge",
    "08_Protokolle",
];

/// Keyword-to-tag table for auto-tagging tasks. Triggers are matched
/// case-insensitively as substrings of the task text.
const TAG_KEYWORDS: [(&str, &[&str]); 8] = [
    ("TBO", &["tbo", "bauordnung", "tiroler bauordnung"]),
    ("Stellplatz", &["stellplatz", "parkplatz", "tiefgarage"]),
    ("Schneelast", &["schneelast", "schnee", "dachlast"]),
    ("Behörde", &["bh", "gemeinde", "bauamt", "bezirkshauptmannschaft"]),
    ("ÖBA", &["öba", "bauaufsicht", "örtliche bauaufsicht"]),
    ("Widmung", &["widmung", "umwidmung", "bauland"]),
    ("Hanglage", &["hang", "hanglage", "böschung"]),
    ("WLV", &["wlv", "wildbach", "lawine", "gefahrenzone"]),
];

/// Filler words stripped from user-supplied project base names.
const PROJECT_NAME_FILLERS: [&str; 2] = ["neues projekt", "projekt"];

/// Runtime configuration for the workflow layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Ordered subfolder names created under each new project folder.
    pub subfolders: Vec<String>,
    /// Tag name -> case-insensitive trigger substrings.
    pub tag_keywords: BTreeMap<String, Vec<String>>,
    /// Filler words stripped from project base names, lowercase.
    pub name_fillers: Vec<String>,
    /// IANA timezone the office operates in.
    pub timezone: String,
    /// Storage folder id all project folders are created under.
    /// `None` means the provider's root.
    pub storage_root_folder_id: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            subfolders: STANDARD_SUBFOLDERS.iter().map(|s| s.to_string()).collect(),
            tag_keywords: TAG_KEYWORDS
                .iter()
                .map(|(tag, triggers)| {
                    (
                        tag.to_string(),
                        triggers.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
            name_fillers: PROJECT_NAME_FILLERS.iter().map(|s| s.to_string()).collect(),
            timezone: "Europe/Vienna".to_string(),
            storage_root_folder_id: None,
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file, falling back to the
    /// compiled-in defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("failed to parse {}: {e}", path.display())))?;

        if config.subfolders.is_empty() {
            warn!("config lists no subfolders, new projects get a bare folder");
        }

        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_office_folder_standard() {
        let config = AssistantConfig::default();
        assert_eq!(config.subfolders.len(), 8);
        assert_eq!(config.subfolders[0], "01_Admin");
        assert_eq!(config.subfolders[7], "08_Protokolle");
    }

    #[test]
    fn defaults_carry_the_tag_table() {
        let config = AssistantConfig::default();
        assert_eq!(config.tag_keywords.len(), 8);
        assert!(config.tag_keywords["WLV"].contains(&"lawine".to_string()));
        assert!(config.tag_keywords["Behörde"].contains(&"bauamt".to_string()));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AssistantConfig::load("/nonexistent/baubot.toml").unwrap();
        assert_eq!(config.timezone, "Europe/Vienna");
    }

    #[test]
    fn toml_overrides_replace_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            subfolders = ["01_Unterlagen"]
            timezone = "Europe/Berlin"
            "#,
        )
        .unwrap();

        let config = AssistantConfig::load(&path).unwrap();
        assert_eq!(config.subfolders, vec!["01_Unterlagen"]);
        assert_eq!(config.timezone, "Europe/Berlin");
        // untouched keys keep their defaults
        assert_eq!(config.tag_keywords.len(), 8);
    }
}
