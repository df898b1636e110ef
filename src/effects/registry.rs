//! Effect registry - resolves gestures to effects
//!
//! The registry holds the gesture → effect mapping and the per-effect
//! enabled flags. It is persisted as a JSON document of the form
//! `{"gesture_mappings": {"smile": ["liquify"], ...}}`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::effects::builtin::BUILTIN_EFFECTS;
use crate::gestures::{Gesture, GestureState};

/// Errors from reading or writing a stored mapping
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("mapping I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("mapping document is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialized form of the mapping
#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingDocument {
    gesture_mappings: BTreeMap<String, Vec<String>>,
}

/// Gesture → effect mapping with per-effect enablement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectRegistry {
    /// Effect identifiers per gesture, iterated in vocabulary order
    mappings: BTreeMap<Gesture, Vec<String>>,
    /// Enabled flag per effect identifier
    enabled: HashMap<String, bool>,
}

/// Mapping used when no stored mapping is available
pub fn default_mappings() -> BTreeMap<Gesture, Vec<String>> {
    [
        (Gesture::Blink, "flipGravity"),
        (Gesture::Smile, "liquify"),
        (Gesture::RaiseHand, "matrix"),
        (Gesture::HeadTilt, "vhs"),
        (Gesture::BothHandsUp, "slow_motion"),
        (Gesture::MouthOpen, "portal_ripple"),
        (Gesture::EyebrowRaise, "pixel_sort"),
    ]
    .into_iter()
    .map(|(gesture, effect)| (gesture, vec![effect.to_string()]))
    .collect()
}

impl EffectRegistry {
    /// Create a registry with no mappings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the default mapping, every effect enabled
    pub fn with_default_mappings() -> Self {
        let mut registry = Self::new();
        for (gesture, effects) in default_mappings() {
            registry.register_mapping(gesture, effects);
        }
        registry
    }

    // ========== Resolution ==========

    /// Effects to run for a gesture snapshot
    ///
    /// Gestures are visited in vocabulary order and each gesture's effects in
    /// mapping order; an identifier is kept at its first occurrence and only
    /// if enabled.
    pub fn resolve(&self, state: &GestureState) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for (gesture, effects) in &self.mappings {
            if !state.get(*gesture) {
                continue;
            }
            for effect_id in effects {
                if self.is_enabled(effect_id) && seen.insert(effect_id.as_str()) {
                    resolved.push(effect_id.clone());
                }
            }
        }

        resolved
    }

    // ========== Mapping ==========

    /// Replace the effect list for a gesture
    ///
    /// Identifiers seen for the first time start enabled.
    pub fn register_mapping<I, S>(&mut self, gesture: Gesture, effect_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let effects: Vec<String> = effect_ids.into_iter().map(Into::into).collect();
        for effect_id in &effects {
            self.enabled.entry(effect_id.clone()).or_insert(true);
        }
        self.mappings.insert(gesture, effects);
    }

    /// Effects mapped to a gesture
    pub fn mapping(&self, gesture: Gesture) -> &[String] {
        self.mappings
            .get(&gesture)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Full mapping in vocabulary order
    pub fn mappings(&self) -> &BTreeMap<Gesture, Vec<String>> {
        &self.mappings
    }

    // ========== Enablement ==========

    pub fn set_enabled(&mut self, effect_id: &str, enabled: bool) {
        self.enabled.insert(effect_id.to_string(), enabled);
    }

    /// Flip an effect's enabled flag; returns the new value
    pub fn toggle(&mut self, effect_id: &str) -> bool {
        let enabled = !self.is_enabled(effect_id);
        self.set_enabled(effect_id, enabled);
        enabled
    }

    /// Whether an identifier is mapped, flagged, or a built-in effect
    pub fn is_known(&self, effect_id: &str) -> bool {
        self.enabled.contains_key(effect_id) || BUILTIN_EFFECTS.contains(&effect_id)
    }

    /// Unknown identifiers count as enabled
    pub fn is_enabled(&self, effect_id: &str) -> bool {
        self.enabled.get(effect_id).copied().unwrap_or(true)
    }

    /// Enabled flag of every known effect, sorted by identifier
    pub fn enablement(&self) -> BTreeMap<String, bool> {
        self.enabled
            .iter()
            .map(|(id, enabled)| (id.clone(), *enabled))
            .collect()
    }

    // ========== Persistence ==========

    /// Parse a mapping document
    ///
    /// Unknown gesture names are skipped with a warning.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let document: MappingDocument = serde_json::from_str(json)?;
        let mut registry = Self::new();

        for (name, effects) in document.gesture_mappings {
            match name.parse::<Gesture>() {
                Ok(gesture) => registry.register_mapping(gesture, effects),
                Err(_) => tracing::warn!(gesture = %name, "Skipping mapping for unknown gesture"),
            }
        }

        Ok(registry)
    }

    /// Serialize the mapping document
    pub fn to_json(&self) -> Result<String, RegistryError> {
        let document = MappingDocument {
            gesture_mappings: self
                .mappings
                .iter()
                .map(|(gesture, effects)| (gesture.as_str().to_string(), effects.clone()))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Load a stored mapping, falling back to the default
    ///
    /// A missing or malformed file is replaced by the default mapping, which
    /// is then written back to `path`. Never fails.
    pub fn load(path: &Path) -> Self {
        let loaded = match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(registry) => {
                    tracing::info!(path = %path.display(), gestures = registry.mappings.len(), "Loaded gesture mappings");
                    return registry;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Stored gesture mappings are corrupt, using defaults");
                    Self::with_default_mappings()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No stored gesture mappings, using defaults");
                Self::with_default_mappings()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read gesture mappings, using defaults");
                Self::with_default_mappings()
            }
        };

        if let Err(e) = loaded.save(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist default gesture mappings");
        }
        loaded
    }

    /// Write the mapping document to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), "Saved gesture mappings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(gestures: &[Gesture]) -> GestureState {
        let mut state = GestureState::default();
        for &gesture in gestures {
            state.set(gesture, true);
        }
        state
    }

    #[test]
    fn test_resolve_smile_with_defaults() {
        let registry = EffectRegistry::with_default_mappings();
        assert_eq!(registry.resolve(&state(&[Gesture::Smile])), vec!["liquify"]);
    }

    #[test]
    fn test_resolve_skips_disabled() {
        let mut registry = EffectRegistry::with_default_mappings();
        registry.set_enabled("liquify", false);
        assert!(registry.resolve(&state(&[Gesture::Smile])).is_empty());
    }

    #[test]
    fn test_resolve_no_gestures() {
        let registry = EffectRegistry::with_default_mappings();
        assert!(registry.resolve(&GestureState::default()).is_empty());
    }

    #[test]
    fn test_resolve_uses_vocabulary_order_and_dedups() {
        let mut registry = EffectRegistry::new();
        registry.register_mapping(Gesture::HeadTilt, ["vhs", "matrix"]);
        registry.register_mapping(Gesture::Blink, ["matrix", "liquify"]);
        registry.register_mapping(Gesture::Smile, ["liquify"]);

        let resolved = registry.resolve(&state(&[Gesture::HeadTilt, Gesture::Smile, Gesture::Blink]));
        assert_eq!(resolved, vec!["matrix", "liquify", "vhs"]);
    }

    #[test]
    fn test_register_mapping_enables_new_ids_only() {
        let mut registry = EffectRegistry::new();
        registry.set_enabled("vhs", false);
        registry.register_mapping(Gesture::Blink, ["vhs", "matrix"]);
        assert!(!registry.is_enabled("vhs"));
        assert!(registry.is_enabled("matrix"));
        assert_eq!(registry.mapping(Gesture::Blink), ["vhs", "matrix"]);
        assert!(registry.mapping(Gesture::Smile).is_empty());
    }

    #[test]
    fn test_toggle_does_not_touch_mapping() {
        let mut registry = EffectRegistry::with_default_mappings();
        let before = registry.mappings().clone();
        assert!(!registry.toggle("matrix"));
        assert!(registry.toggle("matrix"));
        assert_eq!(registry.mappings(), &before);
    }

    #[test]
    fn test_is_known() {
        let mut registry = EffectRegistry::new();
        assert!(registry.is_known("vhs"));
        assert!(!registry.is_known("custom"));
        registry.register_mapping(Gesture::Blink, ["custom"]);
        assert!(registry.is_known("custom"));
        assert!(!registry.is_known("bogus"));
    }

    #[test]
    fn test_json_roundtrip_format() {
        let registry = EffectRegistry::with_default_mappings();
        let json = registry.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["gesture_mappings"]["smile"][0], "liquify");
        assert_eq!(EffectRegistry::from_json(&json).unwrap(), registry);
    }

    #[test]
    fn test_from_json_skips_unknown_gestures() {
        let json = r#"{"gesture_mappings": {"wink": ["vhs"], "smile": ["matrix"]}}"#;
        let registry = EffectRegistry::from_json(json).unwrap();
        assert_eq!(registry.mappings().len(), 1);
        assert_eq!(registry.mapping(Gesture::Smile), ["matrix"]);
    }

    #[test]
    fn test_load_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gesture_mappings.json");

        let registry = EffectRegistry::load(&path);
        assert_eq!(registry, EffectRegistry::with_default_mappings());
        assert!(path.exists());

        let reloaded = EffectRegistry::load(&path);
        assert_eq!(reloaded, registry);
    }

    #[test]
    fn test_load_corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gesture_mappings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let registry = EffectRegistry::load(&path);
        assert_eq!(registry, EffectRegistry::with_default_mappings());

        // Corrupt file was replaced by the default document
        let stored = std::fs::read_to_string(&path).unwrap();
        assert!(EffectRegistry::from_json(&stored).is_ok());
    }

    #[test]
    fn test_load_stored_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gesture_mappings.json");
        let mut custom = EffectRegistry::new();
        custom.register_mapping(Gesture::RaiseHand, ["vhs", "pixel_sort"]);
        custom.save(&path).unwrap();

        let loaded = EffectRegistry::load(&path);
        assert_eq!(loaded.mapping(Gesture::RaiseHand), ["vhs", "pixel_sort"]);
        assert!(loaded.mapping(Gesture::Smile).is_empty());
    }
}
