//! Turn an extracted JSON candidate into the three persisted scene documents.
//!
//! Size caps are enforced by truncation, keeping the first N entries in order.
//! Field values are not checked unless strict validation is on.

use std::collections::HashSet;

use serde_json::{Map, Value};
use worldforge_domain::{
    CharacterConfig, Objectives, SceneConfig, SceneDocuments, MAX_ACCESSORIES, MAX_NPCS,
    MAX_PHYSICS_OBJECTS, MAX_STATIC_OBJECTS,
};

const REQUIRED_KEYS: [&str; 3] = ["terrain", "characterSpawn", "characterAppearance"];
const COLOR_KEYS: [&str; 3] = ["color", "hairColor", "skinTone"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneValidationError {
    /// Candidate is not valid JSON, or not a JSON object.
    #[error("Malformed model output: {0}")]
    Parse(String),
    #[error("Incomplete schema: missing '{0}'")]
    MissingField(&'static str),
    /// Structural or strict-mode value violation.
    #[error("Incomplete schema: {0}")]
    Invalid(String),
}

/// Parse, check and split a candidate object.
pub fn normalize_scene(candidate: &str, strict: bool) -> Result<SceneDocuments, SceneValidationError> {
    let parsed: Value =
        serde_json::from_str(candidate).map_err(|e| SceneValidationError::Parse(e.to_string()))?;
    let Value::Object(mut root) = parsed else {
        return Err(SceneValidationError::Parse(
            "top-level value is not an object".to_string(),
        ));
    };

    for key in REQUIRED_KEYS {
        if !root.contains_key(key) {
            return Err(SceneValidationError::MissingField(key));
        }
    }

    let mut character = match root.remove("characterAppearance") {
        Some(Value::Object(map)) => map,
        _ => {
            return Err(SceneValidationError::Invalid(
                "'characterAppearance' must be an object".to_string(),
            ))
        }
    };

    let objectives = match root.remove("objectives") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(SceneValidationError::Invalid(
                "'objectives' must be an array".to_string(),
            ))
        }
    };

    truncate_array(&mut root, "staticObjects", MAX_STATIC_OBJECTS);
    truncate_array(&mut root, "physicsObjects", MAX_PHYSICS_OBJECTS);
    truncate_array(&mut root, "npcs", MAX_NPCS);
    truncate_array(&mut character, "accessories", MAX_ACCESSORIES);

    if strict {
        check_strict(&root, &character, &objectives)?;
    }

    Ok(SceneDocuments::new(
        SceneConfig::from_map(root),
        CharacterConfig::from_map(character),
        Objectives::new(objectives),
    ))
}

fn truncate_array(map: &mut Map<String, Value>, key: &str, cap: usize) {
    if let Some(Value::Array(items)) = map.get_mut(key) {
        if items.len() > cap {
            tracing::debug!(key, count = items.len(), cap, "Truncating oversized collection");
            items.truncate(cap);
        }
    }
}

// =============================================================================
// Strict mode
// =============================================================================

fn check_strict(
    scene: &Map<String, Value>,
    character: &Map<String, Value>,
    objectives: &[Value],
) -> Result<(), SceneValidationError> {
    check_position("characterSpawn", scene.get("characterSpawn"))?;

    for key in ["staticObjects", "physicsObjects", "npcs", "lights"] {
        if let Some(Value::Array(items)) = scene.get(key) {
            for (index, item) in items.iter().enumerate() {
                if let Some(position) = item.get("position") {
                    check_position(&format!("{key}[{index}].position"), Some(position))?;
                }
            }
        }
    }

    check_colors("scene", &Value::Object(scene.clone()))?;
    check_colors("characterAppearance", &Value::Object(character.clone()))?;

    let mut seen = HashSet::new();
    for (index, objective) in objectives.iter().enumerate() {
        let id = objective
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                SceneValidationError::Invalid(format!("objectives[{index}] has no string id"))
            })?;
        if !seen.insert(id) {
            return Err(SceneValidationError::Invalid(format!(
                "duplicate objective id '{id}'"
            )));
        }
    }

    Ok(())
}

fn check_position(path: &str, value: Option<&Value>) -> Result<(), SceneValidationError> {
    let is_vec3 = value
        .and_then(Value::as_array)
        .is_some_and(|parts| parts.len() == 3 && parts.iter().all(Value::is_number));
    if is_vec3 {
        Ok(())
    } else {
        Err(SceneValidationError::Invalid(format!(
            "'{path}' must be three numbers"
        )))
    }
}

fn check_colors(path: &str, value: &Value) -> Result<(), SceneValidationError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                if COLOR_KEYS.contains(&key.as_str()) {
                    if let Some(color) = child.as_str() {
                        if !is_hex_color(color) {
                            return Err(SceneValidationError::Invalid(format!(
                                "'{child_path}' is not a hex color: {color}"
                            )));
                        }
                        continue;
                    }
                }
                check_colors(&child_path, child)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                check_colors(&format!("{path}[{index}]"), item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn is_hex_color(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}
