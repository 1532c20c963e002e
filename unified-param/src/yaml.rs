//! YAML parameter override files.
//!
//! Nested mappings flatten into `/`-separated parameter paths:
//!
//! ```yaml
//! geometry:
//!   transform:
//!     scale: 2
//! material/color/diffuse: [0.8, 0.2, 0.2]
//! rendering:
//!   mode:
//!     display_mode: wireframe
//! ```
//!
//! Values are inferred from the YAML scalar and later coerced to the type of
//! the registered leaf, so `scale: 2` lands as a double and `wireframe` as a
//! [`DisplayMode`](crate::value::DisplayMode).

use std::collections::BTreeMap;
use std::path::Path;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::tree::{LoadReport, ParameterTree};
use crate::value::{Color, ParameterValue};

/// Load and flatten an override file.
pub fn load_override_file(path: &Path) -> Result<BTreeMap<String, ParameterValue>> {
    let content = std::fs::read_to_string(path)?;
    load_override_string(&content)
}

/// Parse a YAML document into `path -> value` overrides.
pub fn load_override_string(yaml: &str) -> Result<BTreeMap<String, ParameterValue>> {
    let doc: Value = serde_yaml::from_str(yaml)?;
    let mut result = BTreeMap::new();
    match &doc {
        Value::Mapping(_) => flatten("", &doc, &mut result)?,
        Value::Null => {}
        _ => return Err(Error::Custom("YAML root must be a mapping".into())),
    }
    Ok(result)
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, ParameterValue>) -> Result<()> {
    let Value::Mapping(map) = value else {
        match yaml_value_to_parameter(value) {
            Some(v) => {
                out.insert(prefix.to_string(), v);
            }
            None => warn!("[PARAMS] Unsupported override value for '{}'", prefix),
        }
        return Ok(());
    };
    for (key, child) in map {
        let key = key
            .as_str()
            .ok_or_else(|| Error::Custom(format!("keys under '{}' must be strings", prefix)))?
            .trim_matches('/');
        let path = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        };
        flatten(&path, child, out)?;
    }
    Ok(())
}

/// Convert a YAML value to a ParameterValue.
///
/// - Integer YAML values → Integer
/// - Float YAML values → Double
/// - Boolean YAML values → Bool
/// - String YAML values → String
/// - Sequence of three numbers → Color
fn yaml_value_to_parameter(val: &Value) -> Option<ParameterValue> {
    match val {
        Value::Bool(b) => Some(ParameterValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(ParameterValue::Integer)
            .or_else(|| n.as_f64().map(ParameterValue::Double)),
        Value::String(s) => Some(ParameterValue::String(s.clone())),
        Value::Sequence(seq) => sequence_to_color(seq).map(ParameterValue::Color),
        _ => None,
    }
}

fn sequence_to_color(seq: &[Value]) -> Option<Color> {
    let components: Option<Vec<f64>> = seq.iter().map(Value::as_f64).collect();
    match components?.as_slice() {
        [r, g, b] => Some(Color::rgb(*r, *g, *b)),
        _ => None,
    }
}

/// Apply overrides to registered leaves inside one batch window.
///
/// Each value is coerced to the registered leaf's type first. Unregistered
/// paths are counted as unknown.
pub fn apply_overrides(
    tree: &ParameterTree,
    overrides: &BTreeMap<String, ParameterValue>,
) -> LoadReport {
    let opened = tree.begin_batch_update();
    let mut report = LoadReport::default();
    for (path, raw) in overrides {
        if !tree.has_parameter(path) {
            debug!("[PARAMS] Override for unknown parameter '{}'", path);
            report.unknown += 1;
            continue;
        }
        let current = tree.get_parameter_value(path);
        let Some(value) = raw.coerce_to(&current) else {
            warn!(
                "[PARAMS] Override '{}' = {} does not fit {}",
                path,
                raw,
                current.parameter_type()
            );
            report.rejected += 1;
            continue;
        };
        if tree.set_parameter_value(path, value).is_applied() {
            report.applied += 1;
        } else {
            report.rejected += 1;
        }
    }
    if opened {
        tree.end_batch_update();
    }
    report
}
