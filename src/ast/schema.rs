//! Typed header sub-models: `config`, `input`, `output`, `metadata`
//!
//! ```yaml
//! config:
//!   temperature: 0.7
//!   maxOutputTokens: 4000
//! input:
//!   default:
//!     project_path: "."
//!   schema:
//!     project_path:
//!       type: string
//!       description: Project to analyze
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value as YamlValue;

/// Model generation settings (`config:`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default, alias = "max_output_tokens", alias = "max-output-tokens")]
    pub max_output_tokens: Option<i64>,
    #[serde(default, alias = "top_p", alias = "top-p")]
    pub top_p: Option<f64>,
    #[serde(default, alias = "stop_sequences", alias = "stop-sequences")]
    pub stop_sequences: Vec<String>,
}

impl ModelConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Declared workflow inputs (`input:`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Parameter → default value
    #[serde(default)]
    pub default: BTreeMap<String, YamlValue>,
    /// Parameter → declaration. `None` when the header has no `schema:` key.
    #[serde(default)]
    pub schema: Option<BTreeMap<String, ParameterSpec>>,
}

impl InputSpec {
    /// Check if a parameter is declared in the schema
    pub fn declares(&self, name: &str) -> bool {
        self.schema
            .as_ref()
            .is_some_and(|schema| schema.contains_key(name))
    }

    /// Default for a parameter: explicit `default:` map first, then the schema entry
    pub fn default_for(&self, name: &str) -> Option<&YamlValue> {
        self.default.get(name).or_else(|| {
            self.schema
                .as_ref()
                .and_then(|schema| schema.get(name))
                .and_then(|spec| spec.default.as_ref())
        })
    }
}

/// One input parameter declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(default, rename = "type")]
    pub param_type: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Vec<YamlValue>,
    #[serde(default)]
    pub default: Option<YamlValue>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Expected output shape (`output:`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub schema: Option<YamlValue>,
}

/// Free-form descriptive fields (`metadata:`)
///
/// Well-known keys get their own field; everything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, deserialize_with = "opt_scalar")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub author: Option<String>,
    /// `version: 1.0` reads as `"1.0"`
    #[serde(default, deserialize_with = "opt_scalar")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

/// Render a YAML scalar as its text form; numbers and booleans are accepted
fn scalar_to_string<E: serde::de::Error>(value: YamlValue) -> Result<String, E> {
    match value {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        other => Err(E::custom(format!(
            "expected a string, number or boolean, found {}",
            yaml_kind(&other)
        ))),
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Sequence(_) => "a sequence",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
        _ => "a scalar",
    }
}

fn opt_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<YamlValue>::deserialize(deserializer)? {
        None | Some(YamlValue::Null) => Ok(None),
        Some(value) => scalar_to_string(value).map(Some),
    }
}

fn scalar_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Vec::<YamlValue>::deserialize(deserializer)?
        .into_iter()
        .map(scalar_to_string::<D::Error>)
        .collect()
}
