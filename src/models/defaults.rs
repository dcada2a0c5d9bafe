use crate::error::{BotError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values used to prefill `create` arguments the caller leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    pub cfg_scale: f64,
    pub width: u32,
    pub height: u32,
    pub seed: i64,
    pub show: bool,
    pub steps: u32,
    pub batch: u32,
    pub sampler: String,
    pub save_image: bool,
    pub grid: bool,
    pub hires_fix: bool,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            cfg_scale: 5.0,
            width: 512,
            height: 512,
            seed: -1,
            show: true,
            steps: 20,
            batch: 1,
            sampler: "Euler a".to_string(),
            save_image: true,
            grid: true,
            hires_fix: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::Text => "string",
        }
    }

    /// Parses `raw` into exactly this kind. `None` means the text does not fit.
    pub fn parse(&self, raw: &str) -> Option<DefaultValue> {
        let raw = raw.trim();
        match self {
            FieldKind::Integer => raw.parse::<i64>().ok().map(DefaultValue::Integer),
            FieldKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(DefaultValue::Float),
            FieldKind::Boolean => match raw.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(DefaultValue::Boolean(true)),
                "false" | "no" | "off" | "0" => Some(DefaultValue::Boolean(false)),
                _ => None,
            },
            FieldKind::Text => Some(DefaultValue::Text(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl DefaultValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            DefaultValue::Integer(_) => FieldKind::Integer,
            DefaultValue::Float(_) => FieldKind::Float,
            DefaultValue::Boolean(_) => FieldKind::Boolean,
            DefaultValue::Text(_) => FieldKind::Text,
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Integer(v) => write!(f, "{}", v),
            DefaultValue::Float(v) => write!(f, "{}", v),
            DefaultValue::Boolean(v) => write!(f, "{}", v),
            DefaultValue::Text(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultField {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl GenerationDefaults {
    pub const FIELDS: [DefaultField; 11] = [
        DefaultField { name: "cfg_scale", kind: FieldKind::Float },
        DefaultField { name: "width", kind: FieldKind::Integer },
        DefaultField { name: "height", kind: FieldKind::Integer },
        DefaultField { name: "seed", kind: FieldKind::Integer },
        DefaultField { name: "show", kind: FieldKind::Boolean },
        DefaultField { name: "steps", kind: FieldKind::Integer },
        DefaultField { name: "batch", kind: FieldKind::Integer },
        DefaultField { name: "sampler", kind: FieldKind::Text },
        DefaultField { name: "save_image", kind: FieldKind::Boolean },
        DefaultField { name: "grid", kind: FieldKind::Boolean },
        DefaultField { name: "hires_fix", kind: FieldKind::Boolean },
    ];

    pub fn field(name: &str) -> Option<DefaultField> {
        Self::FIELDS.iter().copied().find(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<DefaultValue> {
        let value = match name {
            "cfg_scale" => DefaultValue::Float(self.cfg_scale),
            "width" => DefaultValue::Integer(self.width.into()),
            "height" => DefaultValue::Integer(self.height.into()),
            "seed" => DefaultValue::Integer(self.seed),
            "show" => DefaultValue::Boolean(self.show),
            "steps" => DefaultValue::Integer(self.steps.into()),
            "batch" => DefaultValue::Integer(self.batch.into()),
            "sampler" => DefaultValue::Text(self.sampler.clone()),
            "save_image" => DefaultValue::Boolean(self.save_image),
            "grid" => DefaultValue::Boolean(self.grid),
            "hires_fix" => DefaultValue::Boolean(self.hires_fix),
            _ => return None,
        };
        Some(value)
    }

    /// Returns a copy with `name` replaced. The value must already have the field's kind.
    pub fn with_value(&self, name: &str, value: DefaultValue) -> Result<Self> {
        let field = Self::field(name)
            .ok_or_else(|| BotError::NotFound(format!("Unknown default parameter `{}`", name)))?;
        if value.kind() != field.kind {
            return Err(BotError::TypeMismatch {
                field: name.to_string(),
                expected: field.kind.as_str().to_string(),
            });
        }

        let mut updated = self.clone();
        match (name, value) {
            ("cfg_scale", DefaultValue::Float(v)) => updated.cfg_scale = v,
            ("width", DefaultValue::Integer(v)) => updated.width = unsigned(name, v)?,
            ("height", DefaultValue::Integer(v)) => updated.height = unsigned(name, v)?,
            ("seed", DefaultValue::Integer(v)) => updated.seed = v,
            ("show", DefaultValue::Boolean(v)) => updated.show = v,
            ("steps", DefaultValue::Integer(v)) => updated.steps = unsigned(name, v)?,
            ("batch", DefaultValue::Integer(v)) => updated.batch = unsigned(name, v)?,
            ("sampler", DefaultValue::Text(v)) => updated.sampler = v,
            ("save_image", DefaultValue::Boolean(v)) => updated.save_image = v,
            ("grid", DefaultValue::Boolean(v)) => updated.grid = v,
            ("hires_fix", DefaultValue::Boolean(v)) => updated.hires_fix = v,
            _ => {
                return Err(BotError::Internal(format!(
                    "field table and setter disagree on `{}`",
                    name
                )))
            }
        }
        Ok(updated)
    }
}

fn unsigned(name: &str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| BotError::Validation(format!("`{}` must be a non-negative integer", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_is_readable() {
        let defaults = GenerationDefaults::default();
        for field in GenerationDefaults::FIELDS {
            let value = defaults.get(field.name).unwrap();
            assert_eq!(value.kind(), field.kind, "field {}", field.name);
        }
        assert!(defaults.get("nope").is_none());
    }

    #[test]
    fn test_partial_json_is_completed() {
        let defaults: GenerationDefaults = serde_json::from_str(r#"{"steps": 30}"#).unwrap();
        assert_eq!(defaults.steps, 30);
        assert_eq!(defaults.sampler, "Euler a");
        assert_eq!(defaults.cfg_scale, 5.0);
    }

    #[test]
    fn test_with_value_rejects_wrong_kind() {
        let defaults = GenerationDefaults::default();
        let err = defaults
            .with_value("steps", DefaultValue::Text("x".into()))
            .unwrap_err();
        assert!(matches!(err, BotError::TypeMismatch { ref expected, .. } if expected == "integer"));
    }

    #[test]
    fn test_with_value_rejects_negative_dimension() {
        let defaults = GenerationDefaults::default();
        let err = defaults
            .with_value("width", DefaultValue::Integer(-1))
            .unwrap_err();
        assert!(matches!(err, BotError::Validation(_)));
    }

    #[test]
    fn test_boolean_spellings() {
        assert_eq!(FieldKind::Boolean.parse("Yes"), Some(DefaultValue::Boolean(true)));
        assert_eq!(FieldKind::Boolean.parse("off"), Some(DefaultValue::Boolean(false)));
        assert_eq!(FieldKind::Boolean.parse("maybe"), None);
        assert_eq!(FieldKind::Float.parse("NaN"), None);
    }
}
