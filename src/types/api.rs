use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PasteView;
use crate::error::{FieldError, ValidationErrors};

/// Raw creation request.
///
/// Fields are kept untyped so that a wrongly typed field ends up in the
/// per-field error list instead of failing the whole body.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePaste {
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub ttl_seconds: Option<Value>,
    #[serde(default)]
    pub max_views: Option<Value>,
}

/// Creation request with every field checked for type and range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePasteFields {
    pub content: String,
    pub ttl_seconds: Option<i64>,
    pub max_views: Option<i64>,
}

impl CreatePaste {
    pub fn into_fields(self) -> Result<CreatePasteFields, ValidationErrors> {
        let mut errors = Vec::new();

        let content = match self.content {
            Some(Value::String(content)) if !content.is_empty() => content,
            _ => {
                errors.push(FieldError::new(
                    "content",
                    "content is required and must be a non-empty string",
                ));
                String::new()
            }
        };
        let ttl_seconds = positive_integer_field("ttl_seconds", self.ttl_seconds, &mut errors);
        let max_views = positive_integer_field("max_views", self.max_views, &mut errors);

        if errors.is_empty() {
            Ok(CreatePasteFields {
                content,
                ttl_seconds,
                max_views,
            })
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

/// An optional whole number of at least 1. `60.0` counts, JSON has no separate integer type.
fn positive_integer_field(
    field: &'static str,
    value: Option<Value>,
    errors: &mut Vec<FieldError>,
) -> Option<i64> {
    let n = match value {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Some(_) => None,
    };

    match n {
        Some(n) if n >= 1 => Some(n),
        Some(_) => {
            errors.push(FieldError::new(field, "must be at least 1"));
            None
        }
        None => {
            errors.push(FieldError::new(field, "must be an integer"));
            None
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedPaste {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct PasteBody {
    pub ok: bool,
    #[serde(flatten)]
    pub paste: PasteView,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}
