//! Turning untrusted JSON objects into category writes.
//!
//! Only fields allowed by the [`MassAssignmentPolicy`] are read. Absent keys
//! stay `None`, so an update touches exactly the fields the caller supplied.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    schema::MassAssignmentPolicy,
    validation::{slugify, validate_name, validate_slug},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryAttributes {
    /// `Some(None)` moves the category to the root.
    pub parent_id: Option<Option<Uuid>>,
    pub slug: Option<String>,
    pub name: Option<String>,
    /// Keys dropped by a non-strict policy.
    pub ignored: Vec<String>,
}

impl CategoryAttributes {
    pub fn from_value(input: &Value, policy: &MassAssignmentPolicy) -> AppResult<Self> {
        match input {
            Value::Object(map) => Self::fill(map, policy),
            _ => Err(AppError::BadRequest(
                "category attributes must be a JSON object".into(),
            )),
        }
    }

    pub fn fill(input: &Map<String, Value>, policy: &MassAssignmentPolicy) -> AppResult<Self> {
        let mut attrs = Self::default();
        for (key, value) in input {
            if !policy.is_fillable(key) {
                if policy.strict {
                    return Err(AppError::BadRequest(format!(
                        "field `{key}` is not mass assignable"
                    )));
                }
                tracing::debug!(field = %key, "ignoring guarded category field");
                attrs.ignored.push(key.clone());
                continue;
            }

            match key.as_str() {
                "parent_id" => attrs.parent_id = Some(parse_parent_id(value)?),
                "slug" => {
                    let slug = expect_str(key, value)?;
                    validate_slug(slug)?;
                    attrs.slug = Some(slug.to_string());
                }
                "name" => attrs.name = Some(validate_name(expect_str(key, value)?)?),
                // is_fillable only admits category fields
                _ => {}
            }
        }
        Ok(attrs)
    }

    /// True when no column would change.
    pub fn is_empty(&self) -> bool {
        self.parent_id.is_none() && self.slug.is_none() && self.name.is_none()
    }
}

fn parse_parent_id(value: &Value) -> AppResult<Option<Uuid>> {
    match value {
        Value::Null => Ok(None),
        Value::String(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("parent_id `{raw}` is not a UUID"))),
        _ => Err(AppError::BadRequest(
            "parent_id must be a UUID string or null".into(),
        )),
    }
}

fn expect_str<'v>(key: &str, value: &'v Value) -> AppResult<&'v str> {
    value
        .as_str()
        .ok_or_else(|| AppError::BadRequest(format!("{key} must be a string")))
}

/// A fully specified category ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub parent_id: Option<Uuid>,
    pub slug: String,
    pub name: String,
}

impl TryFrom<CategoryAttributes> for NewCategory {
    type Error = AppError;

    fn try_from(attrs: CategoryAttributes) -> AppResult<Self> {
        let name = attrs
            .name
            .ok_or_else(|| AppError::BadRequest("name is required".into()))?;
        let slug = match attrs.slug {
            Some(slug) => slug,
            None => {
                let derived = slugify(&name);
                if derived.is_empty() {
                    return Err(AppError::BadRequest(
                        "slug is required when the name has no letters or digits".into(),
                    ));
                }
                derived
            }
        };
        validate_slug(&slug)?;

        Ok(Self {
            parent_id: attrs.parent_id.flatten(),
            slug,
            name,
        })
    }
}
