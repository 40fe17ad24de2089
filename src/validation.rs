use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, AppResult};

pub const MAX_SLUG_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;

lazy_static! {
    /// Lowercase alphanumeric words joined by single hyphens.
    /// - Valid: "outdoor-gear", "mugs", "size-42"
    /// - Invalid: "-mugs", "mugs-", "outdoor--gear", "Mugs", "mugs_cups"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Lowercases `input` and collapses every run of other characters into one hyphen.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

pub fn validate_slug(slug: &str) -> AppResult<()> {
    if slug.len() > MAX_SLUG_LEN {
        return Err(AppError::BadRequest(format!(
            "slug must be at most {MAX_SLUG_LEN} characters"
        )));
    }
    if !SLUG_REGEX.is_match(slug) {
        return Err(AppError::BadRequest(format!(
            "slug `{slug}` must be lowercase words separated by single hyphens"
        )));
    }
    Ok(())
}

/// Escapes `\`, `%` and `_` so `input` matches literally inside a LIKE pattern.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Returns the trimmed name.
pub fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
