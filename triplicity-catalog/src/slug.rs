use crate::error::{CatalogError, CatalogResult};

pub const MAX_SLUG_LENGTH: usize = 50;

/// Derives a URL slug from a title: `"Goa Beach Escape!"` -> `"goa-beach-escape"`.
///
/// Characters outside ASCII letters, digits, whitespace, `-` and `_` are dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '-' || c.is_whitespace() {
            pending_dash = true;
        }
    }

    let slug = slug.trim_matches(|c| c == '-' || c == '_');
    truncate(slug)
}

pub fn validate_slug(slug: &str) -> CatalogResult<()> {
    if slug.is_empty() {
        return Err(CatalogError::Validation("slug must not be empty".to_string()));
    }
    if slug.len() > MAX_SLUG_LENGTH {
        return Err(CatalogError::Validation(format!(
            "slug must be at most {} characters",
            MAX_SLUG_LENGTH
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(CatalogError::Validation(format!(
            "slug '{}' may only contain lowercase letters, numbers, underscores or hyphens",
            slug
        )));
    }
    Ok(())
}

fn truncate(slug: &str) -> String {
    if slug.len() <= MAX_SLUG_LENGTH {
        return slug.to_string();
    }
    slug[..MAX_SLUG_LENGTH].trim_end_matches('-').to_string()
}
