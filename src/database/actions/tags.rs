use std::sync::LazyLock;

use log::info;
use regex::Regex;
use sqlx::{Pool, Postgres};

use crate::{
    constants::{DEFAULT_TAG_COLOR, TAG_NAME_MAX_LENGTH},
    error::{ActionError, QueryError},
    operations::Operation,
    permissions::Identity,
    schema::{NewTag, Tag, Uuid},
};

static COLOR_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid color pattern")
});
static SLUG_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));

/// Checks a new tag and fills in the default color.
pub fn normalize_tag(tag: NewTag) -> Result<NewTag, ActionError> {
    let name = tag.name.trim().to_string();
    if name.is_empty() || name.chars().count() > TAG_NAME_MAX_LENGTH {
        return Err(ActionError::Validation(format!(
            "Tag name must be between 1 and {TAG_NAME_MAX_LENGTH} characters"
        )));
    }

    let color = tag.color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());
    if !COLOR_FORMAT.is_match(&color) {
        return Err(ActionError::Validation(format!(
            "\"{color}\" is not a hex color"
        )));
    }

    if !SLUG_FORMAT.is_match(&tag.slug) {
        return Err(ActionError::Validation(format!(
            "\"{}\" is not a valid slug",
            tag.slug
        )));
    }

    Ok(NewTag {
        name,
        color: Some(color),
        slug: tag.slug,
    })
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    match row {
        Some(tag) => Ok(tag),
        None => Err(ActionError::NotFound(format!("No tag exists with id {id}")).into()),
    }
}

pub async fn create_tag(
    tag: NewTag,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<Tag, potion::Error> {
    identity.session(Operation::CreateTag)?;
    let tag = normalize_tag(tag)?;

    let row: Option<Tag> = sqlx::query_as(
        "
        INSERT INTO tags (name, color, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO NOTHING RETURNING *;
    ",
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match row {
        Some(created) => {
            info!("Created tag {} ({})", created.slug, created.id);
            Ok(created)
        }
        None => Err(ActionError::Conflict(format!(
            "A tag with slug \"{}\" already exists",
            tag.slug
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_tag(color: Option<&str>, slug: &str) -> NewTag {
        NewTag {
            name: String::from("Breakfast"),
            color: color.map(String::from),
            slug: slug.to_string(),
        }
    }

    #[test]
    fn missing_color_gets_default() {
        let tag = normalize_tag(new_tag(None, "breakfast")).unwrap();

        assert_eq!(tag.color.as_deref(), Some(DEFAULT_TAG_COLOR));
    }

    #[test]
    fn accepts_short_and_long_hex() {
        assert!(normalize_tag(new_tag(Some("#fff"), "a")).is_ok());
        assert!(normalize_tag(new_tag(Some("#E26C2D"), "b")).is_ok());
    }

    #[test]
    fn rejects_malformed_color_and_slug() {
        assert!(normalize_tag(new_tag(Some("red"), "breakfast")).is_err());
        assert!(normalize_tag(new_tag(Some("#12345"), "breakfast")).is_err());
        assert!(normalize_tag(new_tag(None, "early breakfast")).is_err());
        assert!(normalize_tag(new_tag(None, "")).is_err());
    }
}
