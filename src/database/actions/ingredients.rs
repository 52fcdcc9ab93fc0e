use log::info;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    constants::INGREDIENT_IMPORT_CHUNK,
    error::{ActionError, QueryError},
    form::IngredientFilter,
    import::parse_ingredient_table,
    operations::Operation,
    permissions::Identity,
    schema::{Ingredient, NewIngredient, Uuid},
};

/// Escapes `LIKE` wildcards so a search term only matches literally.
fn like_prefix(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 1);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Ingredients ordered by name, optionally only those whose name starts with
/// `filter.name`.
pub async fn list_ingredients(
    filter: IngredientFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match filter.name {
        Some(name) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE name LIKE $1 ESCAPE '\\' ORDER BY name, id",
        )
        .bind(like_prefix(&name))
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    match row {
        Some(ingredient) => Ok(ingredient),
        None => Err(ActionError::NotFound(format!("No ingredient exists with id {id}")).into()),
    }
}

/// Bulk loads reference ingredients in one transaction. Either every row is
/// stored or none is.
pub async fn import_ingredients(
    ingredients: Vec<NewIngredient>,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<u64, potion::Error> {
    identity.session(Operation::ImportIngredients)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut inserted = 0;
    for chunk in ingredients.chunks(INGREDIENT_IMPORT_CHUNK) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(&ingredient.name)
                .push_bind(&ingredient.measurement_unit);
        });

        inserted += query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?
            .rows_affected();
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    info!("Imported {inserted} ingredients");
    Ok(inserted)
}

/// Parses and imports an ingredient table in one step.
pub async fn import_ingredient_table(
    data: &str,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<u64, potion::Error> {
    identity.session(Operation::ImportIngredients)?;
    let ingredients = parse_ingredient_table(data)?;

    import_ingredients(ingredients, identity, pool).await
}
