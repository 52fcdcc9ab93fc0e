use log::{debug, error, info};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    composition::{validate, Catalog, CompositionRule, CREATE_RULES, UPDATE_RULES},
    error::{ActionError, QueryError},
    form::RecipeFilter,
    membership::MembershipKind,
    operations::Operation,
    pagination::Page,
    permissions::{Identity, SessionData},
    schema::{
        Recipe, RecipeIngredient, RecipePayload, RecipeRow, RecipeShort, RecipeView, Tag, Uuid,
    },
};

use super::get_user_view;

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe_short(
    id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, potion::Error> {
    let row: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    match row {
        Some(recipe) => Ok(recipe),
        None => Err(recipe_not_found(id)),
    }
}

/// Locks a recipe the session is allowed to change for the rest of the
/// transaction. A recipe deleted in the meantime is reported as not found.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    conn: &mut PgConnection,
) -> Result<Recipe, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    match row {
        Some(recipe) => {
            session.authenticate_owner(recipe.author_id)?;
            Ok(recipe)
        }
        None => Err(recipe_not_found(id)),
    }
}

fn recipe_not_found(id: Uuid) -> potion::Error {
    ActionError::NotFound(format!("No recipe exists with id {id}")).into()
}

pub async fn list_recipe_ingredients(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredient>, potion::Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn list_recipe_tags(
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<Tag>, potion::Error> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY rt.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Whether the recipe is in the viewer's favorites and shopping cart.
/// Anonymous viewers have neither.
async fn membership_flags(
    recipe_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<(bool, bool), potion::Error> {
    let Some(user_id) = viewer else {
        return Ok((false, false));
    };

    let flags: (bool, bool) = sqlx::query_as(
        "
        SELECT
            EXISTS (SELECT 1 FROM favorites WHERE recipe_id = $1 AND user_id = $2),
            EXISTS (SELECT 1 FROM shopping_cart WHERE recipe_id = $1 AND user_id = $2)
    ",
    )
    .bind(recipe_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(flags)
}

pub async fn build_recipe_view(
    recipe: Recipe,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let viewer = identity.user_id();

    let author = get_user_view(recipe.author_id, viewer, pool)
        .await?
        .ok_or_else(|| QueryError::new(format!("Recipe {} has no author", recipe.id)))?;
    let ingredients = list_recipe_ingredients(recipe.id, pool).await?;
    let tags = list_recipe_tags(recipe.id, pool).await?;
    let (is_favorited, is_in_shopping_cart) = membership_flags(recipe.id, viewer, pool).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn get_recipe_view(
    id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    match get_recipe(id, pool).await? {
        Some(recipe) => build_recipe_view(recipe, identity, pool).await,
        None => Err(recipe_not_found(id)),
    }
}

fn push_membership_filter(
    query: &mut QueryBuilder<'_, Postgres>,
    kind: MembershipKind,
    viewer: Option<Uuid>,
) {
    match viewer {
        Some(user_id) => {
            query
                .push(format!(
                    " AND EXISTS (SELECT 1 FROM {} m WHERE m.recipe_id = r.id AND m.user_id = ",
                    kind.table()
                ))
                .push_bind(user_id)
                .push(")");
        }
        None => {
            query.push(" AND FALSE");
        }
    }
}

/// Newest recipes first, narrowed by every filter that is set.
pub async fn fetch_recipes(
    filter: RecipeFilter,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<Page<RecipeView>, potion::Error> {
    let viewer = identity.user_id();

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags)
            .push("))");
    }
    if filter.is_favorited {
        push_membership_filter(&mut query, MembershipKind::Favorite, viewer);
    }
    if filter.is_in_shopping_cart {
        push_membership_filter(&mut query, MembershipKind::ShoppingCart, viewer);
    }

    query
        .push(" ORDER BY r.created DESC, r.id DESC LIMIT ")
        .push_bind(filter.page.limit)
        .push(" OFFSET ")
        .push_bind(filter.page.offset());

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(build_recipe_view(row.recipe, identity, pool).await?);
    }

    Ok(Page::try_from_rows(views, total_count, filter.page)?)
}

/// Looks up which of the referenced ingredients and tags exist.
pub async fn load_catalog(
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<Catalog, potion::Error> {
    let ingredient_ids: Vec<Uuid> = payload.ingredients.iter().map(|i| i.id).collect();
    let ingredients: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ingredient_ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let tags: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(payload.tags.clone())
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(Catalog::new(
        ingredients.into_iter().map(|r| r.0),
        tags.into_iter().map(|r| r.0),
    ))
}

async fn check_composition(
    rules: &[CompositionRule],
    payload: &RecipePayload,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let catalog = load_catalog(payload, pool).await?;

    validate(rules, payload, &catalog).map_err(|violation| {
        debug!(
            "Rejected recipe from user {} at {}: {}",
            session.user_id, violation.rule, violation.reason
        );
        violation.into()
    })
}

/// Writes one composition row per ingredient and one association per tag.
async fn write_composition(
    recipe_id: Uuid,
    payload: &RecipePayload,
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    if !payload.ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        query_builder.push_values(&payload.ingredients, |mut b, ingredient| {
            b.push_bind(recipe_id)
                .push_bind(ingredient.id)
                .push_bind(ingredient.amount);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    if !payload.tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(&payload.tags, |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

pub async fn create_recipe(
    payload: RecipePayload,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let session = identity.session(Operation::CreateRecipe)?;
    check_composition(CREATE_RULES, &payload, session, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id;
    ",
    )
    .bind(session.user_id)
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    write_composition(recipe.0, &payload, &mut tr).await?;

    tr.commit().await.map_err(|e| {
        error!("Could not commit recipe {}: {e}", recipe.0);
        QueryError::new("Could not commit transaction".to_owned())
    })?;

    info!("User {} created recipe {}", session.user_id, recipe.0);
    get_recipe_view(recipe.0, identity, pool).await
}

/// Replaces the scalar fields the payload sets and the whole composition.
pub async fn update_recipe(
    id: Uuid,
    payload: RecipePayload,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let session = identity.session(Operation::UpdateRecipe)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe = get_recipe_mut(id, session, &mut tr).await?;
    check_composition(UPDATE_RULES, &payload, session, pool).await?;

    sqlx::query(
        "
        UPDATE recipes SET
            name = COALESCE($1, name),
            image = COALESCE($2, image),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time)
        WHERE id = $5
    ",
    )
    .bind(&payload.name)
    .bind(&payload.image)
    .bind(&payload.text)
    .bind(payload.cooking_time)
    .bind(recipe.id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    write_composition(recipe.id, &payload, &mut tr).await?;

    tr.commit().await.map_err(|e| {
        error!("Could not commit recipe {}: {e}", recipe.id);
        QueryError::new("Could not commit transaction".to_owned())
    })?;

    info!("User {} updated recipe {}", session.user_id, recipe.id);
    get_recipe_view(recipe.id, identity, pool).await
}

/// Deletes a recipe. Composition rows, tags and list entries go with it
/// through the storage cascades.
pub async fn delete_recipe(
    id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let session = identity.session(Operation::DeleteRecipe)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe = get_recipe_mut(id, session, &mut tr).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    info!("User {} deleted recipe {}", session.user_id, recipe.id);
    Ok(())
}
