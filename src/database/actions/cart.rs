use log::debug;
use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    membership::MembershipKind,
    operations::Operation,
    permissions::Identity,
    schema::{RecipeShort, ShoppingRow, Uuid},
    shopping::ShoppingList,
};

use super::memberships::{add_membership, remove_membership};

pub async fn add_to_shopping_cart(
    recipe_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, potion::Error> {
    add_membership(MembershipKind::ShoppingCart, recipe_id, identity, pool).await
}

pub async fn remove_from_shopping_cart(
    recipe_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_membership(MembershipKind::ShoppingCart, recipe_id, identity, pool).await
}

/// Every ingredient amount of every recipe in the requester's cart, one row
/// per composition row.
pub async fn list_shopping_rows(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingRow>, potion::Error> {
    let rows: Vec<ShoppingRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Aggregated shopping list for the requester's cart. An empty cart gives an
/// empty list.
pub async fn download_shopping_cart(
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, potion::Error> {
    let session = identity.session(Operation::DownloadShoppingCart)?;
    let rows = list_shopping_rows(session.user_id, pool).await?;

    let list = ShoppingList::from_rows(rows);
    debug!(
        "Built shopping list of {} items for user {}",
        list.items.len(),
        session.user_id
    );
    Ok(list)
}
