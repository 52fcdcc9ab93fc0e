use log::info;
use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    membership::{MembershipKind, Toggle},
    operations::Operation,
    permissions::Identity,
    schema::{RecipeShort, Uuid},
};

use super::get_recipe_short;

fn operation(kind: MembershipKind) -> Operation {
    match kind {
        MembershipKind::Favorite => Operation::Favorite,
        MembershipKind::ShoppingCart => Operation::ShoppingCart,
    }
}

/// Puts an existing recipe on one of the requester's lists. Adding it twice is
/// a conflict.
pub(super) async fn add_membership(
    kind: MembershipKind,
    recipe_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, potion::Error> {
    let session = identity.session(operation(kind))?;
    let recipe = get_recipe_short(recipe_id, pool).await?;

    let query = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table()
    ))
    .bind(session.user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Toggle::Add.outcome(kind, &recipe.name, query.rows_affected())?;

    info!(
        "User {} added recipe {} to {}",
        session.user_id,
        recipe.id,
        kind.list_name()
    );
    Ok(recipe)
}

/// Takes a recipe off one of the requester's lists. Removing one that is not
/// there is reported as not found.
pub(super) async fn remove_membership(
    kind: MembershipKind,
    recipe_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let session = identity.session(operation(kind))?;
    let recipe = get_recipe_short(recipe_id, pool).await?;

    let query = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    ))
    .bind(session.user_id)
    .bind(recipe.id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Toggle::Remove.outcome(kind, &recipe.name, query.rows_affected())?;

    info!(
        "User {} removed recipe {} from {}",
        session.user_id,
        recipe.id,
        kind.list_name()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_list_has_its_own_permission() {
        assert_eq!(operation(MembershipKind::Favorite), Operation::Favorite);
        assert_eq!(operation(MembershipKind::ShoppingCart), Operation::ShoppingCart);
    }
}
