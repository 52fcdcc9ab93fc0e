use sqlx::{Pool, Postgres};

use crate::{
    membership::MembershipKind,
    permissions::Identity,
    schema::{RecipeShort, Uuid},
};

use super::memberships::{add_membership, remove_membership};

pub async fn add_to_favorites(
    recipe_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, potion::Error> {
    add_membership(MembershipKind::Favorite, recipe_id, identity, pool).await
}

pub async fn remove_from_favorites(
    recipe_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_membership(MembershipKind::Favorite, recipe_id, identity, pool).await
}
