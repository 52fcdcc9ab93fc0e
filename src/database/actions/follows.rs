use log::info;
use sqlx::{Pool, Postgres};

use crate::{
    error::{ActionError, QueryError},
    form::SubscriptionFilter,
    membership::{check_follow, follow_outcome, Toggle},
    operations::Operation,
    pagination::Page,
    permissions::Identity,
    schema::{RecipeShort, Subscription, UserRow, UserView, Uuid},
};

use super::get_user_view;

async fn get_author(
    author_id: Uuid,
    viewer: Uuid,
    pool: &Pool<Postgres>,
) -> Result<UserView, potion::Error> {
    match get_user_view(author_id, Some(viewer), pool).await? {
        Some(author) => Ok(author),
        None => Err(ActionError::NotFound(format!("No user exists with id {author_id}")).into()),
    }
}

/// Author with their newest recipes, at most `recipes_limit` of them.
pub async fn build_subscription(
    author: UserView,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    let recipes: Vec<RecipeShort> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time FROM recipes
        WHERE author_id = $1
        ORDER BY created DESC, id DESC
        LIMIT $2
    ",
    )
    .bind(author.id)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author.id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(Subscription {
        author,
        recipes,
        recipes_count: recipes_count.0,
    })
}

pub async fn subscribe(
    author_id: Uuid,
    recipes_limit: Option<i64>,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<Subscription, potion::Error> {
    let session = identity.session(Operation::Subscribe)?;
    get_author(author_id, session.user_id, pool).await?;
    check_follow(session.user_id, author_id)?;

    let query = sqlx::query(
        "
        INSERT INTO follows (user_id, author_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING;
    ",
    )
    .bind(session.user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    follow_outcome(Toggle::Add, query.rows_affected())?;
    info!("User {} subscribed to {author_id}", session.user_id);

    let author = get_author(author_id, session.user_id, pool).await?;
    build_subscription(author, recipes_limit, pool).await
}

/// Stops following an author. Not following them already is fine.
pub async fn unsubscribe(
    author_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let session = identity.session(Operation::Subscribe)?;
    get_author(author_id, session.user_id, pool).await?;

    let query = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    follow_outcome(Toggle::Remove, query.rows_affected())?;
    if query.rows_affected() > 0 {
        info!("User {} unsubscribed from {author_id}", session.user_id);
    }
    Ok(())
}

pub async fn fetch_subscriptions(
    filter: SubscriptionFilter,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<Page<Subscription>, potion::Error> {
    let session = identity.session(Operation::Subscriptions)?;

    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            TRUE AS is_subscribed, COUNT(*) OVER() AS count
        FROM follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(session.user_id)
    .bind(filter.page.limit)
    .bind(filter.page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    if rows.is_empty() && filter.page.page == 1 {
        return Err(ActionError::Validation(String::from(
            "You are not subscribed to anyone",
        ))
        .into());
    }

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let mut subscriptions = Vec::with_capacity(rows.len());
    for row in rows {
        subscriptions.push(build_subscription(row.user, filter.recipes_limit, pool).await?);
    }

    Ok(Page::try_from_rows(subscriptions, total_count, filter.page)?)
}
