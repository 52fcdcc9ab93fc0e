use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use sqlx::{Pool, Postgres};

use crate::{
    constants::{EMAIL_MAX_LENGTH, USERNAME_MAX_LENGTH},
    cryptography::hash_password,
    error::{ActionError, QueryError},
    operations::Operation,
    pagination::{Page, PageRequest},
    permissions::Identity,
    schema::{NewUser, UserRow, UserView, Uuid},
};

static USERNAME_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

const USER_VIEW_COLUMNS: &str = "
    u.email, u.id, u.username, u.first_name, u.last_name,
    EXISTS (SELECT 1 FROM follows f WHERE f.user_id = $1 AND f.author_id = u.id) AS is_subscribed
";

pub fn validate_new_user(user: &NewUser) -> Result<(), ActionError> {
    if user.username.is_empty() || user.username.chars().count() > USERNAME_MAX_LENGTH {
        return Err(ActionError::Validation(format!(
            "Username must be between 1 and {USERNAME_MAX_LENGTH} characters"
        )));
    }
    if !USERNAME_FORMAT.is_match(&user.username) {
        return Err(ActionError::Validation(String::from(
            "Username may only contain letters, digits and @/./+/-/_",
        )));
    }
    if user.username == "me" {
        return Err(ActionError::Validation(String::from(
            "Username \"me\" is reserved",
        )));
    }
    if user.email.chars().count() > EMAIL_MAX_LENGTH || !is_email(&user.email) {
        return Err(ActionError::Validation(String::from(
            "Enter a valid email address",
        )));
    }
    for (field, value) in [
        ("first_name", &user.first_name),
        ("last_name", &user.last_name),
    ] {
        if value.trim().is_empty() || value.chars().count() > USERNAME_MAX_LENGTH {
            return Err(ActionError::Validation(format!(
                "{field} must be between 1 and {USERNAME_MAX_LENGTH} characters"
            )));
        }
    }
    if user.password.is_empty() {
        return Err(ActionError::Validation(String::from(
            "Password cannot be empty",
        )));
    }
    Ok(())
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Creates a user and stores only the argon2 hash of their password.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<UserView, potion::Error> {
    validate_new_user(&user)?;

    let password = hash_password(&user.password)
        .map_err(|e| QueryError::new(format!("Could not hash password: {e}")))?;

    let row: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let Some((id,)) = row else {
        debug!("Rejected duplicate registration for {}", user.username);
        return Err(ActionError::Conflict(String::from(
            "A user with that email or username already exists",
        ))
        .into());
    };

    info!("Registered user {} ({id})", user.username);
    Ok(UserView {
        email: user.email,
        id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed: false,
    })
}

/// Public view of `user_id` as seen by `viewer`.
pub async fn get_user_view(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Option<UserView>, potion::Error> {
    let row: Option<UserView> = sqlx::query_as(&format!(
        "SELECT {USER_VIEW_COLUMNS} FROM users u WHERE u.id = $2"
    ))
    .bind(viewer)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn retrieve_user(
    user_id: Uuid,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<UserView, potion::Error> {
    match get_user_view(user_id, identity.user_id(), pool).await? {
        Some(user) => Ok(user),
        None => Err(ActionError::NotFound(format!("No user exists with id {user_id}")).into()),
    }
}

pub async fn get_me(identity: &Identity, pool: &Pool<Postgres>) -> Result<UserView, potion::Error> {
    let session = identity.session(Operation::Me)?;

    match get_user_view(session.user_id, Some(session.user_id), pool).await? {
        Some(user) => Ok(user),
        None => Err(ActionError::Unauthorized.into()),
    }
}

pub async fn fetch_users(
    page: PageRequest,
    identity: &Identity,
    pool: &Pool<Postgres>,
) -> Result<Page<UserView>, potion::Error> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_VIEW_COLUMNS}, COUNT(*) OVER() AS count FROM users u ORDER BY u.id LIMIT $2 OFFSET $3"
    ))
    .bind(identity.user_id())
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let users = rows.into_iter().map(|r| r.user).collect();
    Ok(Page::try_from_rows(users, total_count, page)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            first_name: String::from("Ann"),
            last_name: String::from("Cook"),
            password: String::from("secret"),
        }
    }

    #[test]
    fn accepts_regular_user() {
        assert_eq!(validate_new_user(&new_user("ann.cook+1", "ann@example.com")), Ok(()));
    }

    #[test]
    fn rejects_bad_usernames() {
        for username in ["", "ann cook", "me", "semi;colon"] {
            assert!(
                matches!(
                    validate_new_user(&new_user(username, "ann@example.com")),
                    Err(ActionError::Validation(_))
                ),
                "{username:?} was accepted"
            );
        }
    }

    #[test]
    fn rejects_bad_emails() {
        for email in ["", "ann", "ann@", "@example.com", "ann@localhost"] {
            assert!(
                validate_new_user(&new_user("ann", email)).is_err(),
                "{email:?} was accepted"
            );
        }
    }

    #[test]
    fn rejects_empty_password() {
        let mut user = new_user("ann", "ann@example.com");
        user.password.clear();

        assert!(validate_new_user(&user).is_err());
    }
}
