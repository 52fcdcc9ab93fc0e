use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};
use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};

use crate::error::{QueryError, TypeError};

const SCHEMA: &str = include_str!("../migrations/schema.sql");

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> Result<Self, TypeError> {
        Ok(Self {
            database_url: var("DATABASE_URL")
                .ok_or_else(|| TypeError::new("DATABASE_URL is not set"))?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
        })
    }

    pub async fn connect(&self) -> Result<Pool<Postgres>, potion::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(QueryError::from)?;

        info!("Connected to database ({} connections)", self.max_connections);
        Ok(pool)
    }
}

/// Creates missing types and tables. Safe to run on every start.
pub async fn migrate(pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    pool.execute(SCHEMA)
        .await
        .map_err(QueryError::from)?;

    info!("Database schema is up to date");
    Ok(())
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .map_err(|_| {
            warn!("Environment variable {key} not found");
        })
        .ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, TypeError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            TypeError::new(&format!("Invalid {key} value: {e}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let value: u32 = try_load("FOODGRAM_SDK_TEST_UNSET_VARIABLE", "5").unwrap();

        assert_eq!(value, 5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let value: Result<u32, TypeError> = try_load("FOODGRAM_SDK_TEST_UNSET_VARIABLE", "five");

        assert!(value.is_err());
    }

    #[test]
    fn schema_declares_every_table() {
        for table in [
            "users",
            "ingredients",
            "tags",
            "recipes",
            "recipe_ingredients",
            "recipe_tags",
            "favorites",
            "shopping_cart",
            "follows",
        ] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "missing table {table}"
            );
        }
    }
}
