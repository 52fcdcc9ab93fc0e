use std::fmt::{self, Display};

use potion::Error;
use warp::reject::Rejection;

/// SQLSTATE raised by postgres when a unique constraint rejects a write.
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE raised when a write references a row that no longer exists.
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub struct QueryError {
    code: u16,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { code: 500, info }
    }

    pub fn conflict(info: String) -> Self {
        Self { code: 409, info }
    }

    pub fn not_found(info: String) -> Self {
        Self { code: 404, info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Self::conflict(format!("{e}"))
            }
            sqlx::Error::Database(e) if e.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                Self::not_found(format!("{e}"))
            }
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(format!("Unknown error")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        Error {
            code: value.code.into(),
            info: Some(value.info),
            redirect: None,
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        ActionError::Validation(value.info).into()
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        let error: Error = value.into();
        error.into()
    }
}

/// Failures a caller can act on. Each kind keeps its own status code so the
/// routing layer can tell a bad payload from a duplicate or a missing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    Validation(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
}

impl ActionError {
    pub fn code(&self) -> u16 {
        match self {
            ActionError::Validation(_) => 400,
            ActionError::Unauthorized => 401,
            ActionError::Forbidden(_) => 403,
            ActionError::NotFound(_) => 404,
            ActionError::Conflict(_) => 409,
        }
    }
}

impl Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Validation(info)
            | ActionError::Forbidden(info)
            | ActionError::NotFound(info)
            | ActionError::Conflict(info) => write!(f, "{info}"),
            ActionError::Unauthorized => write!(f, "Authentication credentials were not provided"),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<ActionError> for Error {
    fn from(value: ActionError) -> Self {
        Error {
            code: value.code().into(),
            info: Some(value.to_string()),
            redirect: None,
        }
    }
}

impl From<ActionError> for Rejection {
    fn from(value: ActionError) -> Self {
        let error: Error = value.into();
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct SqlState(&'static str);

    impl Display for SqlState {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for SqlState {}

    impl DatabaseError for SqlState {
        fn message(&self) -> &str {
            "rejected by postgres"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn database_error(state: &'static str) -> QueryError {
        QueryError::from(sqlx::Error::Database(Box::new(SqlState(state))))
    }

    #[test]
    fn constraint_violations_keep_their_meaning() {
        assert_eq!(database_error("23505").code, 409);
        assert_eq!(database_error("23503").code, 404);
        assert_eq!(database_error("42P01").code, 500);
    }

    #[test]
    fn missing_referenced_row_becomes_not_found() {
        let error: Error = database_error("23503").into();

        assert_eq!(error.code, 404);
    }

    #[test]
    fn action_errors_keep_distinct_codes() {
        assert_eq!(ActionError::Validation("bad".into()).code(), 400);
        assert_eq!(ActionError::Unauthorized.code(), 401);
        assert_eq!(ActionError::Forbidden("no".into()).code(), 403);
        assert_eq!(ActionError::NotFound("gone".into()).code(), 404);
        assert_eq!(ActionError::Conflict("twice".into()).code(), 409);
    }

    #[test]
    fn converted_error_carries_message() {
        let error: potion::Error = ActionError::Conflict("Cannot add \"Soup\" twice".into()).into();

        assert_eq!(error.code, 409);
        assert_eq!(error.info.as_deref(), Some("Cannot add \"Soup\" twice"));
    }

    #[test]
    fn type_errors_are_validation_errors() {
        let error: potion::Error = TypeError::new("Invalid key").into();

        assert_eq!(error.code, 400);
    }
}
