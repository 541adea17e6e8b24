use crate::application::repos::RepoError;

// SQLSTATE codes, see https://www.postgresql.org/docs/current/errcodes-appendix.html
const CHECK_VIOLATION: &str = "23514";
const STRING_TOO_LONG: &str = "22001";
const INVALID_TEXT: &str = "22P02";
const INTEGRITY_CLASS: &str = "23";
const QUERY_CANCELED: &str = "57014";

/// Classify a driver error by SQLSTATE rather than message text.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => {
            let code = db.code().map(|code| code.into_owned()).unwrap_or_default();
            let message = db.message().to_string();
            match code.as_str() {
                CHECK_VIOLATION | STRING_TOO_LONG | INVALID_TEXT => {
                    RepoError::InvalidInput { message }
                }
                QUERY_CANCELED => RepoError::Timeout,
                other if other.starts_with(INTEGRITY_CLASS) => RepoError::Integrity { message },
                _ => RepoError::Persistence(message),
            }
        }
        other => RepoError::from_persistence(other),
    }
}
