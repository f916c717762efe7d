use crate::application::repos::StoreError;

const UNIQUE_VIOLATION: &str = "23505";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Duplicate {
                message: db.constraint().unwrap_or("documents_pkey").to_string(),
            }
        }
        sqlx::Error::Database(db) if db.code().as_deref() == Some(INVALID_TEXT_REPRESENTATION) => {
            StoreError::invalid_document(db.message())
        }
        sqlx::Error::Decode(err) => StoreError::invalid_document(err),
        other => StoreError::from_persistence(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_are_not_found() {
        assert!(map_sqlx_error(sqlx::Error::RowNotFound).is_not_found());
    }

    #[test]
    fn pool_failures_are_persistence_errors() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Persistence(_)));
    }
}
