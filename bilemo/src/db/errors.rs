use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Foreign key constraint violation
    #[error("Foreign key constraint violation")]
    ForeignKeyViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                // SQLite reports neither table nor constraint name, only "<KIND> constraint failed: table.column"
                let (table, constraint) = match (db_err.table(), db_err.constraint()) {
                    (None, None) => constraint_target(&message),
                    (table, constraint) => (table.map(str::to_string), constraint.map(str::to_string)),
                };

                if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        constraint,
                        table,
                        message,
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        constraint,
                        table,
                        message,
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // All other sqlx errors are non-recoverable - convert to anyhow with context
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Split a SQLite constraint message such as `UNIQUE constraint failed: clients.email` into
/// `(table, column)`.
fn constraint_target(message: &str) -> (Option<String>, Option<String>) {
    let Some((_, target)) = message.split_once("constraint failed:") else {
        return (None, None);
    };
    // Composite keys are reported as "t.a, t.b"; the first column is enough to identify it
    let first = target.split(',').next().unwrap_or_default().trim();
    match first.split_once('.') {
        Some((table, column)) => (Some(table.to_string()), Some(column.to_string())),
        None if first.is_empty() => (None, None),
        None => (None, Some(first.to_string())),
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_target_unique() {
        let (table, column) = constraint_target("UNIQUE constraint failed: clients.email");
        assert_eq!(table.as_deref(), Some("clients"));
        assert_eq!(column.as_deref(), Some("email"));
    }

    #[test]
    fn test_constraint_target_composite_key() {
        let (table, column) = constraint_target("UNIQUE constraint failed: client_roles.client_id, client_roles.role");
        assert_eq!(table.as_deref(), Some("client_roles"));
        assert_eq!(column.as_deref(), Some("client_id"));
    }

    #[test]
    fn test_constraint_target_foreign_key_has_no_target() {
        assert_eq!(constraint_target("FOREIGN KEY constraint failed"), (None, None));
    }

    #[test]
    fn test_constraint_target_unrelated_message() {
        assert_eq!(constraint_target("database is locked"), (None, None));
    }
}
