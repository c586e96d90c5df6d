//! Postgres-backed credential store (`sql/schema.sql` carries the schema).

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{User, UserStore};
use crate::confide::error::AuthError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        federated_id: row.get("federated_id"),
        secret: row.get("secret"),
    }
}

/// SQLSTATE 23505, raised when an insert loses a uniqueness race.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, federated_id, secret";

#[async_trait]
impl UserStore for PgStore {
    async fn create_local(&self, email: &str, password_hash: &str) -> Result<User, AuthError> {
        let query = r"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, federated_id, secret
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(row) => Ok(row_to_user(&row)),
            Err(err) if is_unique_violation(&err) => Err(AuthError::DuplicateIdentifier),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_or_create_federated(&self, federated_id: &str) -> Result<User, AuthError> {
        let select = format!("SELECT {USER_COLUMNS} FROM users WHERE federated_id = $1");
        let insert = r"
            INSERT INTO users (federated_id)
            VALUES ($1)
            RETURNING id, email, password_hash, federated_id, secret
        ";

        // Two passes: a concurrent duplicate callback may win the insert race,
        // in which case the unique violation sends us back to the select.
        for _ in 0..2 {
            let span = tracing::info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = select.as_str()
            );
            if let Some(row) = sqlx::query(&select)
                .bind(federated_id)
                .fetch_optional(&self.pool)
                .instrument(span)
                .await?
            {
                return Ok(row_to_user(&row));
            }

            let span = tracing::info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "INSERT",
                db.statement = insert
            );
            let result = sqlx::query(insert)
                .bind(federated_id)
                .fetch_one(&self.pool)
                .instrument(span)
                .await;

            match result {
                Ok(row) => return Ok(row_to_user(&row)),
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AuthError::StoreUnavailable(
            "lost find-or-create race twice for the same federated id".to_string(),
        ))
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<(), AuthError> {
        let query = "UPDATE users SET secret = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(secret)
            .execute(&self.pool)
            .instrument(span)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound);
        }
        Ok(())
    }

    async fn list_secrets(&self) -> Result<Vec<String>, AuthError> {
        let query = "SELECT secret FROM users WHERE secret IS NOT NULL ORDER BY created_at";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;

        Ok(rows.iter().map(|row| row.get("secret")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::fmt;

    #[derive(Debug)]
    struct FakeDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
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

    #[test]
    fn unique_violation_matches_sqlstate_23505() {
        let err = sqlx::Error::Database(Box::new(FakeDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn other_database_errors_are_not_unique_violations() {
        let err = sqlx::Error::Database(Box::new(FakeDbError { code: Some("42P01") }));
        assert!(!is_unique_violation(&err));
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
    }
}
