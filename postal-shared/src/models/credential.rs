/// Login credentials
///
/// Credentials are the identity side of an account: an email and an
/// Argon2id hash. The matching domain row lives in `users` and is created
/// right after the credential at sign-up.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE credentials (
///     email TEXT PRIMARY KEY,
///     password_hash TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use postal_shared::auth::password::hash_password;
/// use postal_shared::models::credential::Credential;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("S3cure!pass")?;
/// Credential::create(&pool, "ana@example.com", &hash).await?;
///
/// let found = Credential::find_by_email(&pool, "ana@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Stored credential
///
/// Not serializable: the hash never leaves the server.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    pub email: String,

    /// Argon2id PHC string
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Stores a new credential
    ///
    /// # Errors
    ///
    /// Fails on a duplicate email (`credentials_pkey`) or a database error.
    pub async fn create(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Credential>(
            r#"
            INSERT INTO credentials (email, password_hash)
            VALUES ($1, $2)
            RETURNING email, password_hash, created_at, updated_at, last_login_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Credential>(
            r#"
            SELECT email, password_hash, created_at, updated_at, last_login_at
            FROM credentials
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the password hash. Returns false if the email is unknown.
    pub async fn update_password(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE credentials
            SET password_hash = $2, updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Moves a credential to a new email. Returns false if `old_email` is unknown.
    pub async fn change_email(
        pool: &PgPool,
        old_email: &str,
        new_email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE credentials
            SET email = $2, updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(old_email)
        .bind(new_email)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn record_login(pool: &PgPool, email: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE credentials SET last_login_at = NOW() WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Removes the credential; used when a user row is deleted
    pub async fn delete(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM credentials WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
