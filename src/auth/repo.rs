use crate::auth::repo_types::User;
use sqlx::SqliteConnection;

impl User {
    /// Find a user by username.
    pub async fn find_by_username(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(conn)
        .await
    }

    /// Create a new user with an already hashed password.
    pub async fn create(
        conn: &mut SqliteConnection,
        username: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES (?1, ?2)
            RETURNING id, username, password_hash
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(conn)
        .await
    }
}
