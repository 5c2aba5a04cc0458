use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::{
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo_types::User,
};
use crate::error::AppError;

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Creates a user, refusing a username that is already taken.
pub async fn register(db: &SqlitePool, username: &str, password: &str) -> Result<User, AppError> {
    if username.is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }

    let mut tx = db.begin().await?;

    if User::find_by_username(&mut tx, username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(AppError::DuplicateUsername);
    }

    let hash = hash_password(password)?;
    let user = match User::create(&mut tx, username, &hash).await {
        Ok(u) => u,
        // lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => return Err(AppError::DuplicateUsername),
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Checks the credentials and issues an access token keyed on the username.
pub async fn authenticate(
    db: &SqlitePool,
    keys: &JwtKeys,
    username: &str,
    password: &str,
) -> Result<String, AppError> {
    let mut conn = db.acquire().await?;
    let user = User::find_by_username(&mut conn, username).await?;
    drop(conn);

    let Some(user) = user else {
        warn!(%username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash) {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.issue(&user.username)?;
    info!(user_id = user.id, "user logged in");
    Ok(token)
}

/// Maps a bearer token to the user it names.
pub async fn resolve(db: &SqlitePool, keys: &JwtKeys, token: &str) -> Result<User, AppError> {
    let username = keys.validate(token)?;
    let mut conn = db.acquire().await?;
    User::find_by_username(&mut conn, &username)
        .await?
        .ok_or_else(|| {
            warn!(%username, "token subject no longer exists");
            AppError::UnknownUser
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn any_non_empty_username_registers_and_logs_in() {
        let state = AppState::fake().await;
        for name in ["Alice Smith", "renée", "bob.smith@example.com", "x"] {
            register(&state.db, name, "pw").await.unwrap();
            let token = authenticate(&state.db, &state.jwt, name, "pw").await.unwrap();
            assert_eq!(state.jwt.validate(&token).unwrap(), name);
        }
    }

    #[tokio::test]
    async fn register_twice_is_rejected() {
        let state = AppState::fake().await;
        let first = register(&state.db, "alice", "pw1").await.unwrap();
        assert_eq!(first.username, "alice");

        let err = register(&state.db, "alice", "other").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        // the original password still works, nothing was overwritten
        authenticate(&state.db, &state.jwt, "alice", "pw1").await.unwrap();
    }

    #[tokio::test]
    async fn register_rejects_invalid_input() {
        let state = AppState::fake().await;
        assert!(matches!(
            register(&state.db, "", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register(&state.db, "alice", "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn stored_hash_is_not_the_password() {
        let state = AppState::fake().await;
        let user = register(&state.db, "alice", "pw1").await.unwrap();
        assert_ne!(user.password_hash, "pw1");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn authenticate_checks_password() {
        let state = AppState::fake().await;
        register(&state.db, "alice", "pw1").await.unwrap();

        let token = authenticate(&state.db, &state.jwt, "alice", "pw1").await.unwrap();
        assert_eq!(state.jwt.validate(&token).unwrap(), "alice");

        let err = authenticate(&state.db, &state.jwt, "alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn authenticate_unknown_user_fails() {
        let state = AppState::fake().await;
        let err = authenticate(&state.db, &state.jwt, "ghost", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn resolve_returns_token_owner() {
        let state = AppState::fake().await;
        let alice = register(&state.db, "alice", "pw1").await.unwrap();
        let token = authenticate(&state.db, &state.jwt, "alice", "pw1").await.unwrap();

        let resolved = resolve(&state.db, &state.jwt, &token).await.unwrap();
        assert_eq!(resolved.id, alice.id);
        assert_eq!(resolved.username, "alice");
    }

    #[tokio::test]
    async fn resolve_fails_for_missing_user_or_bad_token() {
        let state = AppState::fake().await;
        let token = state.jwt.issue("nobody").unwrap();
        assert!(matches!(
            resolve(&state.db, &state.jwt, &token).await,
            Err(AppError::UnknownUser)
        ));
        assert!(matches!(
            resolve(&state.db, &state.jwt, "garbage").await,
            Err(AppError::InvalidToken)
        ));
    }
}
