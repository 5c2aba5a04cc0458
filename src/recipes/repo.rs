use sqlx::SqliteConnection;

use super::repo_types::Recipe;

/// Escapes LIKE wildcards so the needle is matched literally (with `ESCAPE '\'`).
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub async fn insert(
    conn: &mut SqliteConnection,
    owner_id: i64,
    title: &str,
    description: &str,
) -> sqlx::Result<Recipe> {
    sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (title, description, owner_id)
        VALUES (?1, ?2, ?3)
        RETURNING id, title, description, owner_id
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(owner_id)
    .fetch_one(conn)
    .await
}

pub async fn list(conn: &mut SqliteConnection, limit: i64, offset: i64) -> sqlx::Result<Vec<Recipe>> {
    sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, title, description, owner_id
        FROM recipes
        ORDER BY id
        LIMIT ?1 OFFSET ?2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> sqlx::Result<Option<Recipe>> {
    sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, title, description, owner_id
        FROM recipes
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Only returns the recipe when `owner_id` matches.
pub async fn find_owned(
    conn: &mut SqliteConnection,
    id: i64,
    owner_id: i64,
) -> sqlx::Result<Option<Recipe>> {
    sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, title, description, owner_id
        FROM recipes
        WHERE id = ?1 AND owner_id = ?2
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(conn)
    .await
}

pub async fn save(conn: &mut SqliteConnection, recipe: &Recipe) -> sqlx::Result<Recipe> {
    sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET title = ?1, description = ?2
        WHERE id = ?3
        RETURNING id, title, description, owner_id
        "#,
    )
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.id)
    .fetch_one(conn)
    .await
}

/// Returns the number of rows removed (0 or 1).
pub async fn delete_owned(conn: &mut SqliteConnection, id: i64, owner_id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query(r#"DELETE FROM recipes WHERE id = ?1 AND owner_id = ?2"#)
        .bind(id)
        .bind(owner_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

pub async fn search_by_title(
    conn: &mut SqliteConnection,
    needle: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Recipe>> {
    sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, title, description, owner_id
        FROM recipes
        WHERE lower(title) LIKE ?1 ESCAPE '\'
        ORDER BY id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(like_pattern(needle))
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await
}

pub async fn count_by_title(conn: &mut SqliteConnection, needle: &str) -> sqlx::Result<i64> {
    let (total,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM recipes
        WHERE lower(title) LIKE ?1 ESCAPE '\'
        "#,
    )
    .bind(like_pattern(needle))
    .fetch_one(conn)
    .await?;
    Ok(total)
}
