use sqlx::SqlitePool;
use tracing::{info, warn};

use super::{
    dto::Pagination,
    repo,
    repo_types::{NewRecipe, Recipe, RecipeChanges},
};
use crate::{auth::repo_types::User, error::AppError};

const NOT_FOUND: &str = "Recipe not found";
const NOT_FOUND_OR_FORBIDDEN: &str = "Recipe not found or not authorized";

pub async fn create(db: &SqlitePool, owner: &User, new: NewRecipe) -> Result<Recipe, AppError> {
    let mut tx = db.begin().await?;
    let recipe = repo::insert(&mut tx, owner.id, &new.title, &new.description).await?;
    tx.commit().await?;

    info!(recipe_id = recipe.id, owner_id = owner.id, "recipe created");
    Ok(recipe)
}

pub async fn list(db: &SqlitePool, page: Pagination) -> Result<Vec<Recipe>, AppError> {
    page.validate()?;
    let mut conn = db.acquire().await?;
    Ok(repo::list(&mut conn, page.limit, page.skip).await?)
}

pub async fn get(db: &SqlitePool, id: i64) -> Result<Recipe, AppError> {
    let mut conn = db.acquire().await?;
    repo::find(&mut conn, id)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))
}

/// Someone else's recipe is reported exactly like a missing one.
pub async fn update(
    db: &SqlitePool,
    id: i64,
    owner: &User,
    changes: RecipeChanges,
) -> Result<Recipe, AppError> {
    let mut tx = db.begin().await?;
    let Some(mut recipe) = repo::find_owned(&mut tx, id, owner.id).await? else {
        warn!(recipe_id = id, user_id = owner.id, "update of missing or foreign recipe");
        return Err(AppError::NotFound(NOT_FOUND_OR_FORBIDDEN));
    };

    if changes.is_empty() {
        return Ok(recipe);
    }
    changes.apply_to(&mut recipe);
    let recipe = repo::save(&mut tx, &recipe).await?;
    tx.commit().await?;

    info!(recipe_id = recipe.id, owner_id = owner.id, "recipe updated");
    Ok(recipe)
}

pub async fn delete(db: &SqlitePool, id: i64, owner: &User) -> Result<(), AppError> {
    let mut tx = db.begin().await?;
    if repo::delete_owned(&mut tx, id, owner.id).await? == 0 {
        warn!(recipe_id = id, user_id = owner.id, "delete of missing or foreign recipe");
        return Err(AppError::NotFound(NOT_FOUND_OR_FORBIDDEN));
    }
    tx.commit().await?;

    info!(recipe_id = id, owner_id = owner.id, "recipe deleted");
    Ok(())
}

/// Case-insensitive substring match on titles; `total` ignores pagination.
pub async fn search(
    db: &SqlitePool,
    needle: &str,
    page: Pagination,
) -> Result<(Vec<Recipe>, i64), AppError> {
    page.validate()?;
    // one transaction so the page and the count see the same snapshot
    let mut tx = db.begin().await?;
    let recipes = repo::search_by_title(&mut tx, needle, page.limit, page.skip).await?;
    let total = repo::count_by_title(&mut tx, needle).await?;
    tx.commit().await?;
    Ok((recipes, total))
}
