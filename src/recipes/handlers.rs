use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{Pagination, SearchParams, SearchResponse},
    repo_types::{NewRecipe, Recipe, RecipeChanges},
    services,
};
use crate::{
    auth::extractors::CurrentUser,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipe", post(create_recipe))
        .route("/recipe/search", get(search_recipes))
}

pub fn item_routes() -> Router<AppState> {
    Router::new().route(
        "/recipe/:id",
        get(get_recipe).patch(update_recipe).delete(delete_recipe),
    )
}

#[instrument(skip(state, user, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<NewRecipe>,
) -> Result<Json<Recipe>, AppError> {
    let recipe = services::create(&state.db, &user, payload).await?;
    Ok(Json(recipe))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AppQuery(p): AppQuery<Pagination>,
) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(services::list(&state.db, p).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<Recipe>, AppError> {
    Ok(Json(services::get(&state.db, id).await?))
}

#[instrument(skip(state, user, changes))]
pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<i64>,
    AppJson(changes): AppJson<RecipeChanges>,
) -> Result<Json<Recipe>, AppError> {
    Ok(Json(services::update(&state.db, id, &user, changes).await?))
}

#[instrument(skip(state, user))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    services::delete(&state.db, id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn search_recipes(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let (recipes, total) = services::search(&state.db, &params.query, params.page()).await?;
    Ok(Json(SearchResponse { recipes, total }))
}
