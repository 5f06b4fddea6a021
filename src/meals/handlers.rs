use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateMealRequest, MealResponse, MealsQuery, MealsResponse};
use super::services;
use crate::{auth::CurrentUser, domain::MealId, error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/:meal_id", get(get_meal))
}

#[instrument(skip(state, body))]
pub async fn create_meal(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<CreateMealRequest>,
) -> Result<(StatusCode, HeaderMap, Json<MealResponse>), AppError> {
    let meal = services::create_meal(&state, user_id, body).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) =
        HeaderValue::from_str(&format!("/meal-manager-api/meals/{}", meal.meal_id))
    {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(meal)))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<MealsQuery>,
) -> Result<Json<MealsResponse>, AppError> {
    services::list_meals(&state, user_id, query).await.map(Json)
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(meal_id): Path<Uuid>,
) -> Result<Json<MealResponse>, AppError> {
    services::get_meal(&state, user_id, MealId(meal_id))
        .await
        .map(Json)
}
