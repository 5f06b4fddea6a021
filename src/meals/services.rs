use time::{macros::format_description, Date};
use tracing::{debug, info};

use super::dto::{CreateMealRequest, MealResponse, MealsQuery, MealsResponse};
use super::repo::CookedDateRange;
use crate::{
    domain::{Image, ImageId, Meal, MealContent, MealId, RecipeId, UserId},
    error::AppError,
    state::AppState,
};

pub(crate) fn to_response(st: &AppState, meal: Meal) -> MealResponse {
    MealResponse {
        meal_id: meal.id.value(),
        dish_name: meal.dish_name.as_str().to_string(),
        cooked_at: meal.cooked_at.value(),
        memo: meal.memo.as_str().to_string(),
        image_id: meal.image.map(|i| i.id.value()),
        image_url: meal.image.map(|i| st.storage.distribution_url(i.id)),
        recipe_id: meal.recipe_id.map(|r| r.value()),
    }
}

/// Validates the meal, promotes its image to the distribution bucket, then persists it.
pub async fn create_meal(
    st: &AppState,
    user_id: UserId,
    req: CreateMealRequest,
) -> Result<MealResponse, AppError> {
    let image = req.image_id.map(|id| Image::uploaded_now(ImageId(id)));
    let meal = Meal::create(
        user_id,
        MealContent {
            dish_name: req.dish_name,
            cooked_at: req.cooked_at,
            memo: req.memo,
            image,
            recipe_id: req.recipe_id.map(RecipeId),
        },
    )?;

    if let Some(image) = &meal.image {
        st.storage
            .copy_to_distribution(image.id)
            .await
            .map_err(AppError::FailedToCopyImage)?;
    }

    let saved = st.meals.save(&meal).await.map_err(AppError::Repository)?;
    info!(meal_id = %saved.id, %user_id, has_image = saved.image.is_some(), "meal created");
    Ok(to_response(st, saved))
}

pub async fn list_meals(
    st: &AppState,
    user_id: UserId,
    query: MealsQuery,
) -> Result<MealsResponse, AppError> {
    let range = CookedDateRange {
        start: parse_date("startDate", query.start_date.as_deref())?,
        end: parse_date("endDate", query.end_date.as_deref())?,
    };
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(AppError::Validation(
                "startDate must not be after endDate".into(),
            ));
        }
    }

    let meals = st
        .meals
        .find_all(user_id, range)
        .await
        .map_err(AppError::Repository)?;
    debug!(%user_id, count = meals.len(), "meals listed");
    Ok(MealsResponse {
        meals: meals.into_iter().map(|m| to_response(st, m)).collect(),
    })
}

/// Fetches one meal, refusing meals that belong to someone else.
pub async fn get_meal(
    st: &AppState,
    user_id: UserId,
    meal_id: MealId,
) -> Result<MealResponse, AppError> {
    let meal = st
        .meals
        .find_by_id(meal_id)
        .await
        .map_err(AppError::Repository)?
        .ok_or(AppError::MealNotFound)?;

    if !meal.is_owned_by(user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(to_response(st, meal))
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<Date>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date")))
}
