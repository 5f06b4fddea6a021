use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealRequest {
    pub dish_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub cooked_at: OffsetDateTime,
    #[serde(default)]
    pub memo: String,
    /// Image already uploaded through a pre-signed URL.
    pub image_id: Option<Uuid>,
    pub recipe_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealResponse {
    pub meal_id: Uuid,
    pub dish_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub cooked_at: OffsetDateTime,
    pub memo: String,
    pub image_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub recipe_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MealsResponse {
    pub meals: Vec<MealResponse>,
}

/// `YYYY-MM-DD`, both bounds inclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
