use anyhow::Context;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::domain::{
    CookedAt, DishName, Image, ImageId, Meal, MealId, Memo, RecipeId, UserId,
};

/// Inclusive bounds on the UTC calendar date of `cooked_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CookedDateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

#[async_trait]
pub trait MealRepository: Send + Sync {
    /// Persists the meal together with its image row and association.
    async fn save(&self, meal: &Meal) -> anyhow::Result<Meal>;
    async fn find_by_id(&self, meal_id: MealId) -> anyhow::Result<Option<Meal>>;
    /// Meals of one user, newest `cooked_at` first.
    async fn find_all(&self, user_id: UserId, range: CookedDateRange) -> anyhow::Result<Vec<Meal>>;
}

#[derive(Debug, FromRow)]
struct MealRow {
    meal_id: Uuid,
    user_id: Uuid,
    dish_name: String,
    cooked_at: OffsetDateTime,
    memo: String,
    recipe_id: Option<Uuid>,
    image_id: Option<Uuid>,
    uploaded_at: Option<OffsetDateTime>,
}

impl From<MealRow> for Meal {
    fn from(r: MealRow) -> Self {
        let image = match (r.image_id, r.uploaded_at) {
            (Some(id), Some(uploaded_at)) => Some(Image {
                id: ImageId(id),
                uploaded_at,
            }),
            _ => None,
        };
        Self {
            id: MealId(r.meal_id),
            user_id: UserId(r.user_id),
            dish_name: DishName::from_trusted(r.dish_name),
            cooked_at: CookedAt::new(r.cooked_at),
            memo: Memo::from_trusted(r.memo),
            image,
            recipe_id: r.recipe_id.map(RecipeId),
        }
    }
}

#[derive(Clone)]
pub struct PgMealRepository {
    db: PgPool,
}

impl PgMealRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealRepository for PgMealRepository {
    async fn save(&self, meal: &Meal) -> anyhow::Result<Meal> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        sqlx::query(
            r#"
            INSERT INTO meals (meal_id, user_id, dish_name, cooked_at, memo, recipe_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(meal.id.value())
        .bind(meal.user_id.value())
        .bind(meal.dish_name.as_str())
        .bind(meal.cooked_at.value())
        .bind(meal.memo.as_str())
        .bind(meal.recipe_id.map(|r| r.value()))
        .execute(&mut *tx)
        .await
        .context("insert meal")?;

        if let Some(image) = &meal.image {
            sqlx::query(
                r#"
                INSERT INTO images (image_id, uploaded_at)
                VALUES ($1, $2)
                "#,
            )
            .bind(image.id.value())
            .bind(image.uploaded_at)
            .execute(&mut *tx)
            .await
            .context("insert image")?;

            sqlx::query(
                r#"
                INSERT INTO meal_images (meal_id, image_id)
                VALUES ($1, $2)
                "#,
            )
            .bind(meal.id.value())
            .bind(image.id.value())
            .execute(&mut *tx)
            .await
            .context("insert meal image")?;
        }

        tx.commit().await.context("commit tx")?;
        Ok(meal.clone())
    }

    async fn find_by_id(&self, meal_id: MealId) -> anyhow::Result<Option<Meal>> {
        let row = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT m.meal_id, m.user_id, m.dish_name, m.cooked_at, m.memo, m.recipe_id,
                   i.image_id, i.uploaded_at
              FROM meals m
              LEFT JOIN meal_images mi ON mi.meal_id = m.meal_id
              LEFT JOIN images i ON i.image_id = mi.image_id
             WHERE m.meal_id = $1
            "#,
        )
        .bind(meal_id.value())
        .fetch_optional(&self.db)
        .await
        .context("find meal by id")?;
        Ok(row.map(Meal::from))
    }

    async fn find_all(&self, user_id: UserId, range: CookedDateRange) -> anyhow::Result<Vec<Meal>> {
        let rows = sqlx::query_as::<_, MealRow>(
            r#"
            SELECT m.meal_id, m.user_id, m.dish_name, m.cooked_at, m.memo, m.recipe_id,
                   i.image_id, i.uploaded_at
              FROM meals m
              LEFT JOIN meal_images mi ON mi.meal_id = m.meal_id
              LEFT JOIN images i ON i.image_id = mi.image_id
             WHERE m.user_id = $1
               AND ($2::date IS NULL OR (m.cooked_at AT TIME ZONE 'UTC')::date >= $2)
               AND ($3::date IS NULL OR (m.cooked_at AT TIME ZONE 'UTC')::date <= $3)
             ORDER BY m.cooked_at DESC
            "#,
        )
        .bind(user_id.value())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await
        .context("list meals by user")?;
        Ok(rows.into_iter().map(Meal::from).collect())
    }
}
