use time::{OffsetDateTime, UtcOffset};

use super::{DomainError, ImageId, MealId, RecipeId, UserId};

const DISH_NAME_MAX_CHARS: usize = 100;
const MEMO_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DishName(String);

impl DishName {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::new("Dish name cannot be blank"));
        }
        if value.chars().count() > DISH_NAME_MAX_CHARS {
            return Err(DomainError::new(format!(
                "Dish name cannot be longer than {DISH_NAME_MAX_CHARS} characters"
            )));
        }
        Ok(Self(value))
    }

    pub fn from_trusted(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memo(String);

impl Memo {
    /// Empty memos are allowed.
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.chars().count() > MEMO_MAX_CHARS {
            return Err(DomainError::new(format!(
                "Memo cannot be longer than {MEMO_MAX_CHARS} characters"
            )));
        }
        Ok(Self(value))
    }

    pub fn from_trusted(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// When the dish was cooked, kept in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookedAt(OffsetDateTime);

impl CookedAt {
    pub fn new(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    pub fn value(&self) -> OffsetDateTime {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Image {
    pub id: ImageId,
    pub uploaded_at: OffsetDateTime,
}

impl Image {
    pub fn uploaded_now(id: ImageId) -> Self {
        Self {
            id,
            uploaded_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Unvalidated user-editable fields of a meal.
#[derive(Debug, Clone)]
pub struct MealContent {
    pub dish_name: String,
    pub cooked_at: OffsetDateTime,
    pub memo: String,
    pub image: Option<Image>,
    pub recipe_id: Option<RecipeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meal {
    pub id: MealId,
    pub user_id: UserId,
    pub dish_name: DishName,
    pub cooked_at: CookedAt,
    pub memo: Memo,
    pub image: Option<Image>,
    pub recipe_id: Option<RecipeId>,
}

impl Meal {
    /// Validates the content and assigns a new id.
    pub fn create(user_id: UserId, content: MealContent) -> Result<Self, DomainError> {
        Self::validated(MealId::generate(), user_id, content)
    }

    /// Replaces the content, keeping id and owner.
    #[allow(dead_code)] // no edit route yet
    pub fn update(&self, content: MealContent) -> Result<Self, DomainError> {
        Self::validated(self.id, self.user_id, content)
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    fn validated(id: MealId, user_id: UserId, content: MealContent) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            user_id,
            dish_name: DishName::parse(content.dish_name)?,
            cooked_at: CookedAt::new(content.cooked_at),
            memo: Memo::parse(content.memo)?,
            image: content.image,
            recipe_id: content.recipe_id,
        })
    }
}
