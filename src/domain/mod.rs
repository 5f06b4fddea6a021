//! Domain model: validated value objects for users and meals.

mod meal;
mod user;

pub use meal::{CookedAt, DishName, Image, Meal, Memo, MealContent};
pub use user::{Subject, User};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation failure raised while building a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DomainError(pub String);

impl DomainError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(UserId);
id_type!(MealId);
id_type!(RecipeId);
id_type!(ImageId);

// Recipe ids are only ever supplied by clients.
macro_rules! generated_id {
    ($($name:ident),*) => {
        $(impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        })*
    };
}

generated_id!(UserId, MealId, ImageId);
