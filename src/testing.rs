//! In-memory collaborators for unit and router tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use time::OffsetDateTime;

use crate::auth::{repo::UserRepository, TokenVerifier};
use crate::domain::{ImageId, Meal, MealId, Subject, User, UserId};
use crate::meals::repo::{CookedDateRange, MealRepository};
use crate::state::AppState;
use crate::storage::ImageStore;

pub const TEST_ISSUER: &str = "https://meal-manager.test/";
pub const TEST_AUDIENCE: &str = "https://api.meal-manager.test";
pub const TEST_SECRET: &str = "test-secret";

#[derive(Default)]
pub struct InMemoryUserRepository {
    by_subject: Mutex<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn len(&self) -> usize {
        self.by_subject.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_subject(&self, subject: &Subject) -> anyhow::Result<Option<User>> {
        Ok(self.by_subject.lock().unwrap().get(subject.as_str()).cloned())
    }

    async fn save(&self, user: &User) -> anyhow::Result<User> {
        let mut users = self.by_subject.lock().unwrap();
        Ok(users
            .entry(user.subject.as_str().to_string())
            .or_insert_with(|| user.clone())
            .clone())
    }
}

#[derive(Default)]
pub struct InMemoryMealRepository {
    meals: Mutex<Vec<Meal>>,
}

impl InMemoryMealRepository {
    pub fn get(&self, id: MealId) -> Option<Meal> {
        self.meals.lock().unwrap().iter().find(|m| m.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.meals.lock().unwrap().len()
    }
}

#[async_trait]
impl MealRepository for InMemoryMealRepository {
    async fn save(&self, meal: &Meal) -> anyhow::Result<Meal> {
        let mut meals = self.meals.lock().unwrap();
        let image_taken = meal.image.is_some_and(|img| {
            meals
                .iter()
                .any(|m| m.image.is_some_and(|other| other.id == img.id))
        });
        anyhow::ensure!(!image_taken, "duplicate key value violates unique constraint \"images_pkey\"");
        meals.push(meal.clone());
        Ok(meal.clone())
    }

    async fn find_by_id(&self, meal_id: MealId) -> anyhow::Result<Option<Meal>> {
        Ok(self.get(meal_id))
    }

    async fn find_all(&self, user_id: UserId, range: CookedDateRange) -> anyhow::Result<Vec<Meal>> {
        let mut found: Vec<Meal> = self
            .meals
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_owned_by(user_id))
            .filter(|m| {
                let date = m.cooked_at.value().date();
                range.start.map_or(true, |s| date >= s) && range.end.map_or(true, |e| date <= e)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.cooked_at.value().cmp(&a.cooked_at.value()));
        Ok(found)
    }
}

/// Behaves like S3: copying only succeeds for keys a client has uploaded.
#[derive(Default)]
pub struct FakeImageStore {
    uploaded: Mutex<HashSet<ImageId>>,
    copied: Mutex<Vec<ImageId>>,
    presign_fails: AtomicBool,
}

impl FakeImageStore {
    pub fn client_uploaded(&self, id: ImageId) {
        self.uploaded.lock().unwrap().insert(id);
    }

    pub fn copied(&self) -> Vec<ImageId> {
        self.copied.lock().unwrap().clone()
    }

    pub fn fail_presign(&self) {
        self.presign_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn presign_upload(&self, image_id: ImageId) -> anyhow::Result<String> {
        anyhow::ensure!(
            !self.presign_fails.load(Ordering::SeqCst),
            "no credentials"
        );
        Ok(format!(
            "https://s3.test/meal-manager-upload/{image_id}?X-Amz-Expires=3600"
        ))
    }

    async fn copy_to_distribution(&self, image_id: ImageId) -> anyhow::Result<()> {
        if !self.uploaded.lock().unwrap().contains(&image_id) {
            anyhow::bail!("NoSuchKey: meal-manager-upload/{image_id}");
        }
        self.copied.lock().unwrap().push(image_id);
        Ok(())
    }

    fn distribution_url(&self, image_id: ImageId) -> String {
        format!("https://cdn.test/{image_id}")
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub users: Arc<InMemoryUserRepository>,
    pub meals: Arc<InMemoryMealRepository>,
    pub store: Arc<FakeImageStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUserRepository::default());
        let meals = Arc::new(InMemoryMealRepository::default());
        let store = Arc::new(FakeImageStore::default());
        let state = AppState {
            users: users.clone(),
            meals: meals.clone(),
            storage: store.clone(),
            verifier: Arc::new(TokenVerifier::shared_secret(
                TEST_ISSUER,
                TEST_AUDIENCE,
                TEST_SECRET,
            )),
        };
        Self {
            state,
            users,
            meals,
            store,
        }
    }
}

/// `Authorization` header value for a token the test verifier accepts.
pub fn bearer(subject: &str) -> String {
    let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;
    let token = encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": subject,
            "iss": TEST_ISSUER,
            "aud": TEST_AUDIENCE,
            "exp": exp,
        }),
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("sign test token");
    format!("Bearer {token}")
}
