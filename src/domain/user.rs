use time::OffsetDateTime;

use super::{DomainError, UserId};

/// Subject claim issued by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject(String);

impl Subject {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::new("Subject cannot be blank"));
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
pub struct User {
    pub id: UserId,
    pub subject: Subject,
    pub created_at: OffsetDateTime,
}

impl User {
    /// A brand new local user for a subject seen for the first time.
    pub fn create(subject: Subject) -> Self {
        Self {
            id: UserId::generate(),
            subject,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
