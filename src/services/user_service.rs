// User registration and credential verification. Passwords are bcrypt
// hashed before they reach the store and never leave this layer.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::models::user::{CreateUser, UserRecord};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Email {0} already registered")]
    AlreadyExists(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError>;
    async fn insert(&self, user: &UserRecord) -> Result<(), DatabaseError>;
}

pub struct UserService<S> {
    store: S,
}

impl<S: UserStore> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn register(&self, data: CreateUser) -> Result<UserRecord, UserError> {
        if self.store.find_by_email(&data.email).await?.is_some() {
            return Err(UserError::AlreadyExists(data.email));
        }

        let password_hash = bcrypt::hash(&data.password, bcrypt::DEFAULT_COST)?;
        let user = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: data.name,
            email: data.email,
            password_hash,
            created_at: Utc::now(),
        };
        self.store.insert(&user).await?;
        Ok(user)
    }

    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, UserError> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        if bcrypt::verify(password, &user.password_hash)? {
            Ok(user)
        } else {
            Err(UserError::InvalidCredentials)
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, UserError> {
        Ok(self.store.find_by_id(id).await?)
    }
}
