use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{Actor, EngineError, ResultEngine, users, util::normalize_required};

use super::{Engine, with_tx};

impl Engine {
    /// Register an account. The password is stored as an argon2 hash.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> ResultEngine<Actor> {
        let username = username.trim();
        if username.is_empty() || username.chars().any(char::is_whitespace) {
            return Err(EngineError::Validation(
                "username must be a single word".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(EngineError::Validation(
                "password must not be empty".to_string(),
            ));
        }
        let display_name = normalize_required(display_name, "display name")?;
        let password_hash = hash_password(password)?;

        with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.to_string())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username.to_string()));
            }
            let active = users::ActiveModel {
                username: ActiveValue::Set(username.to_string()),
                password_hash: ActiveValue::Set(password_hash),
                display_name: ActiveValue::Set(display_name),
            };
            let model = active.insert(&db_tx).await?;
            tracing::info!(user = %model.username, "user created");
            Ok(Actor::from(model))
        })
    }

    pub async fn user(&self, username: &str) -> ResultEngine<Actor> {
        users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
            .map(Actor::from)
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {username}")))
    }

    /// Check credentials. Unknown users and wrong passwords both yield `None`.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<Option<Actor>> {
        let Some(model) = users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        if verify_password(password, &model.password_hash)? {
            Ok(Some(Actor::from(model)))
        } else {
            Ok(None)
        }
    }
}

fn hash_password(password: &str) -> ResultEngine<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::Password(err.to_string()))
}

fn verify_password(password: &str, hash: &str) -> ResultEngine<bool> {
    let parsed = PasswordHash::new(hash).map_err(|err| EngineError::Password(err.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(EngineError::Password(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("other", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "plain-text"),
            Err(EngineError::Password(_))
        ));
    }
}
