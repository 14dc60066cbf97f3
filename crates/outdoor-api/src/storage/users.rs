//! User persistence and the unique-email index

use outdoor_common::{Error, Result, User};
use redis::AsyncCommands;
use tracing::{debug, info};

use super::{rerr, user_email_key, user_key, Storage, USERS_ALL};

impl Storage {
    /// Persist a new user.
    ///
    /// The email index entry is reserved with `SET NX`, which makes the
    /// uniqueness check atomic; a lost race surfaces as `DuplicateEmail`.
    pub async fn create_user(&mut self, user: &User) -> Result<()> {
        let reserved: bool = self
            .conn
            .set_nx(user_email_key(&user.email), &user.id)
            .await
            .map_err(rerr)?;

        if !reserved {
            debug!("Email already registered: {}", user.email);
            return Err(Error::DuplicateEmail);
        }

        let json = serde_json::to_string(user)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(user_key(&user.id), json)
            .ignore()
            .sadd(USERS_ALL, &user.id)
            .ignore();
        pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)?;

        info!("Created user {}", user.id);
        Ok(())
    }

    /// Get a user by id
    pub async fn get_user(&mut self, id: &str) -> Result<Option<User>> {
        self.get_doc(&user_key(id)).await
    }

    /// Get a user by email, via the email index
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        let id: Option<String> = self.conn.get(user_email_key(email)).await.map_err(rerr)?;

        match id {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    /// Persist changes to a user whose email did not change
    pub async fn put_user(&mut self, user: &User) -> Result<()> {
        self.put_doc(&user_key(&user.id), user).await
    }

    /// Persist a user whose email changed, moving the index entry.
    ///
    /// Fails with `DuplicateEmail` if the new address is already taken.
    pub async fn update_user_email(&mut self, user: &User, previous_email: &str) -> Result<()> {
        let reserved: bool = self
            .conn
            .set_nx(user_email_key(&user.email), &user.id)
            .await
            .map_err(rerr)?;

        if !reserved {
            return Err(Error::DuplicateEmail);
        }

        let json = serde_json::to_string(user)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(user_key(&user.id), json)
            .ignore()
            .del(user_email_key(previous_email))
            .ignore();
        pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)?;

        Ok(())
    }

    /// Delete a user and its index entries
    pub async fn delete_user(&mut self, user: &User) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(user_key(&user.id))
            .ignore()
            .del(user_email_key(&user.email))
            .ignore()
            .srem(USERS_ALL, &user.id)
            .ignore();
        pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)?;

        info!("Deleted user {}", user.id);
        Ok(())
    }

    /// List all users
    pub async fn list_users(&mut self) -> Result<Vec<User>> {
        let ids: Vec<String> = self.conn.smembers(USERS_ALL).await.map_err(rerr)?;

        let mut users = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(user) = self.get_user(id).await? {
                users.push(user);
            }
        }

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_storage() -> Storage {
        Storage::new("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis")
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_create_and_lookup_user() {
        let mut storage = test_storage().await;

        let user = User::new(
            "Alice".to_string(),
            format!("alice-{}@example.com", uuid::Uuid::new_v4()),
            "hash".to_string(),
        );

        storage.create_user(&user).await.unwrap();

        let by_id = storage.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, user.email);

        let by_email = storage.get_user_by_email(&user.email).await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        // Clean up
        storage.delete_user(&user).await.unwrap();
        assert!(storage.get_user(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_duplicate_email_rejected() {
        let mut storage = test_storage().await;

        let email = format!("bob-{}@example.com", uuid::Uuid::new_v4());
        let first = User::new("Bob".to_string(), email.clone(), "hash".to_string());
        let second = User::new("Bobby".to_string(), email, "hash".to_string());

        storage.create_user(&first).await.unwrap();

        let err = storage.create_user(&second).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));

        // Clean up
        storage.delete_user(&first).await.unwrap();
    }
}
