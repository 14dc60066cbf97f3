//! Outdoor persistence, the public-code index and cascade cleanup

use outdoor_common::{generate_public_code, Ad, Error, Outdoor, Result};
use redis::AsyncCommands;
use tracing::{debug, info};

use super::{
    ad_key, outdoor_code_key, outdoor_key, outdoors_owner_key, rerr, Storage, OUTDOORS_ALL,
};

/// Attempts at reserving a fresh public code before giving up
const CODE_ALLOC_ATTEMPTS: usize = 5;

impl Storage {
    /// Persist a new outdoor, assigning it a unique public code.
    ///
    /// Codes are reserved with `SET NX` and regenerated on collision, so two
    /// outdoors can never share a code even under concurrent creation.
    pub async fn create_outdoor(&mut self, outdoor: &mut Outdoor) -> Result<()> {
        for _ in 0..CODE_ALLOC_ATTEMPTS {
            let code = generate_public_code();

            let reserved: bool = self
                .conn
                .set_nx(outdoor_code_key(&code), &outdoor.id)
                .await
                .map_err(rerr)?;

            if !reserved {
                debug!("Public code collision on {}, retrying", code);
                continue;
            }

            outdoor.public_code = code;

            let json = serde_json::to_string(&*outdoor)?;
            let mut pipe = redis::pipe();
            pipe.atomic()
                .set(outdoor_key(&outdoor.id), json)
                .ignore()
                .sadd(OUTDOORS_ALL, &outdoor.id)
                .ignore()
                .sadd(outdoors_owner_key(&outdoor.owner_id), &outdoor.id)
                .ignore();
            pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)?;

            info!("Created outdoor {} with code {}", outdoor.id, outdoor.public_code);
            return Ok(());
        }

        Err(Error::Other(anyhow::anyhow!(
            "could not allocate a unique public code after {} attempts",
            CODE_ALLOC_ATTEMPTS
        )))
    }

    /// Get an outdoor by id
    pub async fn get_outdoor(&mut self, id: &str) -> Result<Option<Outdoor>> {
        self.get_doc(&outdoor_key(id)).await
    }

    /// Get an outdoor only if it belongs to the given owner.
    ///
    /// Someone else's outdoor is indistinguishable from a missing one.
    pub async fn get_outdoor_owned(&mut self, id: &str, owner_id: &str) -> Result<Outdoor> {
        match self.get_outdoor(id).await? {
            Some(outdoor) if outdoor.owner_id == owner_id => Ok(outdoor),
            _ => Err(Error::NotFound("outdoor not found".to_string())),
        }
    }

    /// Resolve an outdoor by its public code
    pub async fn get_outdoor_by_code(&mut self, code: &str) -> Result<Option<Outdoor>> {
        let id: Option<String> = self.conn.get(outdoor_code_key(code)).await.map_err(rerr)?;

        match id {
            Some(id) => self.get_outdoor(&id).await,
            None => Ok(None),
        }
    }

    /// Persist changes to an existing outdoor
    pub async fn put_outdoor(&mut self, outdoor: &Outdoor) -> Result<()> {
        self.put_doc(&outdoor_key(&outdoor.id), outdoor).await
    }

    /// Delete an outdoor, its code reservation, and every back-reference
    /// from linked ads, in one atomic transaction.
    pub async fn delete_outdoor(&mut self, outdoor: &Outdoor) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(outdoor_key(&outdoor.id))
            .ignore()
            .del(outdoor_code_key(&outdoor.public_code))
            .ignore()
            .srem(OUTDOORS_ALL, &outdoor.id)
            .ignore()
            .srem(outdoors_owner_key(&outdoor.owner_id), &outdoor.id)
            .ignore();

        // Cascade: drop this outdoor from each linked ad's mirror set.
        for ad_id in &outdoor.ad_ids {
            if let Some(mut ad) = self.get_doc::<Ad>(&ad_key(ad_id)).await? {
                ad.outdoor_ids.retain(|id| id != &outdoor.id);
                ad.updated_at = chrono::Utc::now();
                pipe.set(ad_key(&ad.id), serde_json::to_string(&ad)?).ignore();
            }
        }

        pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)?;

        info!("Deleted outdoor {}", outdoor.id);
        Ok(())
    }

    /// List outdoors owned by one user
    pub async fn list_outdoors_by_owner(&mut self, owner_id: &str) -> Result<Vec<Outdoor>> {
        let ids: Vec<String> = self
            .conn
            .smembers(outdoors_owner_key(owner_id))
            .await
            .map_err(rerr)?;
        self.collect_outdoors(&ids).await
    }

    /// List every outdoor
    pub async fn list_all_outdoors(&mut self) -> Result<Vec<Outdoor>> {
        let ids: Vec<String> = self.conn.smembers(OUTDOORS_ALL).await.map_err(rerr)?;
        self.collect_outdoors(&ids).await
    }

    async fn collect_outdoors(&mut self, ids: &[String]) -> Result<Vec<Outdoor>> {
        let mut outdoors = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(outdoor) = self.get_outdoor(id).await? {
                outdoors.push(outdoor);
            }
        }
        Ok(outdoors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outdoor_common::OutdoorKind;

    async fn test_storage() -> Storage {
        Storage::new("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis")
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_create_assigns_unique_code() {
        let mut storage = test_storage().await;

        let mut outdoor = Outdoor::new(
            "Downtown".to_string(),
            "Main St".to_string(),
            OutdoorKind::Led,
            "owner-1".to_string(),
        );

        storage.create_outdoor(&mut outdoor).await.unwrap();
        assert_eq!(outdoor.public_code.len(), 8);

        let by_code = storage
            .get_outdoor_by_code(&outdoor.public_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_code.id, outdoor.id);

        // Clean up
        storage.delete_outdoor(&outdoor).await.unwrap();
        assert!(storage
            .get_outdoor_by_code(&outdoor.public_code)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_owned_lookup_hides_foreign_outdoors() {
        let mut storage = test_storage().await;

        let mut outdoor = Outdoor::new(
            "Mall".to_string(),
            "Elm St".to_string(),
            OutdoorKind::Lcd,
            "owner-1".to_string(),
        );
        storage.create_outdoor(&mut outdoor).await.unwrap();

        assert!(storage.get_outdoor_owned(&outdoor.id, "owner-1").await.is_ok());

        let err = storage
            .get_outdoor_owned(&outdoor.id, "owner-2")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Clean up
        storage.delete_outdoor(&outdoor).await.unwrap();
    }
}
