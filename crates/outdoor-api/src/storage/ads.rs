//! Advertisement persistence and cascade cleanup

use outdoor_common::{Ad, Error, Outdoor, Result};
use redis::AsyncCommands;
use tracing::info;

use super::{ad_key, ads_owner_key, outdoor_key, rerr, Storage, ADS_ALL};

impl Storage {
    /// Persist a new advertisement
    pub async fn create_ad(&mut self, ad: &Ad) -> Result<()> {
        let json = serde_json::to_string(ad)?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(ad_key(&ad.id), json)
            .ignore()
            .sadd(ADS_ALL, &ad.id)
            .ignore()
            .sadd(ads_owner_key(&ad.owner_id), &ad.id)
            .ignore();
        pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)?;

        info!("Created ad {}", ad.id);
        Ok(())
    }

    /// Get an ad by id
    pub async fn get_ad(&mut self, id: &str) -> Result<Option<Ad>> {
        self.get_doc(&ad_key(id)).await
    }

    /// Get an ad only if it belongs to the given owner
    pub async fn get_ad_owned(&mut self, id: &str, owner_id: &str) -> Result<Ad> {
        match self.get_ad(id).await? {
            Some(ad) if ad.owner_id == owner_id => Ok(ad),
            _ => Err(Error::NotFound("ad not found".to_string())),
        }
    }

    /// Persist changes to an existing ad
    pub async fn put_ad(&mut self, ad: &Ad) -> Result<()> {
        self.put_doc(&ad_key(&ad.id), ad).await
    }

    /// Delete an ad, its index entries, and every back-reference from
    /// linked outdoors, in one atomic transaction.
    ///
    /// The stored media file is the caller's to clean up.
    pub async fn delete_ad(&mut self, ad: &Ad) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(ad_key(&ad.id))
            .ignore()
            .srem(ADS_ALL, &ad.id)
            .ignore()
            .srem(ads_owner_key(&ad.owner_id), &ad.id)
            .ignore();

        // Cascade: drop this ad from each linked outdoor's mirror set.
        for outdoor_id in &ad.outdoor_ids {
            if let Some(mut outdoor) = self.get_doc::<Outdoor>(&outdoor_key(outdoor_id)).await? {
                outdoor.ad_ids.retain(|id| id != &ad.id);
                outdoor.updated_at = chrono::Utc::now();
                pipe.set(outdoor_key(&outdoor.id), serde_json::to_string(&outdoor)?)
                    .ignore();
            }
        }

        pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)?;

        info!("Deleted ad {}", ad.id);
        Ok(())
    }

    /// List ads owned by one user
    pub async fn list_ads_by_owner(&mut self, owner_id: &str) -> Result<Vec<Ad>> {
        let ids: Vec<String> = self
            .conn
            .smembers(ads_owner_key(owner_id))
            .await
            .map_err(rerr)?;
        self.collect_ads(&ids).await
    }

    /// List every ad
    pub async fn list_all_ads(&mut self) -> Result<Vec<Ad>> {
        let ids: Vec<String> = self.conn.smembers(ADS_ALL).await.map_err(rerr)?;
        self.collect_ads(&ids).await
    }

    /// Resolve a list of ad ids, skipping any that no longer exist
    pub async fn collect_ads(&mut self, ids: &[String]) -> Result<Vec<Ad>> {
        let mut ads = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(ad) = self.get_ad(id).await? {
                ads.push(ad);
            }
        }
        Ok(ads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outdoor_common::{MediaKind, OutdoorKind};

    async fn test_storage() -> Storage {
        Storage::new("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis")
    }

    fn test_ad(owner: &str) -> Ad {
        Ad::new(
            "Sale".to_string(),
            MediaKind::Image,
            "file.png".to_string(),
            10,
            owner.to_string(),
        )
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_link_is_idempotent() {
        let mut storage = test_storage().await;

        let mut outdoor = Outdoor::new(
            "Plaza".to_string(),
            "5th Ave".to_string(),
            OutdoorKind::Projector,
            "owner-1".to_string(),
        );
        storage.create_outdoor(&mut outdoor).await.unwrap();

        let mut ad = test_ad("owner-1");
        storage.create_ad(&ad).await.unwrap();

        storage.link_ad(&mut outdoor, &mut ad).await.unwrap();
        storage.link_ad(&mut outdoor, &mut ad).await.unwrap();

        let stored_outdoor = storage.get_outdoor(&outdoor.id).await.unwrap().unwrap();
        let stored_ad = storage.get_ad(&ad.id).await.unwrap().unwrap();
        assert_eq!(stored_outdoor.ad_ids, vec![ad.id.clone()]);
        assert_eq!(stored_ad.outdoor_ids, vec![outdoor.id.clone()]);

        storage.unlink_ad(&mut outdoor, &mut ad).await.unwrap();
        let stored_outdoor = storage.get_outdoor(&outdoor.id).await.unwrap().unwrap();
        assert!(stored_outdoor.ad_ids.is_empty());

        // Clean up
        storage.delete_ad(&ad).await.unwrap();
        storage.delete_outdoor(&outdoor).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis to be running
    async fn test_delete_ad_cleans_outdoor_references() {
        let mut storage = test_storage().await;

        let mut outdoor = Outdoor::new(
            "Station".to_string(),
            "Central".to_string(),
            OutdoorKind::Led,
            "owner-1".to_string(),
        );
        storage.create_outdoor(&mut outdoor).await.unwrap();

        let mut ad = test_ad("owner-1");
        storage.create_ad(&ad).await.unwrap();
        storage.link_ad(&mut outdoor, &mut ad).await.unwrap();

        storage.delete_ad(&ad).await.unwrap();

        let stored_outdoor = storage.get_outdoor(&outdoor.id).await.unwrap().unwrap();
        assert!(stored_outdoor.ad_ids.is_empty());
        assert!(storage.get_ad(&ad.id).await.unwrap().is_none());

        // Clean up
        storage.delete_outdoor(&outdoor).await.unwrap();
    }
}
