//! Redis document storage
//!
//! One JSON document per entity under a typed key, secondary indexes as
//! Redis sets, unique constraints via `SET NX`. Writes that touch the
//! mirrored Outdoor/Ad link sets go through a single atomic pipeline so a
//! crash cannot leave a one-sided reference.

mod ads;
mod outdoors;
mod users;

use anyhow::Context;
use chrono::Utc;
use outdoor_common::{Ad, Error, Outdoor, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

pub(crate) const USERS_ALL: &str = "users:all";
pub(crate) const OUTDOORS_ALL: &str = "outdoors:all";
pub(crate) const ADS_ALL: &str = "ads:all";

pub(crate) fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub(crate) fn user_email_key(email: &str) -> String {
    format!("user:email:{}", email)
}

pub(crate) fn outdoor_key(id: &str) -> String {
    format!("outdoor:{}", id)
}

pub(crate) fn outdoor_code_key(code: &str) -> String {
    format!("outdoor:code:{}", code)
}

pub(crate) fn outdoors_owner_key(owner_id: &str) -> String {
    format!("outdoors:owner:{}", owner_id)
}

pub(crate) fn ad_key(id: &str) -> String {
    format!("ad:{}", id)
}

pub(crate) fn ads_owner_key(owner_id: &str) -> String {
    format!("ads:owner:{}", owner_id)
}

pub(crate) fn rerr(e: redis::RedisError) -> Error {
    Error::Redis(e.to_string())
}

/// Storage backend for users, outdoors and ads
pub struct Storage {
    conn: ConnectionManager,
}

impl Storage {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    /// Fetch and deserialize a document
    pub(crate) async fn get_doc<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        let json: Option<String> = self.conn.get(key).await.map_err(rerr)?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a document
    pub(crate) async fn put_doc<T: Serialize>(&mut self, key: &str, doc: &T) -> Result<()> {
        let json = serde_json::to_string(doc)?;
        let _: () = self.conn.set(key, json).await.map_err(rerr)?;
        Ok(())
    }

    /// Link an ad to an outdoor, updating both mirrored sets.
    ///
    /// Idempotent: a reference that is already present is not duplicated.
    /// Both documents are written in one atomic pipeline.
    pub async fn link_ad(&mut self, outdoor: &mut Outdoor, ad: &mut Ad) -> Result<()> {
        let now = Utc::now();

        if !outdoor.ad_ids.contains(&ad.id) {
            outdoor.ad_ids.push(ad.id.clone());
            outdoor.updated_at = now;
        }
        if !ad.outdoor_ids.contains(&outdoor.id) {
            ad.outdoor_ids.push(outdoor.id.clone());
            ad.updated_at = now;
        }

        self.write_pair(outdoor, ad).await?;
        info!("Linked ad {} to outdoor {}", ad.id, outdoor.id);
        Ok(())
    }

    /// Unlink an ad from an outdoor on both sides. Idempotent.
    pub async fn unlink_ad(&mut self, outdoor: &mut Outdoor, ad: &mut Ad) -> Result<()> {
        let now = Utc::now();

        outdoor.ad_ids.retain(|id| id != &ad.id);
        outdoor.updated_at = now;
        ad.outdoor_ids.retain(|id| id != &outdoor.id);
        ad.updated_at = now;

        self.write_pair(outdoor, ad).await?;
        info!("Unlinked ad {} from outdoor {}", ad.id, outdoor.id);
        Ok(())
    }

    /// Write an outdoor and an ad in one atomic transaction
    async fn write_pair(&mut self, outdoor: &Outdoor, ad: &Ad) -> Result<()> {
        let outdoor_json = serde_json::to_string(outdoor)?;
        let ad_json = serde_json::to_string(ad)?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(outdoor_key(&outdoor.id), outdoor_json)
            .ignore()
            .set(ad_key(&ad.id), ad_json)
            .ignore();

        pipe.query_async::<_, ()>(&mut self.conn).await.map_err(rerr)
    }
}
