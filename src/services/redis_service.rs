// src/services/redis_service.rs
use crate::errors::SkinsightError;
use crate::models::{AnalysisState, SavedScan, SkinAnalysis};
use redis::{AsyncCommands, Client};
use uuid::Uuid;

// Analysis results are ephemeral; saved scans, routines, and profile blobs
// are not.
const EPHEMERAL_TTL_SECS: usize = 86400;

// Most recent scans only; older entries fall off the end.
const HISTORY_LIMIT: usize = 5;

pub struct RedisService {
    client: Client,
}

impl RedisService {
    pub async fn new(redis_url: &str) -> Result<Self, SkinsightError> {
        let client =
            Client::open(redis_url).map_err(|e| SkinsightError::Storage(e.to_string()))?;

        // Test connection
        let mut conn = client
            .get_async_connection()
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        Ok(Self { client })
    }

    async fn conn(&self) -> Result<redis::aio::Connection, SkinsightError> {
        self.client
            .get_async_connection()
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))
    }

    fn key(user: &str, suffix: &str) -> String {
        format!("skinsight:{}:{}", user, suffix)
    }

    pub async fn store_current_analysis(
        &self,
        user: &str,
        analysis: &SkinAnalysis,
    ) -> Result<(), SkinsightError> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(analysis)
            .map_err(|e| SkinsightError::Serialization(e.to_string()))?;

        conn.set_ex::<_, _, ()>(Self::key(user, "current"), value, EPHEMERAL_TTL_SECS)
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        Ok(())
    }

    pub async fn get_current_analysis(
        &self,
        user: &str,
    ) -> Result<Option<SkinAnalysis>, SkinsightError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(Self::key(user, "current"))
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        value
            .map(|v| {
                serde_json::from_str(&v).map_err(|e| SkinsightError::Serialization(e.to_string()))
            })
            .transpose()
    }

    pub async fn store_state(
        &self,
        user: &str,
        state: &AnalysisState,
    ) -> Result<(), SkinsightError> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(state)
            .map_err(|e| SkinsightError::Serialization(e.to_string()))?;

        conn.set_ex::<_, _, ()>(Self::key(user, "state"), value, EPHEMERAL_TTL_SECS)
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        Ok(())
    }

    pub async fn get_state(&self, user: &str) -> Result<AnalysisState, SkinsightError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(Self::key(user, "state"))
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        match value {
            Some(v) => {
                serde_json::from_str(&v).map_err(|e| SkinsightError::Serialization(e.to_string()))
            }
            None => Ok(AnalysisState::Idle),
        }
    }

    /// Prepends to the capped history. The whole array is replaced on every
    /// write; there are no partial updates.
    pub async fn save_scan(&self, user: &str, scan: &SavedScan) -> Result<(), SkinsightError> {
        let mut scans = self.get_scans(user).await?;
        scans.insert(0, scan.clone());
        scans.truncate(HISTORY_LIMIT);

        let value = serde_json::to_string(&scans)
            .map_err(|e| SkinsightError::Serialization(e.to_string()))?;

        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(Self::key(user, "scans"), value)
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        Ok(())
    }

    pub async fn get_scans(&self, user: &str) -> Result<Vec<SavedScan>, SkinsightError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(Self::key(user, "scans"))
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        match value {
            Some(v) => {
                serde_json::from_str(&v).map_err(|e| SkinsightError::Serialization(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn delete_scan(&self, user: &str, scan_id: &Uuid) -> Result<bool, SkinsightError> {
        let scans = self.get_scans(user).await?;
        let before = scans.len();
        let remaining: Vec<SavedScan> =
            scans.into_iter().filter(|s| s.id != *scan_id).collect();

        if remaining.len() == before {
            return Ok(false);
        }

        let value = serde_json::to_string(&remaining)
            .map_err(|e| SkinsightError::Serialization(e.to_string()))?;

        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(Self::key(user, "scans"), value)
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        Ok(true)
    }

    pub async fn get_routines(&self, user: &str) -> Result<Option<serde_json::Value>, SkinsightError> {
        self.get_blob(&Self::key(user, "routines")).await
    }

    pub async fn put_routines(
        &self,
        user: &str,
        routines: &serde_json::Value,
    ) -> Result<(), SkinsightError> {
        self.put_blob(&Self::key(user, "routines"), routines).await
    }

    pub async fn get_profile(&self, user: &str) -> Result<Option<serde_json::Value>, SkinsightError> {
        self.get_blob(&Self::key(user, "profile")).await
    }

    pub async fn put_profile(
        &self,
        user: &str,
        profile: &serde_json::Value,
    ) -> Result<(), SkinsightError> {
        self.put_blob(&Self::key(user, "profile"), profile).await
    }

    /// One row per saved scan in the per-user profile hash. Callers treat
    /// this as fire-and-forget; failures are logged, never surfaced.
    pub async fn record_profile_scan(
        &self,
        user: &str,
        scan: &SavedScan,
    ) -> Result<(), SkinsightError> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(scan)
            .map_err(|e| SkinsightError::Serialization(e.to_string()))?;

        conn.hset::<_, _, _, ()>(
            format!("skinsight:profiles:{}:scans", user),
            scan.id.to_string(),
            value,
        )
        .await
        .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get_blob(&self, key: &str) -> Result<Option<serde_json::Value>, SkinsightError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        value
            .map(|v| {
                serde_json::from_str(&v).map_err(|e| SkinsightError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn put_blob(
        &self,
        key: &str,
        blob: &serde_json::Value,
    ) -> Result<(), SkinsightError> {
        let mut conn = self.conn().await?;
        let value = serde_json::to_string(blob)
            .map_err(|e| SkinsightError::Serialization(e.to_string()))?;

        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| SkinsightError::Storage(e.to_string()))?;

        Ok(())
    }
}
