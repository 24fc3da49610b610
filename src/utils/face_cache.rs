use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{CredentialSource, FaceProfile, StoreError};

/// Snapshot of every active employee's enrolled face vector.
///
/// Matching scans this snapshot instead of hitting the database per kiosk
/// scan. Enrolments and deactivations show up once the entry expires; the
/// resolver re-reads the matched employee, so a stale snapshot can never
/// admit a deactivated account.
#[derive(Clone)]
pub struct FaceCache {
    snapshot: Cache<(), Arc<Vec<FaceProfile>>>,
    source: Arc<dyn CredentialSource>,
}

impl FaceCache {
    pub fn new(source: Arc<dyn CredentialSource>, ttl: Duration) -> Self {
        Self {
            snapshot: Cache::builder()
                .max_capacity(1)
                .time_to_live(ttl)
                .build(),
            source,
        }
    }

    /// Current snapshot, loading it on a miss. Concurrent misses share one load.
    pub async fn profiles(&self) -> Result<Arc<Vec<FaceProfile>>, Arc<StoreError>> {
        let source = self.source.clone();
        self.snapshot
            .try_get_with((), async move {
                source.active_face_profiles().await.map(Arc::new)
            })
            .await
    }

    /// Drop the snapshot so the next scan reloads it.
    pub async fn invalidate(&self) {
        self.snapshot.invalidate(&()).await;
    }
}

/// Load the snapshot ahead of the first kiosk scan
pub async fn warmup_face_cache(cache: &FaceCache) -> anyhow::Result<()> {
    let profiles = cache
        .profiles()
        .await
        .map_err(|e| anyhow::anyhow!("face snapshot load failed: {}", e))?;

    log::info!(
        "Face cache warmup complete: {} enrolled active employees",
        profiles.len()
    );

    Ok(())
}
