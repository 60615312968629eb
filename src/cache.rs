//! Memoized dataset loading
//!
//! Tables are cached per [`DatasetPaths`] together with the stamps of the
//! files they were read from. Every lookup re-stats the files; a different
//! resolved path, modification time or size reloads both tables.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::Result;
use crate::loader::{load_clusters_from, load_orders_from, DatasetPaths, FileStamp};
use crate::models::{CustomerClusterRecord, Order};

/// Immutable snapshot of both input tables
#[derive(Debug)]
pub struct DashboardData {
    pub orders: Vec<Order>,
    pub clusters: Vec<CustomerClusterRecord>,
    pub orders_stamp: FileStamp,
    pub clusters_stamp: FileStamp,
    pub loaded_at: DateTime<Utc>,
}

impl DashboardData {
    fn is_current(&self, orders: &FileStamp, clusters: &FileStamp) -> bool {
        &self.orders_stamp == orders && &self.clusters_stamp == clusters
    }
}

#[derive(Default)]
pub struct DatasetCache {
    entries: RwLock<HashMap<DatasetPaths, Arc<DashboardData>>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot for `paths`, reloading when a file changed on disk
    pub fn get_or_load(&self, paths: &DatasetPaths) -> Result<Arc<DashboardData>> {
        let orders_stamp = FileStamp::of(&paths.resolve_orders()?)?;
        let clusters_stamp = FileStamp::of(&paths.resolve_clusters()?)?;

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(data) = entries.get(paths) {
                if data.is_current(&orders_stamp, &clusters_stamp) {
                    debug!("Dataset cache hit for {:?}", orders_stamp.path);
                    return Ok(Arc::clone(data));
                }
                info!("Dataset files changed on disk, reloading");
            }
        }

        let data = Arc::new(DashboardData {
            orders: load_orders_from(&orders_stamp.path)?,
            clusters: load_clusters_from(&clusters_stamp.path)?,
            orders_stamp,
            clusters_stamp,
            loaded_at: Utc::now(),
        });

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(paths.clone(), Arc::clone(&data));
        Ok(data)
    }

    /// Drop every cached snapshot
    pub fn invalidate(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        info!("Dataset cache cleared ({} entries)", dropped);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
