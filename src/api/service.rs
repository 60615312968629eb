//! Shared business logic for the dashboard API
//!
//! Dataset loading and classification are synchronous; every request runs
//! them on the blocking pool against the shared [`DatasetCache`].

use std::sync::Arc;
use tracing::debug;

use crate::cache::{DashboardData, DatasetCache};
use crate::config::AppConfig;
use crate::dashboard::{audience_map, build_dashboard, build_segmentation, AudiencePoint, DashboardView, SegmentationView};
use crate::error::{DashboardError, Result};
use crate::insights::{business_health, friction_diagnosis, BusinessHealth, FrictionDiagnosis};
use crate::segments::SegmentLabel;

/// Segmentation view plus the audience map points of one segment
#[derive(Debug, Clone)]
pub struct SegmentAudience {
    pub view: SegmentationView,
    pub points: Vec<AudiencePoint>,
}

pub struct DashboardService {
    config: Arc<AppConfig>,
    cache: Arc<DatasetCache>,
}

impl DashboardService {
    pub fn new(config: AppConfig) -> Self {
        Self::with_cache(config, Arc::new(DatasetCache::new()))
    }

    pub fn with_cache(config: AppConfig, cache: Arc<DatasetCache>) -> Self {
        Self {
            config: Arc::new(config),
            cache,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cached_datasets(&self) -> usize {
        self.cache.len()
    }

    /// Run `f` on the blocking pool against the current snapshot
    async fn with_data<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DashboardData, &AppConfig) -> Result<T> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || {
            let data = cache.get_or_load(&config.data)?;
            f(&data, &config)
        })
        .await
        .map_err(|e| DashboardError::Io(std::io::Error::other(e)))?
    }

    pub async fn dashboard(&self) -> Result<DashboardView> {
        self.with_data(build_dashboard).await
    }

    pub async fn overview(&self) -> Result<BusinessHealth> {
        self.with_data(|data, _| Ok(business_health(&data.orders))).await
    }

    pub async fn friction(&self) -> Result<FrictionDiagnosis> {
        self.with_data(|data, config| Ok(friction_diagnosis(&data.orders, &config.friction)))
            .await
    }

    pub async fn segmentation(&self) -> Result<SegmentationView> {
        self.with_data(|data, config| build_segmentation(data, config).map(|(view, _)| view))
            .await
    }

    pub async fn segment_audience(&self, label: SegmentLabel) -> Result<SegmentAudience> {
        self.with_data(move |data, config| {
            let (view, classified) = build_segmentation(data, config)?;
            let points = audience_map(&classified, view.monetary_cap)
                .into_iter()
                .filter(|p| p.label == label)
                .collect();
            Ok(SegmentAudience { view, points })
        })
        .await
    }

    pub fn invalidate(&self) {
        debug!("Invalidating dataset cache on request");
        self.cache.invalidate();
    }
}
