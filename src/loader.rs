//! Dataset loading for the order export and the clustering output
//!
//! The order export is usually shipped gzip-compressed; a plain CSV next to it
//! is used when the compressed file is absent.

use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

use crate::error::{DashboardError, Result};
use crate::models::{CustomerClusterRecord, Order, OrderCsvRecord};

/// Number of bad rows reported individually before only counting
const MAX_REPORTED_ROW_ERRORS: usize = 5;

/// Where the two input tables live
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    pub orders_path: PathBuf,
    pub orders_fallback_path: Option<PathBuf>,
    pub clusters_path: PathBuf,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            orders_path: PathBuf::from("data/olist_processed.csv.gz"),
            orders_fallback_path: Some(PathBuf::from("data/olist_processed.csv")),
            clusters_path: PathBuf::from("data/olist_clusters.csv"),
        }
    }
}

impl DatasetPaths {
    /// Candidate order files in lookup order
    pub fn order_candidates(&self) -> Vec<&Path> {
        let mut candidates = vec![self.orders_path.as_path()];
        if let Some(fallback) = &self.orders_fallback_path {
            candidates.push(fallback.as_path());
        }
        candidates
    }

    pub fn resolve_orders(&self) -> Result<PathBuf> {
        resolve("orders", &self.order_candidates())
    }

    pub fn resolve_clusters(&self) -> Result<PathBuf> {
        resolve("clusters", &[self.clusters_path.as_path()])
    }
}

/// Identity of one version of a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileStamp {
    pub fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

fn resolve(dataset: &'static str, candidates: &[&Path]) -> Result<PathBuf> {
    candidates
        .iter()
        .find(|p| p.is_file())
        .map(|p| p.to_path_buf())
        .ok_or_else(|| DashboardError::DatasetNotFound {
            dataset,
            tried: candidates.iter().map(|p| p.to_path_buf()).collect(),
        })
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Open a file, transparently decompressing `.gz`
pub fn open_dataset(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Deserialize every row, skipping (and counting) the ones that fail
fn read_rows<T, R>(dataset: &'static str, reader: R) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut error_count = 0;
    let mut first_error: Option<String> = None;

    for (i, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                if error_count < MAX_REPORTED_ROW_ERRORS {
                    warn!("Skipping {} row {}: {}", dataset, i + 1, e);
                }
                first_error.get_or_insert_with(|| e.to_string());
                error_count += 1;
            }
        }
    }

    if rows.is_empty() {
        if let Some(reason) = first_error {
            return Err(DashboardError::InvalidDataset { dataset, reason });
        }
    }
    if error_count > 0 {
        warn!("Skipped {} unreadable {} rows", error_count, dataset);
    }

    Ok(rows)
}

/// Parse order lines from any CSV source
pub fn read_orders<R: Read>(reader: R) -> Result<Vec<Order>> {
    let raw: Vec<OrderCsvRecord> = read_rows("orders", reader)?;

    let mut orders = Vec::with_capacity(raw.len());
    let mut error_count = 0;
    for (i, record) in raw.iter().enumerate() {
        match record.to_order() {
            Ok(order) => orders.push(order),
            Err(e) => {
                if error_count < MAX_REPORTED_ROW_ERRORS {
                    warn!("Failed to parse order {} ({}): {}", i + 1, record.order_id, e);
                }
                error_count += 1;
            }
        }
    }

    if error_count > 0 {
        warn!("Dropped {} orders with unparseable timestamps", error_count);
    }
    Ok(orders)
}

/// Parse clustering output rows from any CSV source
pub fn read_clusters<R: Read>(reader: R) -> Result<Vec<CustomerClusterRecord>> {
    read_rows("clusters", reader)
}

pub fn load_orders_from(path: &Path) -> Result<Vec<Order>> {
    let orders = read_orders(open_dataset(path)?)?;
    info!("Loaded {} order lines from {:?}", orders.len(), path);
    Ok(orders)
}

pub fn load_clusters_from(path: &Path) -> Result<Vec<CustomerClusterRecord>> {
    let clusters = read_clusters(open_dataset(path)?)?;
    info!("Loaded {} clustered customers from {:?}", clusters.len(), path);
    Ok(clusters)
}

/// Load orders from the primary path, or the fallback when it is missing
pub fn load_orders(paths: &DatasetPaths) -> Result<Vec<Order>> {
    let path = paths.resolve_orders()?;
    if path != paths.orders_path {
        info!("{:?} not found, using fallback {:?}", paths.orders_path, path);
    }
    load_orders_from(&path)
}

pub fn load_clusters(paths: &DatasetPaths) -> Result<Vec<CustomerClusterRecord>> {
    load_clusters_from(&paths.resolve_clusters()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = "order_id,order_purchase_timestamp,price,diferencia_estimada_dias,review_score,order_status,customer_state\n\
        o1,2017-10-02 10:56:33,29.99,-8,4,delivered,SP\n\
        o2,not-a-date,10.00,1,5,delivered,RJ\n\
        o3,2018-01-15 09:00:00,118.70,12,1,delivered,MG\n";

    #[test]
    fn test_read_orders_drops_bad_timestamps() {
        let orders = read_orders(ORDERS.as_bytes()).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].order_id, "o3");
        assert_eq!(orders[1].delivery_deviation_days, Some(12.0));
    }

    #[test]
    fn test_non_finite_cells_are_missing() {
        let data = "order_id,order_purchase_timestamp,price,diferencia_estimada_dias,review_score,order_status,customer_state\n\
                    o1,2017-10-02 10:56:33,100.0,-8,4,delivered,SP\n\
                    o2,2017-10-05 11:00:00,NaN,nan,inf,delivered,SP\n";
        let orders = read_orders(data.as_bytes()).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].price, None);
        assert_eq!(orders[1].delivery_deviation_days, None);
        assert_eq!(orders[1].review_score, None);

        let health = crate::insights::business_health(&orders);
        assert_eq!(health.total_revenue, 100.0);
        assert_eq!(health.average_ticket, Some(50.0));
        assert_eq!(health.monthly_revenue[0].revenue, 100.0);

        let clusters = read_clusters(
            "customer_unique_id,recency,frequency,monetary,avg_review_score,cluster\na,NaN,1,-inf,5,0\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(clusters[0].recency, None);
        assert_eq!(clusters[0].monetary, None);
        assert_eq!(clusters[0].frequency, Some(1.0));
    }

    #[test]
    fn test_read_clusters_skips_rows_without_cluster() {
        let data = "customer_unique_id,recency,frequency,monetary,avg_review_score,cluster\n\
                    a,10,1,50,5,0\n\
                    b,20,1,60,4,\n";
        let rows = read_clusters(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_wrong_schema_is_rejected() {
        let data = "foo,bar\n1,2\n";
        match read_clusters(data.as_bytes()) {
            Err(DashboardError::InvalidDataset { dataset, .. }) => assert_eq!(dataset, "clusters"),
            other => panic!("expected InvalidDataset, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_is_an_empty_table() {
        let data = "customer_unique_id,recency,frequency,monetary,avg_review_score,cluster\n";
        assert!(read_clusters(data.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_paths_report_dataset_not_found() {
        let paths = DatasetPaths {
            orders_path: PathBuf::from("/nonexistent/orders.csv.gz"),
            orders_fallback_path: Some(PathBuf::from("/nonexistent/orders.csv")),
            clusters_path: PathBuf::from("/nonexistent/clusters.csv"),
        };
        match load_orders(&paths) {
            Err(DashboardError::DatasetNotFound { dataset, tried }) => {
                assert_eq!(dataset, "orders");
                assert_eq!(tried.len(), 2);
            }
            other => panic!("expected DatasetNotFound, got {:?}", other),
        }
        assert!(matches!(
            load_clusters(&paths),
            Err(DashboardError::DatasetNotFound { dataset: "clusters", .. })
        ));
    }

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip(Path::new("data/olist_processed.csv.gz")));
        assert!(!is_gzip(Path::new("data/olist_processed.csv")));
    }
}
