//! Error types shared by the loader, classifier and API layers

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// Neither the primary nor the fallback path of a dataset exists.
    #[error("dataset '{dataset}' not found (tried: {})", display_paths(.tried))]
    DatasetNotFound {
        dataset: &'static str,
        tried: Vec<PathBuf>,
    },

    /// The file exists but no row matches the expected columns.
    #[error("dataset '{dataset}' has no readable rows: {reason}")]
    InvalidDataset { dataset: &'static str, reason: String },

    /// Cluster ids present in the data but absent from the fixed mapping.
    #[error("cluster ids {cluster_ids:?} are not mapped to any segment")]
    UnmappedCluster { cluster_ids: Vec<i64> },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_every_path() {
        let err = DashboardError::DatasetNotFound {
            dataset: "orders",
            tried: vec![PathBuf::from("a.csv.gz"), PathBuf::from("a.csv")],
        };
        assert_eq!(
            err.to_string(),
            "dataset 'orders' not found (tried: a.csv.gz, a.csv)"
        );
    }

    #[test]
    fn test_unmapped_lists_ids() {
        let err = DashboardError::UnmappedCluster { cluster_ids: vec![4, 7] };
        assert!(err.to_string().contains("[4, 7]"));
    }
}
