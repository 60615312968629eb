#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use olist_growth::config::AppConfig;
use olist_growth::loader::DatasetPaths;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const ORDERS_CSV: &str = "\
order_id,order_purchase_timestamp,price,diferencia_estimada_dias,review_score,order_status,customer_state
a1,2017-11-24 10:00:00,120.5,-10,5,delivered,SP
a1,2017-11-24 10:00:00,30.0,-10,5,delivered,SP
b2,2018-01-05 09:12:00,89.9,7,1,delivered,RJ
c3,2018-01-20 14:00:00,45.0,,,canceled,mg
d4,2018-02-02 08:00:00,250.0,-3,4,delivered,SP
";

pub const CLUSTERS_CSV: &str = "\
customer_unique_id,recency,frequency,monetary,avg_review_score,cluster
c1,120,3,500,4.7,3
c2,80,2,300,4.5,3
c3,400,1,100,4.0,2
c4,30,1,90,5.0,0
c5,200,1,150,1.5,1
";

pub fn write_gzip(path: &Path, contents: &str) {
    let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

/// Gzipped orders plus plain clusters under `dir`
pub fn write_fixture(dir: &Path) -> DatasetPaths {
    write_gzip(&dir.join("olist_processed.csv.gz"), ORDERS_CSV);
    std::fs::write(dir.join("olist_clusters.csv"), CLUSTERS_CSV).unwrap();
    paths_in(dir)
}

pub fn paths_in(dir: &Path) -> DatasetPaths {
    DatasetPaths {
        orders_path: dir.join("olist_processed.csv.gz"),
        orders_fallback_path: Some(dir.join("olist_processed.csv")),
        clusters_path: dir.join("olist_clusters.csv"),
    }
}

pub fn config_for(paths: DatasetPaths) -> AppConfig {
    AppConfig {
        data: paths,
        ..AppConfig::default()
    }
}
