//! Application configuration loaded from TOML
//!
//! ```toml
//! [data]
//! orders_path = "data/olist_processed.csv.gz"
//! orders_fallback_path = "data/olist_processed.csv"
//! clusters_path = "data/olist_clusters.csv"
//!
//! [segmentation]
//! display_order = ["vip", "recent", "sleeping", "at_risk"]
//!
//! [segmentation.policy]
//! kind = "fixed_index"
//! mapping = [
//!     { cluster = 3, label = "vip" },
//!     { cluster = 2, label = "sleeping" },
//!     { cluster = 0, label = "recent" },
//!     { cluster = 1, label = "at_risk" },
//! ]
//! ```
//!
//! A rule-based deployment replaces the policy table instead:
//!
//! ```toml
//! [segmentation.policy]
//! kind = "rule_based"
//! fallback = "at_risk"
//!
//! [[segmentation.policy.rules]]
//! name = "vip"
//! label = "vip"
//! conditions = [
//!     { feature = "frequency", op = "gt", threshold = 1.0 },
//!     { feature = "monetary", op = "gt", threshold = 200.0 },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

use crate::error::{DashboardError, Result};
use crate::loader::DatasetPaths;
use crate::segments::{ClassificationPolicy, FixedMapping, RuleTable, SegmentClassifier, SegmentLabel};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DatasetPaths,
    pub segmentation: SegmentationConfig,
    pub friction: FrictionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster: i64,
    pub label: SegmentLabel,
}

/// Which classification policy this deployment uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    FixedIndex {
        mapping: Vec<ClusterAssignment>,
        #[serde(default)]
        fallback: Option<SegmentLabel>,
    },
    RuleBased(RuleTable),
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let mapping = FixedMapping::default()
            .assignments()
            .iter()
            .map(|(&cluster, &label)| ClusterAssignment { cluster, label })
            .collect();
        PolicyConfig::FixedIndex {
            mapping,
            fallback: None,
        }
    }
}

impl PolicyConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyConfig::FixedIndex { .. } => "fixed_index",
            PolicyConfig::RuleBased(_) => "rule_based",
        }
    }
}

/// Hex colours per segment, consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub vip: String,
    pub recent: String,
    pub sleeping: String,
    pub at_risk: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            vip: "#00CC96".to_string(),
            recent: "#636EFA".to_string(),
            sleeping: "#EF553B".to_string(),
            at_risk: "#AB63FA".to_string(),
        }
    }
}

impl Palette {
    pub fn color(&self, label: SegmentLabel) -> &str {
        match label {
            SegmentLabel::Vip => &self.vip,
            SegmentLabel::Recent => &self.recent,
            SegmentLabel::Sleeping => &self.sleeping,
            SegmentLabel::AtRisk => &self.at_risk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub policy: PolicyConfig,
    pub display_order: Vec<SegmentLabel>,
    pub palette: Palette,
    /// Customers above this spend are left out of the audience map
    pub scatter_monetary_cap: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            display_order: SegmentLabel::ALL.to_vec(),
            palette: Palette::default(),
            scatter_monetary_cap: 3000.0,
        }
    }
}

impl SegmentationConfig {
    pub fn build_policy(&self) -> Result<ClassificationPolicy> {
        match &self.policy {
            PolicyConfig::FixedIndex { mapping, fallback } => {
                if mapping.is_empty() {
                    return Err(DashboardError::Config(
                        "fixed_index policy needs at least one cluster mapping".to_string(),
                    ));
                }
                let mut seen = BTreeSet::new();
                for assignment in mapping {
                    if !seen.insert(assignment.cluster) {
                        return Err(DashboardError::Config(format!(
                            "cluster {} is mapped more than once",
                            assignment.cluster
                        )));
                    }
                }
                let mut fixed = FixedMapping::new(mapping.iter().map(|a| (a.cluster, a.label)));
                if let Some(fallback) = fallback {
                    fixed = fixed.with_fallback(*fallback);
                }
                Ok(ClassificationPolicy::FixedIndex(fixed))
            }
            PolicyConfig::RuleBased(table) => {
                if table.rules.is_empty() {
                    return Err(DashboardError::Config(
                        "rule_based policy needs at least one rule".to_string(),
                    ));
                }
                if let Some(rule) = table.rules.iter().find(|r| r.conditions.is_empty()) {
                    return Err(DashboardError::Config(format!(
                        "rule '{}' has no conditions",
                        rule.name
                    )));
                }
                Ok(ClassificationPolicy::RuleBased(table.clone()))
            }
        }
    }

    pub fn classifier(&self) -> Result<SegmentClassifier> {
        Ok(SegmentClassifier::new(self.build_policy()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrictionConfig {
    /// Deviation above which an order counts as late
    pub late_threshold_days: f64,
    /// Box plots only include deviations strictly inside +/- this window
    pub plot_window_days: f64,
    pub target_late_rate_pct: f64,
}

impl Default for FrictionConfig {
    fn default() -> Self {
        Self {
            late_threshold_days: 0.0,
            plot_window_days: 60.0,
            target_late_rate_pct: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw).map_err(|e| DashboardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or the built-in defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                let config = Self::from_toml(&raw)?;
                info!("Loaded configuration from {:?}", path);
                Ok(config)
            }
            None => {
                info!("No configuration file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for label in &self.segmentation.display_order {
            if !seen.insert(*label) {
                return Err(DashboardError::Config(format!(
                    "segment '{}' appears twice in display_order",
                    label.key()
                )));
            }
        }
        if self.friction.plot_window_days <= 0.0 {
            return Err(DashboardError::Config(
                "friction.plot_window_days must be positive".to_string(),
            ));
        }
        self.segmentation.build_policy().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::{Comparison, Feature};

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.segmentation.display_order, SegmentLabel::ALL.to_vec());
        assert_eq!(config.segmentation.palette.color(SegmentLabel::Vip), "#00CC96");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_fixed_index_policy() {
        let raw = r#"
            [data]
            clusters_path = "run-42/clusters.csv"

            [segmentation.policy]
            kind = "fixed_index"
            fallback = "at_risk"
            mapping = [
                { cluster = 0, label = "vip" },
                { cluster = 1, label = "sleeping" },
            ]
        "#;
        let config = AppConfig::from_toml(raw).unwrap();
        assert_eq!(config.data.clusters_path.to_str(), Some("run-42/clusters.csv"));

        match config.segmentation.build_policy().unwrap() {
            ClassificationPolicy::FixedIndex(mapping) => {
                assert_eq!(mapping.label_for(0), Some(SegmentLabel::Vip));
                assert_eq!(mapping.label_for(5), None);
                assert_eq!(mapping.fallback(), Some(SegmentLabel::AtRisk));
            }
            other => panic!("unexpected policy {:?}", other),
        }
    }

    #[test]
    fn test_rule_based_policy() {
        let raw = r#"
            [segmentation.policy]
            kind = "rule_based"

            [[segmentation.policy.rules]]
            name = "big_spenders"
            label = "vip"
            conditions = [{ feature = "monetary", op = ">=", threshold = 1000.0 }]
        "#;
        let config = AppConfig::from_toml(raw).unwrap();

        match config.segmentation.build_policy().unwrap() {
            ClassificationPolicy::RuleBased(table) => {
                assert_eq!(table.fallback, SegmentLabel::AtRisk);
                assert_eq!(table.rules[0].conditions[0].feature, Feature::Monetary);
                assert_eq!(table.rules[0].conditions[0].op, Comparison::Ge);
            }
            other => panic!("unexpected policy {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_cluster_rejected() {
        let raw = r#"
            [segmentation.policy]
            kind = "fixed_index"
            mapping = [
                { cluster = 0, label = "vip" },
                { cluster = 0, label = "recent" },
            ]
        "#;
        assert!(matches!(AppConfig::from_toml(raw), Err(DashboardError::Config(_))));
    }

    #[test]
    fn test_duplicate_display_label_rejected() {
        let raw = r#"
            [segmentation]
            display_order = ["vip", "vip"]
        "#;
        assert!(matches!(AppConfig::from_toml(raw), Err(DashboardError::Config(_))));
    }

    #[test]
    fn test_rule_without_conditions_rejected() {
        let raw = r#"
            [segmentation.policy]
            kind = "rule_based"

            [[segmentation.policy.rules]]
            name = "everyone"
            label = "vip"
            conditions = []
        "#;
        assert!(matches!(AppConfig::from_toml(raw), Err(DashboardError::Config(_))));
    }
}
