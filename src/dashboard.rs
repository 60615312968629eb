//! One render pass: classify, aggregate and summarise a loaded snapshot

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::cache::DashboardData;
use crate::config::AppConfig;
use crate::error::Result;
use crate::insights::{business_health, friction_diagnosis, BusinessHealth, FrictionDiagnosis};
use crate::segments::{
    aggregate, overall_mean_monetary, profile_clusters, strategy_cards, ClassificationPolicy, ClassifiedCustomer,
    ClusterProfile, RuleTable, SegmentLabel, SegmentSummary, StrategyCard,
};

/// Point of the recency/monetary audience map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudiencePoint {
    pub recency: f64,
    pub monetary: f64,
    pub label: SegmentLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStyle {
    pub label: SegmentLabel,
    pub name: String,
    pub color: String,
}

/// Most common segment among the customers of one raw cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterLabel {
    pub cluster_id: i64,
    pub label: SegmentLabel,
    pub share_pct: f64,
}

/// How many customers one rule of a rule-based policy labelled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleHit {
    pub rule: String,
    pub description: String,
    pub customers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationView {
    pub policy: &'static str,
    pub total_customers: usize,
    pub baseline_monetary: Option<f64>,
    pub summaries: Vec<SegmentSummary>,
    pub cards: Vec<StrategyCard>,
    pub styles: Vec<SegmentStyle>,
    pub cluster_profiles: Vec<ClusterProfile>,
    pub cluster_labels: Vec<ClusterLabel>,
    /// Empty under the fixed-index policy
    pub rule_hits: Vec<RuleHit>,
    pub monetary_cap: f64,
}

impl SegmentationView {
    pub fn summary(&self, label: SegmentLabel) -> Option<&SegmentSummary> {
        self.summaries.iter().find(|s| s.label == label)
    }

    pub fn card(&self, label: SegmentLabel) -> Option<&StrategyCard> {
        self.cards.iter().find(|c| c.label == label)
    }

    pub fn cluster_label(&self, cluster_id: i64) -> Option<&ClusterLabel> {
        self.cluster_labels.iter().find(|c| c.cluster_id == cluster_id)
    }
}

/// Dominant segment per cluster id; ties go to the label first in canonical order
pub fn dominant_labels(classified: &[ClassifiedCustomer]) -> Vec<ClusterLabel> {
    let mut counts: BTreeMap<i64, BTreeMap<SegmentLabel, usize>> = BTreeMap::new();
    for c in classified {
        *counts
            .entry(c.record.cluster_id)
            .or_default()
            .entry(c.label)
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(cluster_id, by_label)| {
            let total: usize = by_label.values().sum();
            let (label, count) = by_label
                .into_iter()
                .fold(None, |best: Option<(SegmentLabel, usize)>, (label, count)| match best {
                    Some((_, best_count)) if best_count >= count => best,
                    _ => Some((label, count)),
                })?;
            Some(ClusterLabel {
                cluster_id,
                label,
                share_pct: count as f64 / total as f64 * 100.0,
            })
        })
        .collect()
}

/// Customers per rule in table order, then the fallback
pub fn rule_hits(table: &RuleTable, classified: &[ClassifiedCustomer]) -> Vec<RuleHit> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in classified {
        *counts.entry(table.explain(&c.record)).or_insert(0) += 1;
    }

    let mut hits: Vec<RuleHit> = table
        .rules
        .iter()
        .map(|rule| RuleHit {
            rule: rule.name.clone(),
            description: rule.describe(),
            customers: counts.get(rule.name.as_str()).copied().unwrap_or(0),
        })
        .collect();
    hits.push(RuleHit {
        rule: "fallback".to_string(),
        description: format!("no rule matched => {}", table.fallback),
        customers: counts.get("fallback").copied().unwrap_or(0),
    });
    hits
}

/// Customers inside the map's spend cap, each with finite recency and spend
pub fn audience_map(classified: &[ClassifiedCustomer], monetary_cap: f64) -> Vec<AudiencePoint> {
    classified
        .iter()
        .filter_map(|c| {
            let recency = c.record.recency.filter(|v| v.is_finite())?;
            let monetary = c.record.monetary.filter(|v| v.is_finite() && *v < monetary_cap)?;
            Some(AudiencePoint {
                recency,
                monetary,
                label: c.label,
            })
        })
        .collect()
}

pub fn build_segmentation(
    data: &DashboardData,
    config: &AppConfig,
) -> Result<(SegmentationView, Vec<ClassifiedCustomer>)> {
    let seg = &config.segmentation;
    let classifier = seg.classifier()?;
    let classified = classifier.classify_all(&data.clusters)?;

    let summaries = aggregate(&classified, &seg.display_order);
    let baseline_monetary = overall_mean_monetary(&data.clusters);
    let cards = strategy_cards(&summaries, baseline_monetary);
    let styles = summaries
        .iter()
        .map(|s| SegmentStyle {
            label: s.label,
            name: format!("{} {}", s.label.icon(), s.label.display_name()),
            color: seg.palette.color(s.label).to_string(),
        })
        .collect();

    info!(
        "Segmented {} customers with the {} policy",
        classified.len(),
        classifier.policy().name()
    );

    let rule_hits = match classifier.policy() {
        ClassificationPolicy::RuleBased(table) => rule_hits(table, &classified),
        ClassificationPolicy::FixedIndex(_) => Vec::new(),
    };

    let view = SegmentationView {
        policy: classifier.policy().name(),
        total_customers: classified.len(),
        baseline_monetary,
        summaries,
        cards,
        styles,
        cluster_profiles: profile_clusters(&data.clusters),
        cluster_labels: dominant_labels(&classified),
        rule_hits,
        monetary_cap: seg.scatter_monetary_cap,
    };
    Ok((view, classified))
}

/// Everything the three dashboard views display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub health: BusinessHealth,
    pub friction: FrictionDiagnosis,
    pub segmentation: SegmentationView,
}

pub fn build_dashboard(data: &DashboardData, config: &AppConfig) -> Result<DashboardView> {
    let (segmentation, _) = build_segmentation(data, config)?;
    Ok(DashboardView {
        health: business_health(&data.orders),
        friction: friction_diagnosis(&data.orders, &config.friction),
        segmentation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CustomerClusterRecord;

    #[test]
    fn test_audience_map_applies_cap() {
        let classified = vec![
            ClassifiedCustomer {
                record: CustomerClusterRecord::new(3).with_recency(10.0).with_monetary(5000.0),
                label: SegmentLabel::Vip,
            },
            ClassifiedCustomer {
                record: CustomerClusterRecord::new(0).with_recency(20.0).with_monetary(80.0),
                label: SegmentLabel::Recent,
            },
            ClassifiedCustomer {
                record: CustomerClusterRecord::new(0).with_monetary(80.0),
                label: SegmentLabel::Recent,
            },
        ];
        let points = audience_map(&classified, 3000.0);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].label, SegmentLabel::Recent);
    }

    #[test]
    fn test_dominant_labels() {
        let classified = vec![
            ClassifiedCustomer { record: CustomerClusterRecord::new(1), label: SegmentLabel::AtRisk },
            ClassifiedCustomer { record: CustomerClusterRecord::new(1), label: SegmentLabel::Recent },
            ClassifiedCustomer { record: CustomerClusterRecord::new(1), label: SegmentLabel::AtRisk },
            ClassifiedCustomer { record: CustomerClusterRecord::new(3), label: SegmentLabel::Vip },
        ];
        let labels = dominant_labels(&classified);

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label, SegmentLabel::AtRisk);
        assert!((labels[0].share_pct - 66.666).abs() < 0.01);
        assert_eq!(labels[1].share_pct, 100.0);
    }

    #[test]
    fn test_rule_hits_follow_table_order() {
        let classified: Vec<ClassifiedCustomer> = [
            CustomerClusterRecord::new(0).with_recency(400.0),
            CustomerClusterRecord::new(0).with_recency(500.0),
            CustomerClusterRecord::new(0).with_frequency(3.0).with_monetary(900.0),
            CustomerClusterRecord::new(0),
        ]
        .into_iter()
        .map(|record| ClassifiedCustomer { record, label: SegmentLabel::AtRisk })
        .collect();
        let hits = rule_hits(&RuleTable::default(), &classified);

        let names: Vec<&str> = hits.iter().map(|h| h.rule.as_str()).collect();
        assert_eq!(names, vec!["vip", "sleeping", "recent", "fallback"]);
        let counts: Vec<usize> = hits.iter().map(|h| h.customers).collect();
        assert_eq!(counts, vec![1, 2, 0, 1]);
        assert_eq!(hits[1].description, "sleeping: recency > 300 => Sleeping");
        assert_eq!(hits[3].description, "no rule matched => At Risk");
    }
}
