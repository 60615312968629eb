//! Per-segment and per-cluster summary statistics

use serde::Serialize;
use std::collections::BTreeMap;

use super::{ClassifiedCustomer, SegmentLabel};
use crate::models::CustomerClusterRecord;

/// Mean RFM statistics for one segment.
///
/// A mean is `None` when the segment has no member with a value for that
/// column (including an empty segment); it is never reported as NaN or 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub label: SegmentLabel,
    pub count: usize,
    pub mean_recency: Option<f64>,
    pub mean_frequency: Option<f64>,
    pub mean_monetary: Option<f64>,
    pub mean_avg_review_score: Option<f64>,
}

impl SegmentSummary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Mean RFM statistics for one raw cluster id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub cluster_id: i64,
    pub count: usize,
    pub mean_recency: Option<f64>,
    pub mean_frequency: Option<f64>,
    pub mean_monetary: Option<f64>,
    pub mean_avg_review_score: Option<f64>,
}

#[derive(Debug, Default)]
struct ColumnValues(Vec<f64>);

impl ColumnValues {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.0.push(v);
        }
    }

    /// Summed in sorted order so the result does not depend on row order
    fn mean(&mut self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        self.0.sort_by(f64::total_cmp);
        Some(self.0.iter().sum::<f64>() / self.0.len() as f64)
    }
}

#[derive(Debug, Default)]
struct FeatureAccumulator {
    count: usize,
    recency: ColumnValues,
    frequency: ColumnValues,
    monetary: ColumnValues,
    review: ColumnValues,
}

impl FeatureAccumulator {
    fn push(&mut self, record: &CustomerClusterRecord) {
        self.count += 1;
        self.recency.push(record.recency);
        self.frequency.push(record.frequency);
        self.monetary.push(record.monetary);
        self.review.push(record.avg_review_score);
    }

    fn into_summary(mut self, label: SegmentLabel) -> SegmentSummary {
        SegmentSummary {
            label,
            count: self.count,
            mean_recency: self.recency.mean(),
            mean_frequency: self.frequency.mean(),
            mean_monetary: self.monetary.mean(),
            mean_avg_review_score: self.review.mean(),
        }
    }

    fn into_profile(mut self, cluster_id: i64) -> ClusterProfile {
        ClusterProfile {
            cluster_id,
            count: self.count,
            mean_recency: self.recency.mean(),
            mean_frequency: self.frequency.mean(),
            mean_monetary: self.monetary.mean(),
            mean_avg_review_score: self.review.mean(),
        }
    }
}

/// Summarise classified customers in `display_order`.
///
/// Every label of `display_order` gets a summary, with `count = 0` when no
/// customer carries it. Labels present in the data but absent from the order
/// follow at the end in canonical order. Repeated labels in the order are
/// reported once.
pub fn aggregate(classified: &[ClassifiedCustomer], display_order: &[SegmentLabel]) -> Vec<SegmentSummary> {
    let mut groups: BTreeMap<SegmentLabel, FeatureAccumulator> = BTreeMap::new();
    for customer in classified {
        groups.entry(customer.label).or_default().push(&customer.record);
    }

    let mut summaries = Vec::with_capacity(display_order.len().max(groups.len()));
    for &label in display_order {
        if summaries.iter().any(|s: &SegmentSummary| s.label == label) {
            continue;
        }
        let acc = groups.remove(&label).unwrap_or_default();
        summaries.push(acc.into_summary(label));
    }

    for (label, acc) in groups {
        summaries.push(acc.into_summary(label));
    }

    summaries
}

/// Per-cluster means of the raw clustering output, ordered by cluster id
pub fn profile_clusters(records: &[CustomerClusterRecord]) -> Vec<ClusterProfile> {
    let mut groups: BTreeMap<i64, FeatureAccumulator> = BTreeMap::new();
    for record in records {
        groups.entry(record.cluster_id).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(cluster_id, acc)| acc.into_profile(cluster_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(label: SegmentLabel, record: CustomerClusterRecord) -> ClassifiedCustomer {
        ClassifiedCustomer { record, label }
    }

    #[test]
    fn test_empty_input_yields_zero_counts() {
        let summaries = aggregate(&[], &SegmentLabel::ALL);

        assert_eq!(summaries.len(), 4);
        for (summary, label) in summaries.iter().zip(SegmentLabel::ALL) {
            assert_eq!(summary.label, label);
            assert_eq!(summary.count, 0);
            assert!(summary.is_empty());
            assert_eq!(summary.mean_monetary, None);
            assert_eq!(summary.mean_recency, None);
        }
    }

    #[test]
    fn test_missing_values_excluded_from_means() {
        let rows = vec![
            customer(SegmentLabel::Vip, CustomerClusterRecord::new(3).with_monetary(300.0)),
            customer(SegmentLabel::Vip, CustomerClusterRecord::new(3)),
            customer(SegmentLabel::Vip, CustomerClusterRecord::new(3).with_monetary(f64::NAN)),
        ];
        let summaries = aggregate(&rows, &[SegmentLabel::Vip]);

        assert_eq!(summaries[0].count, 3);
        assert_eq!(summaries[0].mean_monetary, Some(300.0));
        assert_eq!(summaries[0].mean_frequency, None);
    }

    #[test]
    fn test_labels_outside_display_order_are_appended() {
        let rows = vec![
            customer(SegmentLabel::AtRisk, CustomerClusterRecord::new(1).with_recency(10.0)),
            customer(SegmentLabel::Recent, CustomerClusterRecord::new(0).with_recency(20.0)),
        ];
        let summaries = aggregate(&rows, &[SegmentLabel::Sleeping, SegmentLabel::Sleeping]);
        let labels: Vec<SegmentLabel> = summaries.iter().map(|s| s.label).collect();

        assert_eq!(labels, vec![SegmentLabel::Sleeping, SegmentLabel::Recent, SegmentLabel::AtRisk]);
        assert_eq!(summaries[1].mean_recency, Some(20.0));
    }

    #[test]
    fn test_profile_clusters_sorted_by_id() {
        let records = vec![
            CustomerClusterRecord::new(2).with_recency(400.0),
            CustomerClusterRecord::new(0).with_recency(30.0),
            CustomerClusterRecord::new(2).with_recency(200.0),
        ];
        let profiles = profile_clusters(&records);

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].cluster_id, 0);
        assert_eq!(profiles[1].count, 2);
        assert_eq!(profiles[1].mean_recency, Some(300.0));
    }
}
