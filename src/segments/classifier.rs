//! Cluster-to-segment classification
//!
//! Two policies are supported and exactly one is active per deployment:
//!
//! * [`FixedMapping`]: an analyst-supplied table from cluster id to segment,
//!   tuned after inspecting a given clustering run.
//! * [`RuleTable`]: ordered threshold rules over the RFM features, evaluated
//!   top to bottom with the first match winning and a fallback label at the end.
//!
//! The two can disagree on the same dataset, so they are never blended.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{ClassifiedCustomer, SegmentLabel};
use crate::error::{DashboardError, Result};
use crate::models::CustomerClusterRecord;

/// RFM feature a rule condition reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Recency,
    Frequency,
    Monetary,
    AvgReviewScore,
}

impl Feature {
    pub fn value(&self, record: &CustomerClusterRecord) -> Option<f64> {
        match self {
            Feature::Recency => record.recency,
            Feature::Frequency => record.frequency,
            Feature::Monetary => record.monetary,
            Feature::AvgReviewScore => record.avg_review_score,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Recency => "recency",
            Feature::Frequency => "frequency",
            Feature::Monetary => "monetary",
            Feature::AvgReviewScore => "avg_review_score",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Ge,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Le,
}

impl Comparison {
    fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }
}

/// `feature op threshold`; a missing feature value never satisfies it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub feature: Feature,
    pub op: Comparison,
    pub threshold: f64,
}

impl Condition {
    pub fn new(feature: Feature, op: Comparison, threshold: f64) -> Self {
        Self { feature, op, threshold }
    }

    pub fn holds(&self, record: &CustomerClusterRecord) -> bool {
        match self.feature.value(record) {
            Some(v) if !v.is_nan() => self.op.holds(v, self.threshold),
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {} {}", self.feature.name(), self.op.symbol(), self.threshold)
    }
}

/// Named conjunction of conditions assigning one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRule {
    pub name: String,
    pub label: SegmentLabel,
    pub conditions: Vec<Condition>,
}

impl SegmentRule {
    pub fn new(name: &str, label: SegmentLabel, conditions: Vec<Condition>) -> Self {
        Self {
            name: name.to_string(),
            label,
            conditions,
        }
    }

    pub fn matches(&self, record: &CustomerClusterRecord) -> bool {
        self.conditions.iter().all(|c| c.holds(record))
    }

    pub fn describe(&self) -> String {
        let clauses: Vec<String> = self.conditions.iter().map(Condition::describe).collect();
        format!("{}: {} => {}", self.name, clauses.join(" and "), self.label)
    }
}

fn default_rule_fallback() -> SegmentLabel {
    SegmentLabel::AtRisk
}

/// Ordered rule list; total because of `fallback`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<SegmentRule>,
    #[serde(default = "default_rule_fallback")]
    pub fallback: SegmentLabel,
}

impl RuleTable {
    pub fn new(rules: Vec<SegmentRule>, fallback: SegmentLabel) -> Self {
        Self { rules, fallback }
    }

    /// First rule whose conditions all hold, if any
    pub fn matching_rule(&self, record: &CustomerClusterRecord) -> Option<&SegmentRule> {
        self.rules.iter().find(|rule| rule.matches(record))
    }

    pub fn classify(&self, record: &CustomerClusterRecord) -> SegmentLabel {
        self.matching_rule(record)
            .map(|rule| rule.label)
            .unwrap_or(self.fallback)
    }

    /// Name of the rule that fired, or `"fallback"`
    pub fn explain(&self, record: &CustomerClusterRecord) -> &str {
        self.matching_rule(record)
            .map(|rule| rule.name.as_str())
            .unwrap_or("fallback")
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        use Comparison::*;
        use Feature::*;

        Self {
            rules: vec![
                SegmentRule::new(
                    "vip",
                    SegmentLabel::Vip,
                    vec![
                        Condition::new(Frequency, Gt, 1.0),
                        Condition::new(Monetary, Gt, 200.0),
                    ],
                ),
                SegmentRule::new("sleeping", SegmentLabel::Sleeping, vec![Condition::new(Recency, Gt, 300.0)]),
                SegmentRule::new(
                    "recent",
                    SegmentLabel::Recent,
                    vec![
                        Condition::new(Recency, Lt, 150.0),
                        Condition::new(Monetary, Lt, 200.0),
                    ],
                ),
            ],
            fallback: SegmentLabel::AtRisk,
        }
    }
}

/// Static cluster id -> segment table for one clustering run
#[derive(Debug, Clone, PartialEq)]
pub struct FixedMapping {
    assignments: BTreeMap<i64, SegmentLabel>,
    fallback: Option<SegmentLabel>,
}

impl FixedMapping {
    pub fn new(assignments: impl IntoIterator<Item = (i64, SegmentLabel)>) -> Self {
        Self {
            assignments: assignments.into_iter().collect(),
            fallback: None,
        }
    }

    /// Label applied (with a warning) to ids missing from the table
    pub fn with_fallback(mut self, fallback: SegmentLabel) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn label_for(&self, cluster_id: i64) -> Option<SegmentLabel> {
        self.assignments.get(&cluster_id).copied()
    }

    pub fn fallback(&self) -> Option<SegmentLabel> {
        self.fallback
    }

    pub fn assignments(&self) -> &BTreeMap<i64, SegmentLabel> {
        &self.assignments
    }
}

impl Default for FixedMapping {
    /// Assignment of the reference clustering run
    fn default() -> Self {
        Self::new([
            (3, SegmentLabel::Vip),
            (2, SegmentLabel::Sleeping),
            (0, SegmentLabel::Recent),
            (1, SegmentLabel::AtRisk),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationPolicy {
    FixedIndex(FixedMapping),
    RuleBased(RuleTable),
}

impl ClassificationPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ClassificationPolicy::FixedIndex(_) => "fixed_index",
            ClassificationPolicy::RuleBased(_) => "rule_based",
        }
    }
}

pub struct SegmentClassifier {
    policy: ClassificationPolicy,
}

impl SegmentClassifier {
    pub fn new(policy: ClassificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    pub fn classify(&self, record: &CustomerClusterRecord) -> Result<SegmentLabel> {
        match &self.policy {
            ClassificationPolicy::FixedIndex(mapping) => match mapping.label_for(record.cluster_id) {
                Some(label) => Ok(label),
                None => match mapping.fallback {
                    Some(fallback) => {
                        warn!(
                            "Cluster {} is not mapped; labelled '{}' by fallback",
                            record.cluster_id, fallback
                        );
                        Ok(fallback)
                    }
                    None => Err(DashboardError::UnmappedCluster {
                        cluster_ids: vec![record.cluster_id],
                    }),
                },
            },
            ClassificationPolicy::RuleBased(table) => Ok(table.classify(record)),
        }
    }

    /// Label every record.
    ///
    /// Under the fixed policy all unmapped ids are collected into one
    /// `UnmappedCluster` error unless a fallback is configured, in which case
    /// each fallback id is reported with `warn!`.
    pub fn classify_all(&self, records: &[CustomerClusterRecord]) -> Result<Vec<ClassifiedCustomer>> {
        match &self.policy {
            ClassificationPolicy::FixedIndex(mapping) => {
                let mut unmapped: BTreeMap<i64, usize> = BTreeMap::new();
                let mut classified = Vec::with_capacity(records.len());

                for record in records {
                    let label = match mapping.label_for(record.cluster_id) {
                        Some(label) => label,
                        None => {
                            *unmapped.entry(record.cluster_id).or_insert(0) += 1;
                            match mapping.fallback {
                                Some(fallback) => fallback,
                                None => continue,
                            }
                        }
                    };
                    classified.push(ClassifiedCustomer {
                        record: record.clone(),
                        label,
                    });
                }

                if !unmapped.is_empty() {
                    match mapping.fallback {
                        Some(fallback) => {
                            for (cluster_id, count) in &unmapped {
                                warn!(
                                    "Cluster {} is not mapped; {} customers labelled '{}' by fallback",
                                    cluster_id, count, fallback
                                );
                            }
                        }
                        None => {
                            let cluster_ids: Vec<i64> = unmapped.keys().copied().collect();
                            warn!("Unmapped cluster ids in data: {:?}", cluster_ids);
                            return Err(DashboardError::UnmappedCluster { cluster_ids });
                        }
                    }
                }

                Ok(classified)
            }
            ClassificationPolicy::RuleBased(table) => {
                let classified: Vec<ClassifiedCustomer> = records
                    .iter()
                    .map(|record| ClassifiedCustomer {
                        record: record.clone(),
                        label: table.classify(record),
                    })
                    .collect();
                debug!("Rule table labelled {} customers", classified.len());
                Ok(classified)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn rfm(cluster: i64, recency: f64, frequency: f64, monetary: f64) -> CustomerClusterRecord {
        CustomerClusterRecord::new(cluster)
            .with_recency(recency)
            .with_frequency(frequency)
            .with_monetary(monetary)
    }

    #[test]
    fn test_fixed_mapping_returns_mapped_label() {
        let classifier = SegmentClassifier::new(ClassificationPolicy::FixedIndex(FixedMapping::default()));
        let record = rfm(3, 10.0, 4.0, 900.0);

        assert_eq!(classifier.classify(&record).unwrap(), SegmentLabel::Vip);
        // idempotent
        assert_eq!(classifier.classify(&record).unwrap(), SegmentLabel::Vip);
        assert_eq!(classifier.classify(&rfm(0, 1.0, 1.0, 1.0)).unwrap(), SegmentLabel::Recent);
        assert_eq!(classifier.classify(&rfm(1, 1.0, 1.0, 1.0)).unwrap(), SegmentLabel::AtRisk);
        assert_eq!(classifier.classify(&rfm(2, 1.0, 1.0, 1.0)).unwrap(), SegmentLabel::Sleeping);
    }

    #[test]
    fn test_unmapped_cluster_is_an_error() {
        let mapping = FixedMapping::new([(3, SegmentLabel::Vip), (2, SegmentLabel::Sleeping)]);
        let classifier = SegmentClassifier::new(ClassificationPolicy::FixedIndex(mapping));

        match classifier.classify(&CustomerClusterRecord::new(7)) {
            Err(DashboardError::UnmappedCluster { cluster_ids }) => assert_eq!(cluster_ids, vec![7]),
            other => panic!("expected UnmappedCluster, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_all_reports_every_unmapped_id() {
        let mapping = FixedMapping::new([(0, SegmentLabel::Recent)]);
        let classifier = SegmentClassifier::new(ClassificationPolicy::FixedIndex(mapping));
        let records = vec![
            CustomerClusterRecord::new(9),
            CustomerClusterRecord::new(0),
            CustomerClusterRecord::new(7),
            CustomerClusterRecord::new(9),
        ];

        match classifier.classify_all(&records) {
            Err(DashboardError::UnmappedCluster { cluster_ids }) => assert_eq!(cluster_ids, vec![7, 9]),
            other => panic!("expected UnmappedCluster, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_fallback_labels_unmapped() {
        let mapping = FixedMapping::new([(0, SegmentLabel::Recent)]).with_fallback(SegmentLabel::Sleeping);
        let classifier = SegmentClassifier::new(ClassificationPolicy::FixedIndex(mapping));
        let records = vec![CustomerClusterRecord::new(0), CustomerClusterRecord::new(7)];

        let classified = classifier.classify_all(&records).unwrap();
        assert_eq!(classified.len(), 2);
        assert_eq!(classified[1].label, SegmentLabel::Sleeping);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_single_fallback_classification_warns() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mapping = FixedMapping::new([(0, SegmentLabel::Recent)]).with_fallback(SegmentLabel::AtRisk);
        let classifier = SegmentClassifier::new(ClassificationPolicy::FixedIndex(mapping));

        let label = tracing::subscriber::with_default(subscriber, || {
            classifier.classify(&CustomerClusterRecord::new(7)).unwrap()
        });

        assert_eq!(label, SegmentLabel::AtRisk);
        let output = logs.contents();
        assert!(output.contains("WARN"), "{}", output);
        assert!(output.contains("Cluster 7 is not mapped"), "{}", output);
    }

    #[test]
    fn test_default_rules_in_priority_order() {
        let table = RuleTable::default();

        // frequent big spender who has also been away a long time: VIP wins
        assert_eq!(table.classify(&rfm(0, 400.0, 3.0, 500.0)), SegmentLabel::Vip);
        assert_eq!(table.classify(&rfm(0, 400.0, 1.0, 500.0)), SegmentLabel::Sleeping);
        assert_eq!(table.classify(&rfm(0, 30.0, 1.0, 80.0)), SegmentLabel::Recent);
        assert_eq!(table.explain(&rfm(0, 30.0, 1.0, 80.0)), "recent");
    }

    #[test]
    fn test_fallback_only_when_no_rule_matches() {
        let table = RuleTable::default();
        let grid = [0.0, 100.0, 149.0, 150.0, 200.0, 250.0, 300.0, 301.0, 1000.0];

        for &recency in &grid {
            for &frequency in &[1.0, 2.0, 5.0] {
                for &monetary in &grid {
                    let record = rfm(0, recency, frequency, monetary);
                    let label = table.classify(&record);
                    let any_rule = table.rules.iter().any(|r| r.matches(&record));
                    assert_eq!(label == SegmentLabel::AtRisk, !any_rule, "{:?}", record);
                }
            }
        }
    }

    #[test]
    fn test_missing_feature_never_matches() {
        let table = RuleTable::default();
        let record = CustomerClusterRecord::new(0).with_frequency(3.0);

        assert_eq!(table.classify(&record), SegmentLabel::AtRisk);
        assert_eq!(table.explain(&record), "fallback");
    }

    #[test]
    fn test_rule_description() {
        let table = RuleTable::default();
        assert_eq!(table.rules[0].describe(), "vip: frequency > 1 and monetary > 200 => VIP");
    }
}
