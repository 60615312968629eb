//! Customer segmentation: naming opaque cluster ids as business segments
//!
//! The offline clustering job only hands out integers. This module turns them
//! into the four segments the growth team works with, summarises each segment
//! and derives the strategy copy shown next to the audience map.

pub mod aggregator;
pub mod classifier;
pub mod strategy;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::CustomerClusterRecord;

pub use aggregator::{aggregate, profile_clusters, ClusterProfile, SegmentSummary};
pub use classifier::{
    ClassificationPolicy, Comparison, Condition, Feature, FixedMapping, RuleTable, SegmentClassifier,
    SegmentRule,
};
pub use strategy::{overall_mean_monetary, strategy_cards, CardTone, StrategyCard};

/// Closed set of business segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentLabel {
    #[serde(alias = "VIP", alias = "Vip")]
    Vip,
    #[serde(alias = "Recent")]
    Recent,
    #[serde(alias = "Sleeping")]
    Sleeping,
    #[serde(alias = "AtRisk", alias = "at-risk")]
    AtRisk,
}

impl SegmentLabel {
    pub const ALL: [SegmentLabel; 4] = [
        SegmentLabel::Vip,
        SegmentLabel::Recent,
        SegmentLabel::Sleeping,
        SegmentLabel::AtRisk,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SegmentLabel::Vip => "vip",
            SegmentLabel::Recent => "recent",
            SegmentLabel::Sleeping => "sleeping",
            SegmentLabel::AtRisk => "at_risk",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SegmentLabel::Vip => "VIP",
            SegmentLabel::Recent => "Recent",
            SegmentLabel::Sleeping => "Sleeping",
            SegmentLabel::AtRisk => "At Risk",
        }
    }

    /// Marketing alias used on the strategy cards
    pub fn alias(&self) -> &'static str {
        match self {
            SegmentLabel::Vip => "Champions",
            SegmentLabel::Recent => "Promising",
            SegmentLabel::Sleeping => "Sleeping",
            SegmentLabel::AtRisk => "Detractors",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SegmentLabel::Vip => "💎",
            SegmentLabel::Recent => "🌱",
            SegmentLabel::Sleeping => "💤",
            SegmentLabel::AtRisk => "⚠️",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SegmentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "vip" | "champions" => Ok(SegmentLabel::Vip),
            "recent" | "promising" => Ok(SegmentLabel::Recent),
            "sleeping" => Ok(SegmentLabel::Sleeping),
            "at_risk" | "atrisk" | "detractors" => Ok(SegmentLabel::AtRisk),
            _ => Err(format!("unknown segment '{}'", s)),
        }
    }
}

/// A customer row together with the segment it was assigned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedCustomer {
    pub record: CustomerClusterRecord,
    pub label: SegmentLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing() {
        assert_eq!("VIP".parse::<SegmentLabel>().unwrap(), SegmentLabel::Vip);
        assert_eq!("at-risk".parse::<SegmentLabel>().unwrap(), SegmentLabel::AtRisk);
        assert_eq!("Detractors".parse::<SegmentLabel>().unwrap(), SegmentLabel::AtRisk);
        assert!("gold".parse::<SegmentLabel>().is_err());
    }

    #[test]
    fn test_key_round_trips_through_from_str() {
        for label in SegmentLabel::ALL {
            assert_eq!(label.key().parse::<SegmentLabel>().unwrap(), label);
        }
    }
}
