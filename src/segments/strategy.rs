//! Strategy cards: narrative copy derived from segment summaries

use serde::Serialize;

use super::{SegmentLabel, SegmentSummary};
use crate::models::CustomerClusterRecord;

/// Visual severity of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardTone {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyCard {
    pub label: SegmentLabel,
    pub title: String,
    pub tagline: String,
    pub highlights: Vec<String>,
    pub action: String,
    pub tone: CardTone,
}

struct SegmentPlaybook {
    tagline: &'static str,
    action: &'static str,
    tone: CardTone,
}

fn playbook(label: SegmentLabel) -> SegmentPlaybook {
    match label {
        SegmentLabel::Vip => SegmentPlaybook {
            tagline: "The profitability engine.",
            action: "\"Gold\" loyalty tier plus free shipping.",
            tone: CardTone::Success,
        },
        SegmentLabel::Recent => SegmentPlaybook {
            tagline: "High development potential.",
            action: "Second-purchase coupon (urgent, within 30 days).",
            tone: CardTone::Info,
        },
        SegmentLabel::Sleeping => SegmentPlaybook {
            tagline: "Money left on the table.",
            action: "Aggressive reactivation campaign (\"We miss you\").",
            tone: CardTone::Warning,
        },
        SegmentLabel::AtRisk => SegmentPlaybook {
            tagline: "Operational problem detected.",
            action: "Logistics audit. Do not retarget.",
            tone: CardTone::Error,
        },
    }
}

fn fmt_mean(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

/// Thousands separator for customer counts, e.g. `12,345`
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Mean spend over every customer with a monetary value
pub fn overall_mean_monetary(records: &[CustomerClusterRecord]) -> Option<f64> {
    let mut values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.monetary)
        .filter(|v| v.is_finite())
        .collect();
    values.sort_by(f64::total_cmp);
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn highlights(summary: &SegmentSummary, baseline_monetary: Option<f64>) -> Vec<String> {
    match summary.label {
        SegmentLabel::Vip => vec![
            format!(
                "Avg spend: R$ {} (vs R$ {} avg)",
                fmt_mean(summary.mean_monetary, 0),
                fmt_mean(baseline_monetary, 0)
            ),
            format!("Frequency: {} purchases", fmt_mean(summary.mean_frequency, 1)),
        ],
        SegmentLabel::Recent => vec![
            format!("Last purchase: {} days ago", fmt_mean(summary.mean_recency, 0)),
            format!("Satisfaction: {} / 5.0", fmt_mean(summary.mean_avg_review_score, 1)),
        ],
        SegmentLabel::Sleeping => {
            let mut lines = vec![format!("Inactivity: {} days", fmt_mean(summary.mean_recency, 0))];
            if summary.mean_recency.is_some_and(|r| r > 365.0) {
                lines[0].push_str(" (> 1 year)");
            }
            lines
        }
        SegmentLabel::AtRisk => vec![format!(
            "Critical satisfaction: {} / 5.0",
            fmt_mean(summary.mean_avg_review_score, 1)
        )],
    }
}

/// One card per summary, in the summaries' order
pub fn strategy_cards(summaries: &[SegmentSummary], baseline_monetary: Option<f64>) -> Vec<StrategyCard> {
    summaries
        .iter()
        .map(|summary| {
            let book = playbook(summary.label);
            StrategyCard {
                label: summary.label,
                title: format!(
                    "{} {} ({}) | {} customers",
                    summary.label.icon(),
                    summary.label.display_name(),
                    summary.label.alias(),
                    format_count(summary.count)
                ),
                tagline: book.tagline.to_string(),
                highlights: highlights(summary, baseline_monetary),
                action: book.action.to_string(),
                tone: book.tone,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(label: SegmentLabel, count: usize) -> SegmentSummary {
        SegmentSummary {
            label,
            count,
            mean_recency: None,
            mean_frequency: None,
            mean_monetary: None,
            mean_avg_review_score: None,
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_vip_card_compares_against_baseline() {
        let mut vip = summary(SegmentLabel::Vip, 1520);
        vip.mean_monetary = Some(412.4);
        vip.mean_frequency = Some(2.13);

        let cards = strategy_cards(&[vip], Some(140.2));
        assert_eq!(cards[0].title, "💎 VIP (Champions) | 1,520 customers");
        assert_eq!(cards[0].highlights[0], "Avg spend: R$ 412 (vs R$ 140 avg)");
        assert_eq!(cards[0].highlights[1], "Frequency: 2.1 purchases");
        assert_eq!(cards[0].tone, CardTone::Success);
    }

    #[test]
    fn test_empty_segment_renders_placeholders() {
        let cards = strategy_cards(&[summary(SegmentLabel::AtRisk, 0)], None);
        assert_eq!(cards[0].highlights, vec!["Critical satisfaction: n/a / 5.0".to_string()]);
        assert!(cards[0].action.contains("Do not retarget"));
    }

    #[test]
    fn test_sleeping_marks_year_long_inactivity() {
        let mut sleeping = summary(SegmentLabel::Sleeping, 10);
        sleeping.mean_recency = Some(420.0);
        let cards = strategy_cards(&[sleeping], None);
        assert_eq!(cards[0].highlights[0], "Inactivity: 420 days (> 1 year)");
    }

    #[test]
    fn test_overall_mean_skips_missing() {
        let records = vec![
            CustomerClusterRecord::new(0).with_monetary(100.0),
            CustomerClusterRecord::new(1),
            CustomerClusterRecord::new(2).with_monetary(200.0),
        ];
        assert_eq!(overall_mean_monetary(&records), Some(150.0));
        assert_eq!(overall_mean_monetary(&[]), None);
    }
}
