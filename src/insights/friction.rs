//! Delivery friction: how late deliveries relate to review scores

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::FrictionConfig;
use crate::models::Order;

/// Five-number summary of delivery deviation for one review score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationBox {
    pub review_score: u8,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrictionDiagnosis {
    pub order_lines: usize,
    pub late_order_lines: usize,
    /// Share of all order lines delivered after the promise; `None` without orders
    pub late_rate_pct: Option<f64>,
    pub target_late_rate_pct: f64,
    pub meets_target: bool,
    pub median_delay_one_star: Option<f64>,
    pub median_delay_five_star: Option<f64>,
    pub review_boxes: Vec<DeviationBox>,
    pub diagnosis: String,
}

/// Linear-interpolated quantile of an ascending slice
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    quantile(&sorted, 0.5)
}

/// Review score as a star count, when it is a whole number from 1 to 5
fn stars(score: Option<f64>) -> Option<u8> {
    let score = score?;
    if score.fract() == 0.0 && (1.0..=5.0).contains(&score) {
        Some(score as u8)
    } else {
        None
    }
}

fn deviations_for_stars(orders: &[Order], wanted: u8) -> Vec<f64> {
    orders
        .iter()
        .filter(|o| stars(o.review_score) == Some(wanted))
        .filter_map(|o| o.delivery_deviation_days)
        .collect()
}

fn deviation_boxes(orders: &[Order], window: f64) -> Vec<DeviationBox> {
    let mut by_score: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
    for order in orders {
        let (Some(score), Some(dev)) = (stars(order.review_score), order.delivery_deviation_days) else {
            continue;
        };
        if dev.is_finite() && dev > -window && dev < window {
            by_score.entry(score).or_default().push(dev);
        }
    }

    by_score
        .into_iter()
        .filter_map(|(review_score, mut values)| {
            values.sort_by(f64::total_cmp);
            Some(DeviationBox {
                review_score,
                count: values.len(),
                min: *values.first()?,
                q1: quantile(&values, 0.25)?,
                median: quantile(&values, 0.5)?,
                q3: quantile(&values, 0.75)?,
                max: *values.last()?,
            })
        })
        .collect()
}

fn diagnosis_text(late_rate_pct: Option<f64>, one_star: Option<f64>) -> String {
    match (late_rate_pct, one_star) {
        (Some(rate), Some(delay)) if delay > 0.0 => format!(
            "{:.1}% of orders miss the delivery promise. Customers who rate with 1 star \
             received their order a median of {:.1} days late.",
            rate, delay
        ),
        (Some(rate), Some(delay)) => format!(
            "{:.1}% of orders miss the delivery promise. 1-star orders still arrived a median of \
             {:.1} days ahead of the promise, so lateness is not the main detractor.",
            rate,
            delay.abs()
        ),
        (Some(rate), None) => format!(
            "{:.1}% of orders miss the delivery promise. No 1-star reviews with delivery data.",
            rate
        ),
        (None, _) => "No orders to diagnose.".to_string(),
    }
}

pub fn friction_diagnosis(orders: &[Order], config: &FrictionConfig) -> FrictionDiagnosis {
    let late_order_lines = orders
        .iter()
        .filter(|o| o.delivery_deviation_days.is_some_and(|d| d > config.late_threshold_days))
        .count();
    let late_rate_pct =
        (!orders.is_empty()).then(|| late_order_lines as f64 / orders.len() as f64 * 100.0);

    let median_delay_one_star = median(&deviations_for_stars(orders, 1));
    let median_delay_five_star = median(&deviations_for_stars(orders, 5));

    FrictionDiagnosis {
        order_lines: orders.len(),
        late_order_lines,
        late_rate_pct,
        target_late_rate_pct: config.target_late_rate_pct,
        meets_target: late_rate_pct.is_some_and(|r| r < config.target_late_rate_pct),
        median_delay_one_star,
        median_delay_five_star,
        review_boxes: deviation_boxes(orders, config.plot_window_days),
        diagnosis: diagnosis_text(late_rate_pct, median_delay_one_star),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;

    fn order(deviation: Option<f64>, review: Option<f64>) -> Order {
        Order {
            order_id: "o".to_string(),
            purchased_at: parse_timestamp("2018-01-01").unwrap(),
            price: Some(10.0),
            delivery_deviation_days: deviation,
            review_score: review,
            order_status: "delivered".to_string(),
            customer_state: "SP".to_string(),
        }
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&values, 0.25), Some(1.75));
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_late_rate_counts_missing_deviation_in_denominator() {
        let orders = vec![
            order(Some(5.0), Some(1.0)),
            order(Some(-10.0), Some(5.0)),
            order(Some(0.0), Some(4.0)),
            order(None, Some(3.0)),
        ];
        let diag = friction_diagnosis(&orders, &FrictionConfig::default());

        assert_eq!(diag.late_order_lines, 1);
        assert_eq!(diag.late_rate_pct, Some(25.0));
        assert!(!diag.meets_target);
        assert_eq!(diag.median_delay_one_star, Some(5.0));
        assert_eq!(diag.median_delay_five_star, Some(-10.0));
        assert!(diag.diagnosis.contains("25.0%"));
        assert!(diag.diagnosis.contains("5.0 days late"));
    }

    #[test]
    fn test_boxes_respect_plot_window() {
        let orders = vec![
            order(Some(-70.0), Some(5.0)),
            order(Some(-12.0), Some(5.0)),
            order(Some(-8.0), Some(5.0)),
            order(Some(60.0), Some(1.0)),
            order(Some(20.0), Some(1.0)),
            order(Some(3.0), Some(4.5)),
        ];
        let diag = friction_diagnosis(&orders, &FrictionConfig::default());

        assert_eq!(diag.review_boxes.len(), 2);
        assert_eq!(diag.review_boxes[0].review_score, 1);
        assert_eq!(diag.review_boxes[0].count, 1);
        assert_eq!(diag.review_boxes[1].review_score, 5);
        assert_eq!(diag.review_boxes[1].min, -12.0);
        assert_eq!(diag.review_boxes[1].median, -10.0);
    }

    #[test]
    fn test_no_orders() {
        let diag = friction_diagnosis(&[], &FrictionConfig::default());
        assert_eq!(diag.late_rate_pct, None);
        assert!(!diag.meets_target);
        assert_eq!(diag.diagnosis, "No orders to diagnose.");
    }
}
