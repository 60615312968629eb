//! Business health: revenue, order volume, markets and the status funnel

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::Order;
use crate::state_names::get_state_name;

const TOP_STATES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: f64,
    pub order_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVolume {
    pub code: String,
    pub name: String,
    pub order_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessHealth {
    pub total_revenue: f64,
    pub total_orders: usize,
    pub total_order_lines: usize,
    /// Revenue per distinct order; `None` without orders
    pub average_ticket: Option<f64>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub top_states: Vec<StateVolume>,
    pub status_funnel: Vec<StatusCount>,
}

/// Count occurrences and sort by count descending, then key ascending
fn ranked_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

pub fn business_health(orders: &[Order]) -> BusinessHealth {
    let total_revenue: f64 = orders.iter().filter_map(|o| o.price).sum();
    let total_orders = orders
        .iter()
        .map(|o| o.order_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let average_ticket = (total_orders > 0).then(|| total_revenue / total_orders as f64);

    let mut months: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for order in orders {
        let entry = months
            .entry(order.purchased_at.format("%Y-%m").to_string())
            .or_insert((0.0, 0));
        entry.0 += order.price.unwrap_or(0.0);
        entry.1 += 1;
    }
    let monthly_revenue = months
        .into_iter()
        .map(|(month, (revenue, order_lines))| MonthlyRevenue {
            month,
            revenue,
            order_lines,
        })
        .collect();

    let top_states = ranked_counts(
        orders
            .iter()
            .map(|o| o.customer_state.as_str())
            .filter(|s| !s.is_empty()),
    )
    .into_iter()
    .take(TOP_STATES)
    .map(|(code, order_lines)| StateVolume {
        name: get_state_name(&code),
        code,
        order_lines,
    })
    .collect();

    let status_funnel = ranked_counts(
        orders
            .iter()
            .map(|o| o.order_status.as_str())
            .filter(|s| !s.is_empty()),
    )
    .into_iter()
    .map(|(status, count)| StatusCount { status, count })
    .collect();

    BusinessHealth {
        total_revenue,
        total_orders,
        total_order_lines: orders.len(),
        average_ticket,
        monthly_revenue,
        top_states,
        status_funnel,
    }
}
