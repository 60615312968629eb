//! Terminal rendering of the dashboard views

use crate::dashboard::{AudiencePoint, SegmentationView};
use crate::insights::{BusinessHealth, FrictionDiagnosis};
use crate::segments::strategy::format_count;
use crate::segments::CardTone;

const WIDTH: usize = 85;

pub fn print_banner(title: &str) {
    let pad = WIDTH.saturating_sub(title.len() + 4) / 2;
    println!("\n{}", "█".repeat(WIDTH));
    println!("{}  {}  {}", "█".repeat(pad), title, "█".repeat(pad));
    println!("{}\n", "█".repeat(WIDTH));
}

pub fn print_footer() {
    println!("\n{}", "█".repeat(WIDTH));
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(WIDTH));
    println!("  {}", title);
    println!("{}\n", "═".repeat(WIDTH));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(75));
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * width as f64).round() as usize;
    "▇".repeat(filled.min(width))
}

pub fn render_health(health: &BusinessHealth) {
    print_section_header("1. BUSINESS HEALTH");

    println!("  Total revenue:    R$ {:>14.0}", health.total_revenue);
    println!("  Total orders:     {:>17}", format_count(health.total_orders));
    println!("  Average ticket:   R$ {:>14}", opt(health.average_ticket, 2));

    print_subsection("Monthly Revenue");
    let max_revenue = health
        .monthly_revenue
        .iter()
        .map(|m| m.revenue)
        .fold(0.0, f64::max);
    for month in &health.monthly_revenue {
        println!(
            "  {:8} R$ {:>12.0}  {}",
            month.month,
            month.revenue,
            bar(month.revenue, max_revenue, 40)
        );
    }

    print_subsection("Top Markets (States)");
    println!("  {:4} {:24} {:>10}", "UF", "State", "Orders");
    println!("  {}", "─".repeat(40));
    for state in &health.top_states {
        println!("  {:4} {:24} {:>10}", state.code, state.name, state.order_lines);
    }

    print_subsection("Operational Funnel");
    for status in &health.status_funnel {
        println!("  {:14} {:>10}", status.status, status.count);
    }
}

pub fn render_friction(friction: &FrictionDiagnosis) {
    print_section_header("2. DELIVERY FRICTION (CX)");

    let status = if friction.meets_target { "✓" } else { "⚠" };
    println!(
        "  {} Late order rate:          {:>6}%   (target < {:.0}%)",
        status,
        opt(friction.late_rate_pct, 1),
        friction.target_late_rate_pct
    );
    println!(
        "    Median delay, 1★ reviews: {:>6} days",
        opt(friction.median_delay_one_star, 1)
    );
    println!(
        "    Median delay, 5★ reviews: {:>6} days",
        opt(friction.median_delay_five_star, 1)
    );

    print_subsection("Delivery Deviation by Review Score (+ late / - early)");
    println!(
        "  {:>6} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "Stars", "Count", "Min", "Q1", "Median", "Q3", "Max"
    );
    println!("  {}", "─".repeat(62));
    for b in &friction.review_boxes {
        println!(
            "  {:>6} {:>8} {:>8.1} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
            "★".repeat(b.review_score as usize),
            b.count,
            b.min,
            b.q1,
            b.median,
            b.q3,
            b.max
        );
    }

    println!("\n  DIAGNOSIS: {}", friction.diagnosis);
}

fn tone_marker(tone: CardTone) -> &'static str {
    match tone {
        CardTone::Success => "🟢",
        CardTone::Info => "🔵",
        CardTone::Warning => "🟡",
        CardTone::Error => "🔴",
    }
}

pub fn render_segments(view: &SegmentationView, points: &[AudiencePoint]) {
    print_section_header("3. BEHAVIORAL SEGMENTATION");

    println!(
        "  {} customers | policy: {} | avg spend R$ {}",
        format_count(view.total_customers),
        view.policy,
        opt(view.baseline_monetary, 0)
    );

    print_subsection(&format!("Audience Map (spend < R$ {:.0})", view.monetary_cap));
    println!("  {:18} {:>9} {:>10} {:>12}", "Segment", "Colour", "Points", "Avg recency");
    println!("  {}", "─".repeat(52));
    for style in &view.styles {
        let in_map: Vec<&AudiencePoint> = points.iter().filter(|p| p.label == style.label).collect();
        let avg_recency = if in_map.is_empty() {
            None
        } else {
            Some(in_map.iter().map(|p| p.recency).sum::<f64>() / in_map.len() as f64)
        };
        println!(
            "  {:18} {:>9} {:>10} {:>12}",
            style.label.display_name(),
            style.color,
            in_map.len(),
            opt(avg_recency, 0)
        );
    }

    print_subsection("Strategies by Audience");
    for card in &view.cards {
        println!("{} {}", tone_marker(card.tone), card.title);
        println!("   {}", card.tagline);
        for line in &card.highlights {
            println!("   - {}", line);
        }
        println!("   Action: {}", card.action);
        println!();
    }

    print_subsection("Segment Metrics");
    println!(
        "  {:12} {:>9} {:>10} {:>10} {:>10} {:>8}",
        "Segment", "Customers", "Recency", "Frequency", "Monetary", "Review"
    );
    println!("  {}", "─".repeat(64));
    for s in &view.summaries {
        println!(
            "  {:12} {:>9} {:>10} {:>10} {:>10} {:>8}",
            s.label.display_name(),
            s.count,
            opt(s.mean_recency, 2),
            opt(s.mean_frequency, 2),
            opt(s.mean_monetary, 2),
            opt(s.mean_avg_review_score, 2)
        );
    }
}

pub fn render_clusters(view: &SegmentationView) {
    print_section_header("RAW CLUSTER PROFILES");

    println!(
        "  {:>7} {:16} {:>9} {:>10} {:>10} {:>10} {:>8}",
        "Cluster", "Segment", "Customers", "Recency", "Frequency", "Monetary", "Review"
    );
    println!("  {}", "─".repeat(76));
    for p in &view.cluster_profiles {
        let segment = view
            .cluster_label(p.cluster_id)
            .map(|c| format!("{} {:.0}%", c.label.display_name(), c.share_pct))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>7} {:16} {:>9} {:>10} {:>10} {:>10} {:>8}",
            p.cluster_id,
            segment,
            p.count,
            opt(p.mean_recency, 2),
            opt(p.mean_frequency, 2),
            opt(p.mean_monetary, 2),
            opt(p.mean_avg_review_score, 2)
        );
    }

    if !view.rule_hits.is_empty() {
        print_subsection("Rule Table (first match wins)");
        for hit in &view.rule_hits {
            println!("  {:>9}  {}", hit.customers, hit.description);
        }
    }
}
