//! Plain-text rendering

use docket_store::Catalog;
use docket_view::{MetricSummary, ViewState};
use std::fmt::Write;

pub(crate) fn render_view(state: &ViewState) -> String {
    let mut out = String::new();
    let portfolio = state
        .breadcrumb
        .portfolio_name
        .as_deref()
        .unwrap_or(&state.breadcrumb.portfolio_id);
    let _ = writeln!(out, "{portfolio} / {} ({})", state.product_name, state.product_id);
    let _ = writeln!(out, "Period: {}", state.period);
    let _ = writeln!(out);

    match &state.roadmap {
        Some(roadmap) => {
            let _ = writeln!(
                out,
                "Roadmap {}: v{} {}",
                roadmap.year, roadmap.version, roadmap.link
            );
        }
        None => {
            let _ = writeln!(out, "No roadmap for {}", state.period.year_scope());
        }
    }

    match &state.release_goal {
        Some(goal) => {
            let _ = writeln!(out, "Release goals v{} ({} goals)", goal.version, goal.goals.len());
            for item in &goal.goals {
                let _ = writeln!(
                    out,
                    "  - [{}] {} ({} -> {})",
                    or_dash(&item.status),
                    item.description,
                    or_dash(&item.current_state),
                    or_dash(&item.target_state)
                );
            }
        }
        None => {
            let _ = writeln!(out, "No release goals for this period");
        }
    }

    match &state.release_plan {
        Some(plan) => {
            let _ = writeln!(out, "Release plan v{} ({} items)", plan.version, plan.items.len());
            for item in &plan.items {
                let _ = writeln!(
                    out,
                    "  - [{}] {} / {}",
                    or_dash(&item.status),
                    item.title,
                    or_dash(&item.priority)
                );
            }
        }
        None => {
            let _ = writeln!(out, "No release plan for this period");
        }
    }

    match &state.release_note {
        Some(note) => {
            let _ = writeln!(out, "Release notes v{}: {}", note.version, note.link);
        }
        None => {
            let _ = writeln!(out, "No release notes for this period");
        }
    }

    if state.metrics.is_empty() {
        let _ = writeln!(out, "No metrics for this period");
    } else {
        let _ = writeln!(out, "Metrics:");
        for metric in &state.metrics {
            let _ = writeln!(out, "  - {}", render_metric(metric));
        }
    }

    let older: Vec<String> = state
        .versions
        .release_goals
        .iter()
        .skip(1)
        .map(ToString::to_string)
        .collect();
    if !older.is_empty() {
        let _ = writeln!(out, "Earlier goal versions: {}", older.join(", "));
    }
    out
}

fn render_metric(metric: &MetricSummary) -> String {
    let mut line = format!("{}: {}", metric.name, metric.value);
    if let (Some(target), Some(ratio)) = (metric.monthly_target, metric.monthly_attainment) {
        let _ = write!(line, " (target {target}, {:.0}%)", ratio * 100.0);
    }
    if let Some(target) = metric.annual_target {
        let _ = write!(line, " [annual {target}]");
    }
    line
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

pub(crate) fn render_catalog(catalog: &Catalog) -> String {
    let mut out = String::new();
    for portfolio in catalog.portfolios() {
        let _ = writeln!(out, "{} ({})", portfolio.name, portfolio.id);
        for id in &portfolio.product_ids {
            match catalog.product(id) {
                Some(product) => {
                    let _ = writeln!(
                        out,
                        "  {} ({}): {} roadmaps, {} goal sets, {} plans, {} metrics, {} notes",
                        product.name,
                        product.id,
                        product.roadmap.len(),
                        product.release_goals.len(),
                        product.release_plans.len(),
                        product.metrics.len(),
                        product.release_notes.len(),
                    );
                }
                None if catalog.rejected(id).is_some() => {
                    let _ = writeln!(out, "  {id}: malformed");
                }
                None => {
                    let _ = writeln!(out, "  {id}: missing");
                }
            }
        }
    }

    let orphans: Vec<&str> = catalog
        .products()
        .iter()
        .filter(|p| catalog.portfolio(&p.portfolio_id).is_none())
        .map(|p| p.id.as_str())
        .collect();
    if !orphans.is_empty() {
        let _ = writeln!(out, "Without portfolio: {}", orphans.join(", "));
    }
    out
}
