use dioxus::prelude::*;

use crate::domain::entities::statistics::{BucketCount, MarketShareItem};
use crate::ui::format::{format_millions_currency, format_number, format_percent};
use crate::ui::pages::layout::{render_document, NavTarget, Shell};
use crate::ui::styles::{bar_fill_style, bar_track_style, card_style, muted_style};
use crate::usecase::services::dashboard_service::DashboardSnapshot;

pub fn render_dashboard_page(snapshot: DashboardSnapshot) -> String {
    render_document(
        "Institutions Dashboard",
        rsx! {
            Shell { title: "Institutions Dashboard", active: NavTarget::Dashboard,
                DashboardPage { snapshot }
            }
        },
    )
}

#[component]
pub fn DashboardPage(snapshot: DashboardSnapshot) -> Element {
    let stats = snapshot.key_statistics;
    let quarterly = snapshot.quarterly_update.clone();
    let weekly = snapshot.weekly_update.clone();

    rsx! {
        section {
            style: "display: flex; flex-wrap: wrap; gap: 12px; margin-bottom: 16px;",
            StatCard {
                title: "Total Institutions",
                value: format_number(stats.total_institutions, 0),
                note: "Updated {weekly}",
            }
            StatCard {
                title: "Total Assets",
                value: format_millions_currency(stats.total_assets),
                note: "As of {quarterly}",
            }
            StatCard {
                title: "Total Deposits",
                value: format_millions_currency(stats.total_deposits),
                note: "As of {quarterly}",
            }
            StatCard {
                title: "Total Branches",
                value: format_number(stats.total_branches, 0),
                note: "Updated {weekly}",
            }
        }

        section {
            style: "display: flex; flex-wrap: wrap; gap: 12px; margin-bottom: 16px;",
            for (kind, items) in snapshot.market_share.iter() {
                MarketShareCard { title: kind.title().to_string(), items: items.clone() }
            }
        }

        section {
            style: "display: grid; grid-template-columns: repeat(auto-fill, minmax(360px, 1fr)); gap: 12px;",
            BarListCard {
                title: "Bank Age Distribution",
                description: "Institutions by years since establishment",
                bars: snapshot.age_distribution.clone(),
            }
            BarListCard {
                title: "Establishment Trend",
                description: "Institutions established per decade",
                bars: snapshot.establishment_by_decade.clone(),
            }
            BarListCard {
                title: "Deposit Distribution",
                description: "Institutions by total deposits",
                bars: snapshot.deposit_distribution.clone(),
            }
            BarListCard {
                title: "Charter Types",
                description: "Federal and state chartered institutions",
                bars: snapshot.charter_types.clone(),
            }
            for (chart, bars) in snapshot.categories.iter() {
                BarListCard {
                    title: chart.title().to_string(),
                    description: chart.description().to_string(),
                    bars: bars.clone(),
                }
            }
        }
    }
}

#[component]
fn StatCard(title: String, value: String, note: String) -> Element {
    rsx! {
        div { style: "{card_style()}",
            div { style: "{muted_style()}", "{title}" }
            div { style: "font-size: 1.6em; font-weight: 600; margin: 4px 0;", "{value}" }
            div { style: "{muted_style()}", "{note}" }
        }
    }
}

#[component]
fn MarketShareCard(title: String, items: Vec<MarketShareItem>) -> Element {
    rsx! {
        div { style: "{card_style()}",
            div { style: "font-weight: 600; margin-bottom: 8px;", "{title}" }
            if items.is_empty() {
                div { style: "{muted_style()}", "No data available." }
            }
            for item in items.iter() {
                div { style: "display: flex; justify-content: space-between; gap: 12px; padding: 2px 0;",
                    span { "{item.group_name}" }
                    span {
                        strong { "{format_percent(item.percentage_of_total)}" }
                        span { style: "{muted_style()}", " ({format_number(item.bank_count, 0)} banks)" }
                    }
                }
            }
        }
    }
}

/// Bar width relative to the largest count in the list.
pub fn bar_percent(count: f64, max: f64) -> f64 {
    if max <= 0.0 {
        0.0
    } else {
        count / max * 100.0
    }
}

#[component]
fn BarListCard(title: String, description: String, bars: Vec<BucketCount>) -> Element {
    let max = bars.iter().map(|bar| bar.count).fold(0.0, f64::max);

    rsx! {
        div { style: "{card_style()}",
            div { style: "font-weight: 600;", "{title}" }
            div { style: "{muted_style()} margin-bottom: 8px;", "{description}" }
            if bars.is_empty() {
                div { style: "{muted_style()}", "No data available." }
            }
            for bar in bars.iter() {
                div { style: "display: grid; grid-template-columns: 180px 1fr 70px; gap: 8px; align-items: center; padding: 2px 0;",
                    span { style: "overflow: hidden; text-overflow: ellipsis; white-space: nowrap;", title: "{bar.label}", "{bar.label}" }
                    div { style: "{bar_track_style()}",
                        div { style: "{bar_fill_style(bar_percent(bar.count, max))}" }
                    }
                    span { style: "text-align: right;", "{format_number(bar.count, 0)}" }
                }
            }
        }
    }
}
