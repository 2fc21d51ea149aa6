use std::collections::BTreeSet;

use dioxus::prelude::*;

use crate::domain::entities::comparison::{InstitutionOption, ReportPeriod, SelectedPair};
use crate::ui::format::{format_date, format_reported};
use crate::ui::pages::layout::{render_document, NavTarget, Shell};
use crate::ui::params::{
    apply_pair_edit, comparison_href, comparison_pairs, toggle_expanded, PairEdit,
};
use crate::ui::styles::{
    button_style, indent_style, input_style, muted_style, nav_link_style, table_cell_style,
    table_container_style, table_header_cell_style, table_style, toolbar_style,
};
use crate::usecase::services::comparison_service::{ComparisonPage, ComparisonRequest};

pub fn render_comparison_page(
    page: ComparisonPage,
    request: ComparisonRequest,
    expanded: BTreeSet<String>,
) -> String {
    render_document(
        "Compare Institutions",
        rsx! {
            Shell { title: "Compare Institutions", active: NavTarget::Comparison,
                ComparisonView { page, request, expanded }
            }
        },
    )
}

pub fn pair_heading(pair: &SelectedPair) -> (String, String) {
    let institution = match (&pair.institution_name, pair.institution_id) {
        (Some(name), _) => name.clone(),
        (None, Some(id)) => format!("Institution #{id}"),
        (None, None) => "No institution".to_string(),
    };
    let period = match (&pair.report_date, pair.report_period_id) {
        (Some(date), _) => format_date(date),
        (None, Some(id)) => format!("Period #{id}"),
        (None, None) => "No period".to_string(),
    };
    (institution, period)
}

#[component]
pub fn ComparisonView(
    page: ComparisonPage,
    request: ComparisonRequest,
    expanded: BTreeSet<String>,
) -> Element {
    let groups = page
        .field_groups
        .iter()
        .map(|group| {
            let target = ComparisonRequest {
                field_group: group.clone(),
                ..request.clone()
            };
            (
                group.clone(),
                comparison_href(&target, &BTreeSet::new()),
                *group == request.field_group,
            )
        })
        .collect::<Vec<_>>();

    let pair_count = page.table.pairs.len();
    let value_cell_style = table_cell_style("right");
    let headings = page.table.pairs.iter().map(pair_heading).collect::<Vec<_>>();
    let rows = page
        .table
        .visible_rows(&expanded)
        .map(|(row, cells)| {
            let toggle = row.position.has_children.then(|| {
                let open = expanded.contains(&row.position.code);
                let href = comparison_href(&request, &toggle_expanded(&expanded, &row.position.code));
                (if open { "▾" } else { "▸" }, href)
            });
            (
                row.field.label().to_string(),
                row.field.tooltip().to_string(),
                row.position.depth,
                toggle,
                cells.iter().map(|cell| format_reported(*cell)).collect::<Vec<_>>(),
            )
        })
        .collect::<Vec<_>>();

    rsx! {
        div {
            style: "{toolbar_style()}",
            for (group, href, active) in groups {
                a { style: "{nav_link_style(active)}", href: "{href}", "{group}" }
            }
        }

        div {
            style: "display: flex; flex-direction: column; gap: 6px; margin: 12px 0;",
            for (slot, pair) in page.table.pairs.iter().enumerate() {
                PairSelector {
                    slot,
                    pair: pair.clone(),
                    request: request.clone(),
                    expanded: expanded.clone(),
                    institutions: page.institutions.clone(),
                    report_periods: page.report_periods.clone(),
                }
            }
            PairSelector {
                slot: pair_count,
                pair: SelectedPair::default(),
                request: request.clone(),
                expanded: expanded.clone(),
                institutions: page.institutions.clone(),
                report_periods: page.report_periods.clone(),
            }
        }

        if pair_count == 0 {
            p { style: "{muted_style()}", "Select an institution and a report period to compare." }
        } else if rows.is_empty() {
            p { style: "{muted_style()}", "No fields available for this group." }
        } else {
            div {
                style: "{table_container_style()}",
                table { style: "{table_style()}",
                    thead {
                        tr {
                            th { style: "{table_header_cell_style()}", "Field" }
                            for (institution, period) in headings {
                                th { style: "{table_header_cell_style()} text-align: right;",
                                    div { "{institution}" }
                                    div { style: "{muted_style()}", "{period}" }
                                }
                            }
                        }
                    }
                    tbody {
                        for (label, tooltip, depth, toggle, cells) in rows {
                            tr {
                                td { style: "{indent_style(depth)}", title: "{tooltip}",
                                    for (marker, href) in toggle {
                                        a {
                                            style: "text-decoration: none; color: inherit; margin-right: 4px;",
                                            href: "{href}",
                                            "{marker}"
                                        }
                                    }
                                    "{label}"
                                }
                                for cell in cells {
                                    td { style: "{value_cell_style}", "{cell}" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn PairSelector(
    slot: usize,
    pair: SelectedPair,
    request: ComparisonRequest,
    expanded: BTreeSet<String>,
    institutions: Vec<InstitutionOption>,
    report_periods: Vec<ReportPeriod>,
) -> Element {
    let hidden = comparison_pairs(&request, &expanded);
    let is_new = pair.institution_id.is_none() && pair.report_period_id.is_none();
    let remove_href = comparison_href(
        &apply_pair_edit(
            &request,
            PairEdit {
                slot,
                institution_id: None,
                report_period_id: None,
            },
        ),
        &expanded,
    );

    rsx! {
        form {
            style: "display: flex; gap: 8px; align-items: center;",
            method: "get",
            action: "/comparison/new",
            for (key, value) in hidden {
                input { r#type: "hidden", name: "{key}", value: "{value}" }
            }
            input { r#type: "hidden", name: "slot", value: "{slot}" }
            select { style: "{input_style()}", name: "slotInstitution",
                option { value: "", "Select institution" }
                for institution in institutions.iter() {
                    option {
                        value: "{institution.id}",
                        selected: pair.institution_id == Some(institution.id),
                        "{institution.name}"
                    }
                }
            }
            select { style: "{input_style()}", name: "slotPeriod",
                option { value: "", "Select report period" }
                for period in report_periods.iter() {
                    option {
                        value: "{period.report_period_id}",
                        selected: pair.report_period_id == Some(period.report_period_id),
                        "{format_date(&period.report_date)}"
                    }
                }
            }
            button {
                style: "{button_style()}",
                r#type: "submit",
                if is_new { "Add" } else { "Update" }
            }
            if !is_new {
                a { style: "{button_style()}", href: "{remove_href}", "Remove" }
            }
        }
    }
}
