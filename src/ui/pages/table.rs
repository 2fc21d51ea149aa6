use dioxus::prelude::*;

use crate::domain::entities::filter::{FilterOperator, JoinOperator, PageRequest, PageResult};
use crate::domain::entities::institution::{column_def, ColumnDef, INSTITUTION_COLUMNS};
use crate::ui::format::{cell_align, format_cell};
use crate::ui::pages::layout::{render_document, NavTarget, Shell};
use crate::ui::params::{
    table_href, table_pairs, with_join_operator, with_page, with_sort_toggled, without_filter,
    PER_PAGE_OPTIONS,
};
use crate::ui::styles::{
    button_style, chip_style, input_style, muted_style, table_cell_style,
    table_container_style, table_header_cell_style, table_style, toolbar_style,
};

pub fn render_table_page(request: PageRequest, result: PageResult) -> String {
    render_document(
        "Institutions",
        rsx! {
            Shell { title: "Institutions", active: NavTarget::Table,
                TablePage { request, result }
            }
        },
    )
}

/// Only catalog columns are shown, in the requested order.
pub fn visible_columns(request: &PageRequest) -> Vec<ColumnDef> {
    request
        .columns
        .iter()
        .filter_map(|id| column_def(id))
        .copied()
        .collect()
}

/// A page past the end: no rows although other pages exist.
pub fn is_out_of_range(request: &PageRequest, result: &PageResult) -> bool {
    result.rows.is_empty() && result.page_count > 0 && u64::from(request.page) > result.page_count
}

fn hidden_pairs(request: &PageRequest, skip: &[&str]) -> Vec<(String, String)> {
    table_pairs(&with_page(request, 1))
        .into_iter()
        .filter(|(key, _)| !skip.contains(&key.as_str()))
        .collect()
}

#[component]
pub fn TablePage(request: PageRequest, result: PageResult) -> Element {
    let columns = visible_columns(&request);
    let page = request.page;
    let page_count = result.page_count;
    let last_page = u32::try_from(page_count).unwrap_or(u32::MAX).max(1);
    let out_of_range = is_out_of_range(&request, &result);

    let first_href = table_href(&with_page(&request, 1));
    let prev_href = table_href(&with_page(&request, page.saturating_sub(1)));
    let next_href = table_href(&with_page(&request, page.saturating_add(1)));
    let last_href = table_href(&with_page(&request, last_page));
    let has_prev = page > 1;
    let has_next = u64::from(page) < page_count;

    rsx! {
        FilterBar { request: request.clone() }

        div {
            style: "{toolbar_style()}",
            ColumnChooser { request: request.clone() }
            PerPageSelect { request: request.clone() }
        }

        if result.rows.is_empty() {
            div {
                style: "padding: 24px; border: 1px dashed #bbb; border-radius: 8px; text-align: center;",
                if out_of_range {
                    p { "No results on page {page}." }
                    a { style: "{button_style()}", href: "{last_href}", "Go to last page" }
                } else {
                    p { "No results." }
                }
            }
        } else {
            div {
                style: "{table_container_style()}",
                table { style: "{table_style()}",
                    thead {
                        tr {
                            for column in columns.iter() {
                                SortHeader { request: request.clone(), column: *column }
                            }
                        }
                    }
                    tbody {
                        for row in result.rows.iter() {
                            tr {
                                for column in columns.iter() {
                                    td {
                                        style: "{table_cell_style(cell_align(column.kind))}",
                                        "{format_cell(column.kind, row.get(column.id))}"
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        div {
            style: "{toolbar_style()}",
            if has_prev {
                a { style: "{button_style()}", href: "{first_href}", "« First" }
                a { style: "{button_style()}", href: "{prev_href}", "‹ Previous" }
            }
            span { style: "{muted_style()}", "Page {page} of {page_count}" }
            if has_next {
                a { style: "{button_style()}", href: "{next_href}", "Next ›" }
                a { style: "{button_style()}", href: "{last_href}", "Last »" }
            }
        }
    }
}

#[component]
fn SortHeader(request: PageRequest, column: ColumnDef) -> Element {
    let href = table_href(&with_sort_toggled(&request, column.id));
    let arrow = match request.sort.first() {
        Some(current) if current.column_id == column.id => {
            if current.descending {
                " ↓"
            } else {
                " ↑"
            }
        }
        _ => "",
    };
    rsx! {
        th { style: "{table_header_cell_style()}",
            a {
                style: "color: inherit; text-decoration: none;",
                href: "{href}",
                "{column.label}{arrow}"
            }
        }
    }
}

#[component]
fn FilterBar(request: PageRequest) -> Element {
    let hidden = hidden_pairs(&request, &[]);
    let active = request
        .filters
        .iter()
        .enumerate()
        .map(|(idx, filter)| {
            let label = column_def(&filter.column_id)
                .map(|column| column.label.to_string())
                .unwrap_or_else(|| filter.column_id.clone());
            (
                label,
                filter.operator.label(),
                filter.value.display(),
                table_href(&without_filter(&request, idx)),
            )
        })
        .collect::<Vec<_>>();
    let all_href = table_href(&with_join_operator(&request, JoinOperator::And));
    let any_href = table_href(&with_join_operator(&request, JoinOperator::Or));
    let is_or = request.join_operator == JoinOperator::Or;

    rsx! {
        form {
            style: "{toolbar_style()}",
            method: "get",
            action: "/institutions/table",
            for (key, value) in hidden {
                input { r#type: "hidden", name: "{key}", value: "{value}" }
            }
            select { style: "{input_style()}", name: "filterId",
                for column in INSTITUTION_COLUMNS.iter() {
                    option { value: "{column.id}", "{column.label}" }
                }
            }
            select { style: "{input_style()}", name: "filterOperator",
                for operator in FilterOperator::ALL {
                    option { value: "{operator.as_str()}", "{operator.label()}" }
                }
            }
            input {
                style: "{input_style()}",
                name: "filterValue",
                placeholder: "Value (comma-separated for 'is any of')",
            }
            button { style: "{button_style()}", r#type: "submit", "Add filter" }
        }

        if !active.is_empty() {
            div {
                style: "{toolbar_style()}",
                if active.len() > 1 {
                    span { style: "{muted_style()}", "Match" }
                    a {
                        style: "{button_style()}",
                        href: "{all_href}",
                        if is_or { "all" } else { "all ✓" }
                    }
                    a {
                        style: "{button_style()}",
                        href: "{any_href}",
                        if is_or { "any ✓" } else { "any" }
                    }
                }
                for (label, operator, value, remove_href) in active {
                    span {
                        style: "{chip_style()}",
                        "{label} {operator} {value}"
                        a {
                            style: "text-decoration: none; color: #d24;",
                            href: "{remove_href}",
                            title: "Remove filter",
                            "×"
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn ColumnChooser(request: PageRequest) -> Element {
    let hidden = hidden_pairs(&request, &["columns"]);
    let selected = request.columns.clone();

    rsx! {
        details {
            summary { style: "{button_style()}", "Columns" }
            form {
                method: "get",
                action: "/institutions/table",
                style: "display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 4px; padding: 8px; max-height: 320px; overflow-y: auto; border: 1px solid #ddd; border-radius: 6px;",
                for (key, value) in hidden {
                    input { r#type: "hidden", name: "{key}", value: "{value}" }
                }
                for column in INSTITUTION_COLUMNS.iter() {
                    label { style: "display: flex; gap: 6px; align-items: center;",
                        input {
                            r#type: "checkbox",
                            name: "columns",
                            value: "{column.id}",
                            checked: selected.iter().any(|id| id.as_str() == column.id),
                        }
                        "{column.label}"
                    }
                }
                button { style: "{button_style()}", r#type: "submit", "Apply" }
            }
        }
    }
}

#[component]
fn PerPageSelect(request: PageRequest) -> Element {
    let hidden = hidden_pairs(&request, &["perPage"]);
    let current = request.per_page;

    rsx! {
        form {
            style: "display: inline-flex; gap: 6px; align-items: center;",
            method: "get",
            action: "/institutions/table",
            for (key, value) in hidden {
                input { r#type: "hidden", name: "{key}", value: "{value}" }
            }
            span { style: "{muted_style()}", "Rows per page" }
            select { style: "{input_style()}", name: "perPage",
                for option_value in PER_PAGE_OPTIONS {
                    option {
                        value: "{option_value}",
                        selected: option_value == current,
                        "{option_value}"
                    }
                }
            }
            button { style: "{button_style()}", r#type: "submit", "Apply" }
        }
    }
}
