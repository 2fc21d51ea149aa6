use dioxus::prelude::*;

use crate::ui::styles::{nav_link_style, nav_style, page_style};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Dashboard,
    Table,
    Comparison,
}

const NAV_ITEMS: [(NavTarget, &str, &str); 3] = [
    (NavTarget::Dashboard, "/institutions/dashboard", "Dashboard"),
    (NavTarget::Table, "/institutions/table", "Institutions"),
    (NavTarget::Comparison, "/comparison/new", "Compare"),
];

#[component]
pub fn Shell(title: String, active: NavTarget, children: Element) -> Element {
    rsx! {
        div {
            style: "{page_style()}",
            nav {
                style: "{nav_style()}",
                strong { "FDIC Institutions" }
                for (target, href, label) in NAV_ITEMS {
                    a {
                        style: "{nav_link_style(target == active)}",
                        href: "{href}",
                        "{label}"
                    }
                }
            }
            h1 { style: "font-size: 1.4em; margin: 8px 0 12px;", "{title}" }
            {children}
        }
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wraps rendered body markup in a complete HTML document.
pub fn render_document(title: &str, body: Element) -> String {
    let body = dioxus_ssr::render_element(body);
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{}</title></head><body style=\"margin: 0;\">{body}</body></html>",
        escape_html(title)
    )
}
