pub fn page_style() -> &'static str {
    "font-family: 'Inter', 'Segoe UI', sans-serif; padding: 12px 20px; background: #fff; color: #1f2328; min-height: 100vh;"
}

pub fn nav_style() -> &'static str {
    "display: flex; gap: 16px; align-items: center; margin-bottom: 16px; padding: 8px 0; border-bottom: 1px solid #ddd; position: sticky; top: 0; background: #fff; z-index: 900;"
}

pub fn nav_link_style(active: bool) -> String {
    format!(
        "text-decoration: none; padding: 4px 10px; border-radius: 6px; color: #1f2328; {}",
        if active {
            "background: #eef4ff; font-weight: 600;"
        } else {
            ""
        }
    )
}

pub fn toolbar_style() -> &'static str {
    "display: flex; flex-wrap: wrap; gap: 8px; align-items: center; margin: 12px 0;"
}

pub fn button_style() -> &'static str {
    "border: 1px solid #bbb; background: #fff; padding: 4px 10px; border-radius: 6px; cursor: pointer; text-decoration: none; color: #1f2328;"
}

pub fn input_style() -> &'static str {
    "border: 1px solid #bbb; padding: 4px 8px; border-radius: 6px;"
}

pub fn chip_style() -> &'static str {
    "display: inline-flex; gap: 6px; align-items: center; border: 1px solid #bbb; background: #f6f8fa; padding: 2px 8px; border-radius: 12px;"
}

pub fn table_container_style() -> &'static str {
    "overflow: auto; max-height: 70vh; border: 1px solid #ddd; border-radius: 6px;"
}

pub fn table_style() -> &'static str {
    "border-collapse: collapse; width: 100%; background: #fff;"
}

pub fn table_header_cell_style() -> &'static str {
    "border: 1px solid #bbb; padding: 6px 8px; background: #f6f8fa; position: sticky; top: 0; z-index: 10; text-align: left; white-space: nowrap;"
}

pub fn table_cell_style(align: &str) -> String {
    format!("border: 1px solid #ddd; padding: 4px 8px; text-align: {align}; white-space: nowrap;")
}

/// Nested comparison rows step in by 1.5rem per level.
pub fn indent_style(depth: usize) -> String {
    format!(
        "border: 1px solid #ddd; padding: 4px 8px; padding-left: calc(8px + {}rem);",
        depth as f64 * 1.5
    )
}

pub fn card_style() -> &'static str {
    "border: 1px solid #ddd; border-radius: 8px; padding: 12px 16px; background: #fff; min-width: 220px; flex: 1;"
}

pub fn bar_track_style() -> &'static str {
    "background: #eef1f4; border-radius: 4px; height: 12px; flex: 1;"
}

pub fn bar_fill_style(percent: f64) -> String {
    format!(
        "background: #3b82f6; border-radius: 4px; height: 12px; width: {:.1}%;",
        percent.clamp(0.0, 100.0)
    )
}

pub fn muted_style() -> &'static str {
    "color: #656d76; font-size: 0.9em;"
}
