use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeNode {
    pub code: String,
    #[serde(default)]
    pub children: Vec<CodeNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(alias = "section")]
    pub name: String,
    #[serde(default)]
    pub children: Vec<CodeNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlattenedFieldRow {
    pub code: String,
    pub depth: usize,
    pub has_children: bool,
    /// Codes from the section root down to this row, inclusive.
    pub ancestor_path: Vec<String>,
}

impl Taxonomy {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse field taxonomy")
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name == name)
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections
            .iter()
            .map(|section| section.name.clone())
            .collect()
    }

    /// Unknown section names flatten to nothing.
    pub fn flatten(&self, section_name: &str) -> Vec<FlattenedFieldRow> {
        self.section(section_name)
            .map(flatten_section)
            .unwrap_or_default()
    }
}

pub fn flatten_section(section: &Section) -> Vec<FlattenedFieldRow> {
    let mut rows = Vec::new();
    let mut path = Vec::new();
    flatten_nodes(&section.children, 0, &mut path, &mut rows);
    rows
}

fn flatten_nodes(
    nodes: &[CodeNode],
    depth: usize,
    path: &mut Vec<String>,
    rows: &mut Vec<FlattenedFieldRow>,
) {
    for node in nodes {
        path.push(node.code.clone());
        let has_children = !node.children.is_empty();
        rows.push(FlattenedFieldRow {
            code: node.code.clone(),
            depth,
            has_children,
            ancestor_path: path.clone(),
        });
        if has_children {
            flatten_nodes(&node.children, depth + 1, path, rows);
        }
        path.pop();
    }
}

impl FlattenedFieldRow {
    /// Top-level rows always show; nested rows need every ancestor expanded.
    pub fn is_visible(&self, expanded: &BTreeSet<String>) -> bool {
        if self.depth == 0 {
            return true;
        }
        let ancestors = &self.ancestor_path[..self.ancestor_path.len().saturating_sub(1)];
        ancestors.iter().all(|code| expanded.contains(code))
    }
}
