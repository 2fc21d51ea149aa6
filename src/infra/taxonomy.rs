use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::entities::taxonomy::Taxonomy;

const BUNDLED_TAXONOMY: &str = include_str!("../../assets/taxonomy.json");

pub fn bundled() -> Result<Taxonomy> {
    Taxonomy::from_json(BUNDLED_TAXONOMY)
}

pub fn load(path: Option<&Path>) -> Result<Taxonomy> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read taxonomy: {}", path.display()))?;
            Taxonomy::from_json(&raw)
        }
        None => bundled(),
    }
}
