use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("スイーツ・お菓子", "100283"),
    ("水・ソフトドリンク", "551167"),
    ("パソコン・周辺機器", "216131"),
    ("レディースファッション", "100371"),
];

/// A ranked product category and the genre id the ranking source files it under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub genre_id: String,
}

/// Ordered, non-empty set of categories. The first entry is the default selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, genre_id)| Category {
                    name: name.to_string(),
                    genre_id: genre_id.to_string(),
                })
                .collect(),
        }
    }
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> anyhow::Result<Self> {
        ensure!(!categories.is_empty(), "category catalog must be non-empty");
        for (idx, c) in categories.iter().enumerate() {
            ensure!(!c.name.trim().is_empty(), "category name must be non-empty");
            ensure!(
                !c.genre_id.trim().is_empty(),
                "genre id must be non-empty (category {})",
                c.name
            );
            // Names end up in snapshot file names.
            ensure!(
                !c.name.contains(['/', '\\']) && c.name != "." && c.name != "..",
                "category name must be usable in a file name (got {})",
                c.name
            );
            ensure!(
                categories[..idx].iter().all(|p| p.name != c.name),
                "duplicate category name: {}",
                c.name
            );
        }
        Ok(Self { categories })
    }

    /// Parses `name=genre_id,name=genre_id`.
    pub fn parse(spec: &str) -> anyhow::Result<Self> {
        let mut out = Vec::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((name, genre_id)) = part.split_once('=') else {
                bail!("invalid category entry '{part}', expected name=genre_id");
            };
            out.push(Category {
                name: name.trim().to_string(),
                genre_id: genre_id.trim().to_string(),
            });
        }
        Self::new(out)
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn default_category(&self) -> &Category {
        // Non-empty by construction.
        &self.categories[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
