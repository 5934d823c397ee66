use crate::digest::Article;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const ID_TITLE_PREFIX_LEN: usize = 50;

/// Snapshot of an article taken at save time. Independent of the live
/// content tree: removing a filter or a whole archive file does not touch
/// saved entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    /// Date of the digest the article came from (ISO).
    pub date: String,
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

/// Deterministic id from the owning digest date and a truncated title,
/// reduced to a safe character set. Saving the same article twice always
/// lands on the same id.
pub fn article_id(title: &str, date: &str) -> String {
    let prefix: String = title.chars().take(ID_TITLE_PREFIX_LEN).collect();
    format!("{}-{}", date, prefix)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// Ordered collection of saved articles, persisted as a JSON list. Mirrors
/// the "last write wins" durability model: every mutation rewrites the whole
/// file.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedStore {
    items: Vec<SavedArticle>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

impl SavedStore {
    pub fn ephemeral() -> Self {
        Self {
            items: Vec::new(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: &Path) -> Self {
        Self {
            items: Vec::new(),
            file_path: Some(file_path.to_path_buf()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<&Path>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                log::error!("Failed to load saved articles from {}: {}", path.display(), e);
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if file_path.exists() {
            let content = fs::read_to_string(file_path)?;
            let items: Vec<SavedArticle> = serde_json::from_str(&content)?;
            Ok(Self {
                items,
                file_path: Some(file_path.to_path_buf()),
            })
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        match &self.file_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                }
                let content = serde_json::to_string_pretty(&self.items)?;
                fs::write(path, content)?;
                Ok(())
            }
            // Ephemeral stores don't touch disk.
            None => Ok(()),
        }
    }

    /// Toggle semantics: saving an already-saved article removes it.
    /// Returns true when the article ended up saved.
    pub fn toggle(&mut self, article: &Article, origin_date: &str) -> bool {
        let id = article_id(&article.title, origin_date);
        let now_saved = if self.items.iter().any(|a| a.id == id) {
            self.items.retain(|a| a.id != id);
            false
        } else {
            self.items.push(SavedArticle {
                id,
                title: article.title.clone(),
                url: article.url.clone(),
                summary: article.summary.clone(),
                date: origin_date.to_string(),
                saved_at: chrono::Utc::now(),
            });
            true
        };
        self.persist();
        now_saved
    }

    pub fn is_saved(&self, title: &str, origin_date: &str) -> bool {
        let id = article_id(title, origin_date);
        self.items.iter().any(|a| a.id == id)
    }

    /// Direct id-based delete, used from the saved-articles view. Works
    /// whether or not the original article is currently rendered.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|a| a.id != id);
        let removed = self.items.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Full collection in insertion order; no explicit sort.
    pub fn list(&self) -> &[SavedArticle] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            log::error!("Failed to persist saved articles: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str) -> Article {
        Article {
            title: title.to_string(),
            url: "https://example.com/x".to_string(),
            summary: "A summary.".to_string(),
        }
    }

    #[test]
    fn id_is_sanitized_and_truncated() {
        let id = article_id("Rust 1.86: what's new?", "2026-01-05");
        assert_eq!(id, "2026-01-05-Rust-1-86--what-s-new-");

        let long_title = "x".repeat(80);
        let id = article_id(&long_title, "2026-01-05");
        assert_eq!(id.len(), "2026-01-05-".len() + 50);
    }

    #[test]
    fn toggle_twice_restores_prior_state() {
        let mut store = SavedStore::ephemeral();
        let a = article("GPU prices fall");

        assert!(store.toggle(&a, "2026-01-05"));
        assert_eq!(store.len(), 1);
        assert!(store.is_saved("GPU prices fall", "2026-01-05"));

        assert!(!store.toggle(&a, "2026-01-05"));
        assert!(store.is_empty());
        assert!(!store.is_saved("GPU prices fall", "2026-01-05"));
    }

    #[test]
    fn same_title_different_date_is_distinct() {
        let mut store = SavedStore::ephemeral();
        let a = article("GPU prices fall");

        store.toggle(&a, "2026-01-05");
        store.toggle(&a, "2026-01-06");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut store = SavedStore::ephemeral();
        store.toggle(&article("first"), "2026-01-05");
        store.toggle(&article("second"), "2026-01-05");
        store.toggle(&article("third"), "2026-01-05");

        let titles: Vec<&str> = store.list().iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn remove_by_id() {
        let mut store = SavedStore::ephemeral();
        store.toggle(&article("keep"), "2026-01-05");
        store.toggle(&article("drop"), "2026-01-05");

        let id = article_id("drop", "2026-01-05");
        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "keep");
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved_articles.json");

        let mut store = SavedStore::with_file(&path);
        store.toggle(&article("GPU prices fall"), "2026-01-05");

        let reloaded = SavedStore::load_from_file(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.list()[0].title, "GPU prices fall");
        assert!(reloaded.is_saved("GPU prices fall", "2026-01-05"));
    }

    #[test]
    fn corrupt_file_degrades_to_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved_articles.json");
        fs::write(&path, "not json").unwrap();

        let store = SavedStore::load_or_ephemeral(Some(&path));
        assert!(store.is_empty());
    }
}
