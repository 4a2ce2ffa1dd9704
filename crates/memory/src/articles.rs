//! Article stores: in-memory, and a file-backed snapshot for the gateway.
//!
//! Both share the same editing rules. The file store rewrites the whole
//! article list after every change and only commits the change in memory
//! once the snapshot is on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use lumen_core::article::{Article, ArticleStore, ArticleSummary};
use lumen_core::error::ArticleError;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::file_backend::replace_file;

/// Fixed key the article snapshot is stored under.
pub const ARTICLES_KEY: &str = "lumen-articles.json";

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "article".into()
    } else {
        slug.to_string()
    }
}

// --- Editing rules shared by both stores ---

fn summaries(articles: &[Article]) -> Vec<ArticleSummary> {
    let mut summaries: Vec<ArticleSummary> = articles.iter().map(ArticleSummary::from).collect();
    // Stable sort keeps insertion order among equal timestamps, so reverse first.
    summaries.reverse();
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    summaries
}

fn find(articles: &[Article], slug: &str) -> Result<Article, ArticleError> {
    articles
        .iter()
        .find(|a| a.slug == slug)
        .cloned()
        .ok_or(ArticleError::NotFound)
}

fn insert_new(
    articles: &mut Vec<Article>,
    title: &str,
    content: &str,
) -> Result<Article, ArticleError> {
    let slug = slugify(title);
    if articles.iter().any(|a| a.slug == slug) {
        return Err(ArticleError::Conflict);
    }

    let now = Utc::now();
    let article = Article {
        slug,
        title: title.to_string(),
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    };
    articles.push(article.clone());
    Ok(article)
}

fn apply_update(
    articles: &mut Vec<Article>,
    slug: &str,
    title: &str,
    content: &str,
) -> Result<Article, ArticleError> {
    let index = articles
        .iter()
        .position(|a| a.slug == slug)
        .ok_or(ArticleError::NotFound)?;

    if slugify(title) != slug {
        let created = insert_new(articles, title, content)?;
        articles.retain(|a| a.slug != slug);
        return Ok(created);
    }

    let article = &mut articles[index];
    article.title = title.to_string();
    article.content = content.to_string();
    article.updated_at = Utc::now();
    Ok(article.clone())
}

fn remove(articles: &mut Vec<Article>, slug: &str) -> Result<(), ArticleError> {
    let before = articles.len();
    articles.retain(|a| a.slug != slug);
    if articles.len() == before {
        return Err(ArticleError::NotFound);
    }
    Ok(())
}

// --- In-memory ---

pub struct InMemoryArticleStore {
    articles: RwLock<Vec<Article>>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self {
            articles: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryArticleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn list(&self) -> Result<Vec<ArticleSummary>, ArticleError> {
        Ok(summaries(&self.articles.read().await))
    }

    async fn get(&self, slug: &str) -> Result<Article, ArticleError> {
        find(&self.articles.read().await, slug)
    }

    async fn create(&self, title: &str, content: &str) -> Result<Article, ArticleError> {
        insert_new(&mut *self.articles.write().await, title, content)
    }

    async fn update(
        &self,
        slug: &str,
        title: &str,
        content: &str,
    ) -> Result<Article, ArticleError> {
        apply_update(&mut *self.articles.write().await, slug, title, content)
    }

    async fn delete(&self, slug: &str) -> Result<(), ArticleError> {
        remove(&mut *self.articles.write().await, slug)
    }
}

// --- File-backed ---

/// Articles kept as one JSON snapshot under `ARTICLES_KEY`.
///
/// Unlike transcripts, an unreadable snapshot is an error: discarding it
/// would silently lose published articles.
pub struct FileArticleStore {
    path: PathBuf,
    articles: RwLock<Vec<Article>>,
}

impl FileArticleStore {
    /// Load the snapshot in `dir`, starting empty if there is none yet.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ArticleError> {
        let path = dir.as_ref().join(ARTICLES_KEY);
        let articles: Vec<Article> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ArticleError::Storage(format!("unreadable snapshot {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                let message = format!("reading {}: {e}", path.display());
                return Err(ArticleError::Storage(message));
            }
        };

        info!(path = %path.display(), articles = articles.len(), "Article store opened");
        Ok(Self {
            path,
            articles: RwLock::new(articles),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `edit` to a copy, persist it, then commit it in memory.
    async fn edit<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Article>) -> Result<T, ArticleError>,
    ) -> Result<T, ArticleError> {
        let mut articles = self.articles.write().await;
        let mut next = articles.clone();
        let out = edit(&mut next)?;

        self.persist(&next)?;
        *articles = next;
        Ok(out)
    }

    fn persist(&self, articles: &[Article]) -> Result<(), ArticleError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ArticleError::Storage(format!("creating the articles directory: {e}"))
            })?;
        }
        let content = serde_json::to_string_pretty(articles)
            .map_err(|e| ArticleError::Storage(e.to_string()))?;
        replace_file(&self.path, &content).map_err(|e| ArticleError::Storage(e.to_string()))?;

        debug!(path = %self.path.display(), articles = articles.len(), "Articles saved");
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for FileArticleStore {
    async fn list(&self) -> Result<Vec<ArticleSummary>, ArticleError> {
        Ok(summaries(&self.articles.read().await))
    }

    async fn get(&self, slug: &str) -> Result<Article, ArticleError> {
        find(&self.articles.read().await, slug)
    }

    async fn create(&self, title: &str, content: &str) -> Result<Article, ArticleError> {
        self.edit(|articles| insert_new(articles, title, content)).await
    }

    async fn update(
        &self,
        slug: &str,
        title: &str,
        content: &str,
    ) -> Result<Article, ArticleError> {
        self.edit(|articles| apply_update(articles, slug, title, content)).await
    }

    async fn delete(&self, slug: &str) -> Result<(), ArticleError> {
        self.edit(|articles| remove(articles, slug)).await
    }
}
