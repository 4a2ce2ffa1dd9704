//! Article collaborator: the editorial content served next to the chat.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ArticleError;

/// A full article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An article without its body, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub slug: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}

/// Storage for articles.
///
/// `create` rejects a title whose slug already exists with
/// [`ArticleError::Conflict`]; `update` and `delete` reject unknown slugs
/// with [`ArticleError::NotFound`].
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Summaries, newest first.
    async fn list(&self) -> Result<Vec<ArticleSummary>, ArticleError>;

    async fn get(&self, slug: &str) -> Result<Article, ArticleError>;

    async fn create(&self, title: &str, content: &str) -> Result<Article, ArticleError>;

    async fn update(&self, slug: &str, title: &str, content: &str)
    -> Result<Article, ArticleError>;

    async fn delete(&self, slug: &str) -> Result<(), ArticleError>;
}
