use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_IMAGE_TITLE: &str = "Untitled";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Image {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Micropost {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image row about to be inserted; the id is assigned by SQLite.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub title: String,
    pub image_url: String,
}

impl NewImage {
    /// Builds the payload, falling back to [`DEFAULT_IMAGE_TITLE`] for a blank title.
    pub fn new(title: Option<String>, image_url: impl Into<String>) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE_TITLE.to_string());
        Self {
            title,
            image_url: image_url.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewMicropost {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_falls_back_to_untitled() {
        assert_eq!(NewImage::new(None, "/upload/a.png").title, "Untitled");
        assert_eq!(
            NewImage::new(Some("   ".into()), "/upload/a.png").title,
            "Untitled"
        );
        assert_eq!(NewImage::new(Some("cat".into()), "/upload/a.png").title, "cat");
    }

    #[test]
    fn title_is_stored_as_given() {
        assert_eq!(
            NewImage::new(Some("  cat  ".into()), "/upload/a.png").title,
            "  cat  "
        );
    }
}
