use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{DocumentId, LineageId};

pub const MAX_TITLE_CHARS: usize = 200;
pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_COLOR: &str = "#d8b4fe";

/// A stored, dated notebook entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub lineage_id: Option<LineageId>,
    pub title: String,
    pub content: String,
    pub color: String,
    pub target_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// The day this document stands for: its target date, or the day it was
    /// created when it was never assigned one.
    pub fn effective_date(&self) -> NaiveDate {
        self.target_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }

    pub fn is_grouped(&self) -> bool {
        self.lineage_id.is_some()
    }
}

/// Fields for a document insert. Identity and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub lineage_id: Option<LineageId>,
    pub title: String,
    pub content: String,
    pub color: String,
    pub target_date: Option<NaiveDate>,
}

impl NewDocument {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.title)?;
        validate_color(&self.color)
    }
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub target_date: Option<NaiveDate>,
    /// Only honored when the stored document has no lineage yet.
    pub lineage_id: Option<LineageId>,
}

impl DocumentPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    pub fn target_date(date: NaiveDate) -> Self {
        Self {
            target_date: Some(date),
            ..Self::default()
        }
    }

    pub fn lineage(lineage_id: LineageId) -> Self {
        Self {
            lineage_id: Some(lineage_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.color.is_none()
            && self.target_date.is_none()
            && self.lineage_id.is_none()
    }

    /// Title and color are shared by a whole lineage. Content, dates and the
    /// lineage id are per entry.
    pub fn is_appearance_only(&self) -> bool {
        self.content.is_none() && self.target_date.is_none() && self.lineage_id.is_none()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(color) = &self.color {
            validate_color(color)?;
        }
        Ok(())
    }
}

pub fn validate_title(title: &str) -> Result<(), CoreError> {
    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(CoreError::Validation(format!(
            "title is {len} characters (max {MAX_TITLE_CHARS})"
        )));
    }
    Ok(())
}

/// Colors are CSS hex literals: `#rgb` or `#rrggbb`.
pub fn validate_color(color: &str) -> Result<(), CoreError> {
    let digits = color
        .strip_prefix('#')
        .ok_or_else(|| CoreError::Validation(format!("color {color:?} must start with '#'")))?;
    if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::Validation(format!(
            "color {color:?} is not a #rgb or #rrggbb literal"
        )));
    }
    Ok(())
}

/// Parse an ISO `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| CoreError::InvalidData(format!("bad date {raw:?}: {e}")))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
