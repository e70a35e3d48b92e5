use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;

pub mod api;

#[derive(Debug, Clone, FromRow)]
pub struct Paste {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: Option<i64>,
    pub max_views: Option<i64>,
    pub view_count: i64,
}

impl Paste {
    /// The instant this paste stops being servable, if it has a time limit.
    ///
    /// Returns `None` when the limit lies beyond what a timestamp can represent,
    /// which is treated the same as having no time limit.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = self.ttl_seconds?;
        self.created_at
            .checked_add_signed(Duration::milliseconds(ttl.saturating_mul(1000)))
    }

    /// Evaluate both limits against a single clock reading.
    ///
    /// The view budget is checked before time, so an exhausted paste reports
    /// [`GoneReason::ViewsExhausted`] even if it has also timed out.
    pub fn expiry_state(&self, now: DateTime<Utc>) -> Option<GoneReason> {
        if let Some(max_views) = self.max_views {
            if self.view_count >= max_views {
                return Some(GoneReason::ViewsExhausted);
            }
        }

        if let Some(expires_at) = self.expires_at() {
            if now >= expires_at {
                return Some(GoneReason::TimeExpired);
            }
        }

        None
    }

    /// Reads left after `view_count` successful reads.
    pub fn remaining_views(&self, view_count: i64) -> Option<i64> {
        self.max_views
            .map(|max_views| max_views.saturating_sub(view_count).max(0))
    }
}

/// Creation input that has already passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaste {
    pub content: String,
    pub ttl_seconds: Option<i64>,
    pub max_views: Option<i64>,
}

/// What the creator gets back: the id and where to share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteHandle {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasteView {
    pub content: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub remaining_views: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeResult {
    Alive(PasteView),
    Gone(GoneReason),
}

#[cfg(test)]
impl ConsumeResult {
    pub fn is_alive(&self) -> bool {
        matches!(self, ConsumeResult::Alive(_))
    }
}

/// Why a paste is gone. Only ever used for logging; callers see a plain not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoneReason {
    NotFound,
    ViewsExhausted,
    TimeExpired,
}

impl std::fmt::Display for GoneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            GoneReason::NotFound => "not found",
            GoneReason::ViewsExhausted => "views exhausted",
            GoneReason::TimeExpired => "time expired",
        })
    }
}
