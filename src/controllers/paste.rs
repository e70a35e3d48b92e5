use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{FieldError, ValidationErrors};
use crate::storage::PasteStore;
use crate::types::{ConsumeResult, GoneReason, NewPaste, PasteHandle, PasteView};

/// Validate and store a new paste.
///
/// Nothing is written unless every field is valid.
pub async fn create<S: PasteStore>(
    store: &S,
    base_url: &str,
    paste: NewPaste,
) -> crate::AppResult<PasteHandle> {
    validate(&paste)?;

    let paste = store.create(paste).await?;

    info!(
        "new paste: id='{id}', size={size}, ttl_seconds={ttl:?}, max_views={max:?}",
        id = paste.id,
        size = paste.content.len(),
        ttl = paste.ttl_seconds,
        max = paste.max_views,
    );

    Ok(PasteHandle {
        url: share_url(base_url, &paste.id),
        id: paste.id,
    })
}

/// Serve a paste and count the view, if it is still alive at `now`.
///
/// `now` is the only clock reading used; missing, used up and timed out pastes
/// all come back as [`ConsumeResult::Gone`].
pub async fn read_and_consume<S: PasteStore>(
    store: &S,
    id: &str,
    now: DateTime<Utc>,
) -> crate::AppResult<ConsumeResult> {
    validate_id(id)?;

    let Some(paste) = store.fetch(id).await? else {
        return Ok(gone(id, GoneReason::NotFound));
    };

    if let Some(reason) = paste.expiry_state(now) {
        return Ok(gone(id, reason));
    }

    // the store re-checks the budget, a concurrent reader may have taken the last view
    let Some(view_count) = store.consume_view(id).await? else {
        return Ok(gone(id, GoneReason::ViewsExhausted));
    };

    Ok(ConsumeResult::Alive(PasteView {
        expires_at: paste.expires_at(),
        remaining_views: paste.remaining_views(view_count),
        content: paste.content,
    }))
}

/// Remove every paste that can no longer be served.
pub async fn purge_expired<S: PasteStore>(store: &S, now: DateTime<Utc>) -> crate::AppResult<u64> {
    let count = store.purge_expired(now).await?;
    if count > 0 {
        info!("deleted {count} pastes");
    }
    Ok(count)
}

fn gone(id: &str, reason: GoneReason) -> ConsumeResult {
    debug!("paste '{id}' is gone: {reason}");
    ConsumeResult::Gone(reason)
}

fn validate(paste: &NewPaste) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if paste.content.is_empty() {
        errors.push(FieldError::new(
            "content",
            "content is required and must be a non-empty string",
        ));
    }
    if paste.ttl_seconds.is_some_and(|ttl| ttl < 1) {
        errors.push(FieldError::new("ttl_seconds", "must be at least 1"));
    }
    if paste.max_views.is_some_and(|max| max < 1) {
        errors.push(FieldError::new("max_views", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn validate_id(id: &str) -> Result<(), ValidationErrors> {
    Uuid::parse_str(id)
        .map(drop)
        .map_err(|_| FieldError::new("id", "not a valid paste id").into())
}

/// Path of the raw view a creator shares, see `commands::serve`.
pub fn share_path(id: &str) -> String {
    format!("/p/{id}")
}

fn share_url(base_url: &str, id: &str) -> String {
    format!(
        "{base}{path}",
        base = base_url.trim_end_matches('/'),
        path = share_path(id)
    )
}
