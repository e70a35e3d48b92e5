use std::convert::Infallible;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::config::Config;

/// Header carrying a millisecond timestamp that replaces the wall clock, honored in test mode only.
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parse a millisecond Unix timestamp override.
///
/// Only finite, positive numbers are accepted; the fractional part is dropped.
pub fn parse_now_override(raw: &str) -> Option<DateTime<Utc>> {
    let millis: f64 = raw.trim().parse().ok()?;
    if !millis.is_finite() || millis <= 0.0 {
        return None;
    }
    // `as` saturates, out of range values are then rejected by chrono
    Utc.timestamp_millis_opt(millis.trunc() as i64).single()
}

/// The one instant used for every time comparison while serving a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTime(pub DateTime<Utc>);

#[async_trait]
impl<S> FromRequestParts<S> for RequestTime
where
    Config: FromRef<S>,
    SharedClock: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let now = SharedClock::from_ref(state).now();
        if !Config::from_ref(state).test_mode {
            return Ok(RequestTime(now));
        }

        let overridden = parts
            .headers
            .get(TEST_NOW_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_now_override);

        match overridden {
            Some(instant) => {
                debug!("using test clock override: {instant}");
                Ok(RequestTime(instant))
            }
            None => Ok(RequestTime(now)),
        }
    }
}
