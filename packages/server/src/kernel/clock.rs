//! Wall-clock implementation of [`BaseClock`].

use chrono::{DateTime, Utc};

use super::traits::BaseClock;

/// Production clock backed by `chrono::Utc::now()`.
pub struct SystemClock;

impl BaseClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
