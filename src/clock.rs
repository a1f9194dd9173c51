//! Time source and per-owner timezone resolution.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Timezone used when neither the owner nor the config names one.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tbilisi";

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Parse an RFC 3339 timestamp.
    pub fn at(rfc3339: &str) -> Result<Self> {
        let now = DateTime::parse_from_rfc3339(rfc3339)?.with_timezone(&Utc);
        Ok(Self::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An instant paired with its owner-local rendering.
#[derive(Debug, Clone, Copy)]
pub struct Moment {
    pub utc: DateTime<Utc>,
    pub local: DateTime<Tz>,
}

impl Moment {
    pub fn new(utc: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            utc,
            local: utc.with_timezone(&tz),
        }
    }

    /// Epoch milliseconds.
    pub fn ms(&self) -> i64 {
        self.utc.timestamp_millis()
    }

    /// Owner-local calendar date.
    pub fn today(&self) -> NaiveDate {
        self.local.date_naive()
    }
}

/// Resolves the IANA timezone of each owner.
#[derive(Debug, Clone)]
pub struct Timezones {
    default: Tz,
    owners: HashMap<String, Tz>,
}

impl Default for Timezones {
    fn default() -> Self {
        Self {
            default: chrono_tz::Asia::Tbilisi,
            owners: HashMap::new(),
        }
    }
}

impl Timezones {
    pub fn new(default: Tz) -> Self {
        Self {
            default,
            owners: HashMap::new(),
        }
    }

    /// Build from zone names, rejecting unknown ones.
    pub fn from_names<'a>(
        default: &str,
        owners: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let mut zones = Self::new(parse_timezone(default)?);
        for (owner, name) in owners {
            zones.owners.insert(owner.to_string(), parse_timezone(name)?);
        }
        Ok(zones)
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>, tz: Tz) -> Self {
        self.owners.insert(owner_id.into(), tz);
        self
    }

    pub fn default_zone(&self) -> Tz {
        self.default
    }

    pub fn for_owner(&self, owner_id: &str) -> Tz {
        self.owners.get(owner_id).copied().unwrap_or(self.default)
    }
}

/// Parse an IANA zone name such as `Europe/Berlin`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| anyhow!("Invalid timezone '{}': {}", name, e))
}
