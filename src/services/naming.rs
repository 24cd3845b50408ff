use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces the disambiguating part of a stored upload's name.
///
/// The final name is `<field>-<disambiguator><.ext>`; swapping the strategy changes
/// collision behaviour without touching callers.
pub trait NamingStrategy: Send + Sync {
    fn disambiguator(&self) -> String;

    fn file_name(&self, field_name: &str, extension: &str) -> String {
        format!("{}-{}{}", field_name, self.disambiguator(), extension)
    }
}

/// Unix milliseconds. Two uploads of the same field within one millisecond collide;
/// the create-new open in storage turns that into a `Conflict` instead of an overwrite.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampNaming;

impl NamingStrategy for TimestampNaming {
    fn disambiguator(&self) -> String {
        Utc::now().timestamp_millis().to_string()
    }
}

/// Unix milliseconds plus a process-wide monotonic counter.
#[derive(Debug, Default)]
pub struct CounterNaming {
    next: AtomicU64,
}

impl CounterNaming {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NamingStrategy for CounterNaming {
    fn disambiguator(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", Utc::now().timestamp_millis(), n)
    }
}
