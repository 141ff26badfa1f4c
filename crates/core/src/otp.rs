//! One-time password issuance and validation for the password reset flow.
//!
//! A user moves through `NONE -> ISSUED -> (CONSUMED | EXPIRED)`. The code and
//! its issue time live on the user row; [`OtpCache`] mirrors the code in
//! process with a shorter TTL so a reset can be looked up by email alone.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::TimeDelta;
use lru::LruCache;
use rand::Rng;

use crate::types::Timestamp;

/// How long an issued code stays valid on the user row.
pub const OTP_VALIDITY_MINS: i64 = 15;

/// Default TTL for the in-process mirror.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default number of outstanding codes kept in process.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

const OTP_MIN: u32 = 100_000;
const OTP_MAX: u32 = 999_999;

/// Generate a uniformly random six digit code.
pub fn generate_otp() -> String {
    rand::rng().random_range(OTP_MIN..=OTP_MAX).to_string()
}

/// Lifecycle state of a user's code at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    None,
    Issued,
    Expired,
}

/// Outcome of checking a candidate code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Mismatch,
    Expired,
    NotIssued,
}

impl OtpCheck {
    pub fn is_valid(self) -> bool {
        self == OtpCheck::Valid
    }
}

pub fn otp_state(code: Option<&str>, issued_at: Option<Timestamp>, now: Timestamp) -> OtpState {
    match (code, issued_at) {
        (Some(_), Some(issued)) if now <= issued + TimeDelta::minutes(OTP_VALIDITY_MINS) => {
            OtpState::Issued
        }
        (Some(_), Some(_)) => OtpState::Expired,
        _ => OtpState::None,
    }
}

/// Compare `candidate` with the stored code. The window is inclusive: a code
/// checked exactly fifteen minutes after issue still passes.
pub fn check_otp(
    stored: Option<&str>,
    issued_at: Option<Timestamp>,
    candidate: &str,
    now: Timestamp,
) -> OtpCheck {
    let Some(code) = stored else {
        return OtpCheck::NotIssued;
    };
    match otp_state(stored, issued_at, now) {
        OtpState::None => OtpCheck::NotIssued,
        _ if code != candidate.trim() => OtpCheck::Mismatch,
        OtpState::Expired => OtpCheck::Expired,
        OtpState::Issued => OtpCheck::Valid,
    }
}

// ---------------------------------------------------------------------------
// In-process cache
// ---------------------------------------------------------------------------

struct CacheEntry {
    code: String,
    inserted_at: Instant,
}

/// LRU-bounded code cache keyed by `otp_{email}`. Expired entries are dropped
/// when read.
pub struct OtpCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl OtpCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn key(email: &str) -> String {
        format!("otp_{}", email.trim().to_lowercase())
    }

    pub fn store(&self, email: &str, code: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                Self::key(email),
                CacheEntry {
                    code: code.to_string(),
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Returns `None` if nothing is cached or the entry has expired.
    pub fn get(&self, email: &str) -> Option<String> {
        let key = Self::key(email);
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.code.clone());
            }
            cache.pop(&key);
        }
        None
    }

    pub fn clear(&self, email: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&Self::key(email));
        }
    }
}

impl Default for OtpCache {
    fn default() -> Self {
        Self::new(
            DEFAULT_CACHE_CAPACITY,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
