//! Free-tier daily usage limiting
//!
//! Usage is counted per client bucket (`ip:YYYY-MM-DD`, UTC). The store is
//! reached through [`UsageStore`] so the in-process map can be replaced by a
//! shared backend when the service runs on more than one instance.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Days, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Bucket shared by every client whose address cannot be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Remaining quota for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitStatus {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    pub used: u32,
}

impl LimitStatus {
    fn from_count(used: u32, limit: u32) -> Self {
        let remaining = limit.saturating_sub(used);
        Self {
            allowed: remaining > 0,
            remaining,
            limit,
            used,
        }
    }
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Reports the caller's quota without consuming any
    async fn check_limit(&self, client: &str) -> LimitStatus;

    /// Atomically checks the quota and, when a slot is left, takes it
    ///
    /// `allowed` tells whether the slot was taken; the other fields describe
    /// the bucket after the call.
    async fn try_reserve(&self, client: &str) -> LimitStatus;

    /// Hands back a slot taken by [`UsageStore::try_reserve`] whose request failed
    async fn release(&self, client: &str);
}

/// Process-local daily counters
///
/// Counters reset when the process restarts. Entries from the previous day
/// are swept on each reservation; older leftovers survive until restart.
/// Check and increment happen under one lock, so concurrent requests can
/// never take more slots than the limit.
pub struct InMemoryUsageStore {
    limit: u32,
    counts: Mutex<HashMap<String, u32>>,
}

impl InMemoryUsageStore {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn check_limit_on(&self, client: &str, date: NaiveDate) -> LimitStatus {
        let counts = self.counts.lock();
        let used = counts.get(&bucket_key(client, date)).copied().unwrap_or(0);
        LimitStatus::from_count(used, self.limit)
    }

    pub fn try_reserve_on(&self, client: &str, date: NaiveDate) -> LimitStatus {
        let mut counts = self.counts.lock();

        let key = bucket_key(client, date);
        let current = counts.get(&key).copied().unwrap_or(0);
        if current >= self.limit {
            return LimitStatus::from_count(current, self.limit);
        }

        counts.insert(key, current + 1);

        if let Some(yesterday) = date.checked_sub_days(Days::new(1)) {
            let suffix = format!(":{}", yesterday.format("%Y-%m-%d"));
            counts.retain(|key, _| !key.ends_with(&suffix));
        }

        LimitStatus {
            allowed: true,
            ..LimitStatus::from_count(current + 1, self.limit)
        }
    }

    /// Returns one slot to the bucket of `date`; a reservation that crosses
    /// midnight is returned to the new day, never below zero
    pub fn release_on(&self, client: &str, date: NaiveDate) {
        let mut counts = self.counts.lock();
        let key = bucket_key(client, date);
        let remaining = match counts.get_mut(&key) {
            Some(used) => {
                *used = used.saturating_sub(1);
                *used
            }
            None => return,
        };
        if remaining == 0 {
            counts.remove(&key);
        }
    }

    /// Number of tracked buckets
    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn check_limit(&self, client: &str) -> LimitStatus {
        self.check_limit_on(client, Utc::now().date_naive())
    }

    async fn try_reserve(&self, client: &str) -> LimitStatus {
        self.try_reserve_on(client, Utc::now().date_naive())
    }

    async fn release(&self, client: &str) {
        self.release_on(client, Utc::now().date_naive())
    }
}

fn bucket_key(client: &str, date: NaiveDate) -> String {
    format!("{}:{}", client, date.format("%Y-%m-%d"))
}

/// Resolves the caller's address from proxy headers, then the socket
///
/// Order: first `X-Forwarded-For` entry, `X-Real-IP`, peer address,
/// otherwise [`UNKNOWN_CLIENT`].
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Extractor yielding the caller's rate-limit identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(client_ip(&parts.headers, peer)))
    }
}
