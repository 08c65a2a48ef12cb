use slog::{debug, Logger};
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::{Error, Session, Zone};

/// Zone pages with one expiry deadline shared by every entry.
///
/// Once the deadline passes the whole cache is dropped, so a page fetched
/// moments before the deadline does not outlive it.
#[derive(Debug)]
pub struct PageCache {
    valid_until: OffsetDateTime,
    refresh_interval: Duration,
    entries: HashMap<Zone, String>,
}

impl PageCache {
    pub fn new(refresh_interval: Duration, valid_until: OffsetDateTime) -> Self {
        Self {
            valid_until,
            refresh_interval,
            entries: HashMap::new(),
        }
    }

    /// Clears every entry when `now` has reached the deadline. Returns true if it did.
    pub fn expire(&mut self, now: OffsetDateTime) -> bool {
        if now < self.valid_until {
            return false;
        }
        self.entries.clear();
        self.valid_until = now + self.refresh_interval;
        true
    }

    pub fn get(&self, zone: Zone) -> Option<&String> {
        self.entries.get(&zone)
    }

    pub fn insert(&mut self, zone: Zone, body: String) {
        self.entries.insert(zone, body);
    }

    pub fn valid_until(&self) -> OffsetDateTime {
        self.valid_until
    }

    /// Drops every entry without moving the deadline.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct PageFetcher {
    logger: Logger,
    base_url: String,
    cache: Mutex<PageCache>,
}

impl PageFetcher {
    pub fn new(logger: Logger, base_url: String, refresh_interval: Duration) -> Self {
        Self::with_cache(
            logger,
            base_url,
            PageCache::new(refresh_interval, OffsetDateTime::now_utc()),
        )
    }

    pub fn with_cache(logger: Logger, base_url: String, cache: PageCache) -> Self {
        Self {
            logger,
            base_url,
            cache: Mutex::new(cache),
        }
    }

    pub async fn fetch(&self, session: &Session, zone: Zone) -> Result<String, Error> {
        self.fetch_at(session, zone, OffsetDateTime::now_utc()).await
    }

    /// Cached page body for `zone` as seen at `now`.
    ///
    /// The lock is held across the request so the expire/lookup/insert
    /// sequence cannot interleave with another caller.
    pub async fn fetch_at(
        &self,
        session: &Session,
        zone: Zone,
        now: OffsetDateTime,
    ) -> Result<String, Error> {
        let mut cache = self.cache.lock().await;
        if cache.expire(now) {
            debug!(self.logger, "page cache cleared, valid until {}", cache.valid_until());
        }

        if let Some(body) = cache.get(zone) {
            debug!(self.logger, "cache hit"; "zone" => %zone);
            return Ok(body.clone());
        }

        let url = zone.page_url(&self.base_url);
        debug!(self.logger, "requesting: {}", url);
        let page = session.transport().get(&url).await?;
        if !page.is_success() {
            return Err(Error::HttpStatus {
                url,
                status: page.status,
            });
        }

        cache.insert(zone, page.body.clone());
        Ok(page.body)
    }

    /// Forgets every cached page, e.g. after the session was lost and the
    /// cached bodies may be the portal's login page.
    pub async fn clear(&self) {
        let mut cache = self.cache.lock().await;
        debug!(self.logger, "page cache dropped: {} pages", cache.len());
        cache.clear();
    }

    pub async fn cached_pages(&self) -> usize {
        self.cache.lock().await.len()
    }
}
