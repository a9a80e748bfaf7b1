use crate::core::config::StalenessPolicy;
use crate::core::currency::CurrencyCode;
use crate::core::rate::{CacheEntry, RateObservation, RateSource};
use crate::store::ObservationLog;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    last_success: Option<DateTime<Utc>>,
}

/// Latest rate per currency, refreshed from the rate source once stale.
///
/// Each currency has its own slot lock, held for the whole
/// check/fetch/append/store sequence, so concurrent callers never fetch or
/// log the same currency twice. Unrelated currencies refresh in parallel.
///
/// Stored entries are also published to `published`, which is only locked
/// briefly and never across a fetch, so snapshots never wait on upstream.
pub struct RateCacheService {
    source: Arc<dyn RateSource>,
    log: Arc<ObservationLog>,
    ttl: Duration,
    policy: StalenessPolicy,
    slots: HashMap<CurrencyCode, Mutex<Slot>>,
    published: RwLock<BTreeMap<CurrencyCode, CacheEntry>>,
    last_refresh: std::sync::Mutex<Option<DateTime<Utc>>>,
}

impl RateCacheService {
    pub fn new(
        source: Arc<dyn RateSource>,
        log: Arc<ObservationLog>,
        ttl: Duration,
        policy: StalenessPolicy,
    ) -> Self {
        let slots = CurrencyCode::ALL
            .into_iter()
            .map(|code| (code, Mutex::new(Slot::default())))
            .collect();
        Self {
            source,
            log,
            ttl,
            policy,
            slots,
            published: RwLock::new(BTreeMap::new()),
            last_refresh: std::sync::Mutex::new(None),
        }
    }

    pub fn log(&self) -> &ObservationLog {
        &self.log
    }

    /// Time of the last successful fetch for any currency.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn get_or_refresh(&self, currency: CurrencyCode, now: DateTime<Utc>) -> CacheEntry {
        let mut slot = self.slot(currency).lock().await;

        if let Some(entry) = &slot.entry {
            if !self.is_stale(&slot, now) {
                debug!(%currency, "Cache HIT");
                return entry.clone();
            }
        }

        debug!(%currency, "Refreshing rate");
        let entry = match self.source.fetch(currency).await {
            Ok(quote) => {
                let obs = RateObservation::from_quote(now, currency, quote);
                if let Err(e) = self.log.append(&obs) {
                    warn!(%currency, error = %e, "Failed to append observation, cache still updated");
                }
                slot.last_success = Some(now);
                self.advance_clock(now);
                info!(%currency, rate = obs.visa_rate, markup = obs.markup_percent, "Fetched rate");
                CacheEntry::Rate(obs)
            }
            Err(e) => {
                warn!(%currency, error = %e, "Rate fetch failed");
                CacheEntry::error(e.to_string())
            }
        };
        slot.entry = Some(entry.clone());
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(currency, entry.clone());
        entry
    }

    /// Refreshes every currency concurrently, preserving the given order.
    pub async fn refresh_all(
        &self,
        currencies: &[CurrencyCode],
        now: DateTime<Utc>,
    ) -> Vec<(CurrencyCode, CacheEntry)> {
        self.refresh_all_with_progress(currencies, now, &|_| ()).await
    }

    /// Like [`refresh_all`](Self::refresh_all), calling `on_done` as each
    /// currency completes.
    pub async fn refresh_all_with_progress(
        &self,
        currencies: &[CurrencyCode],
        now: DateTime<Utc>,
        on_done: &(dyn Fn(CurrencyCode) + Send + Sync),
    ) -> Vec<(CurrencyCode, CacheEntry)> {
        let futures = currencies.iter().map(|&code| async move {
            let entry = self.get_or_refresh(code, now).await;
            on_done(code);
            (code, entry)
        });
        join_all(futures).await
    }

    /// Current entries of all currencies that have one.
    ///
    /// Does not wait for in-flight fetches; a currency being refreshed shows
    /// its previous entry, if any.
    pub fn snapshot(&self) -> BTreeMap<CurrencyCode, CacheEntry> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn slot(&self, currency: CurrencyCode) -> &Mutex<Slot> {
        // Slots are created for every code up front
        &self.slots[&currency]
    }

    fn is_stale(&self, slot: &Slot, now: DateTime<Utc>) -> bool {
        let reference = match self.policy {
            StalenessPolicy::Shared => self.last_refresh(),
            StalenessPolicy::PerCurrency => slot.last_success,
        };
        match reference {
            None => true,
            Some(at) => (now - at).to_std().is_ok_and(|age| age > self.ttl),
        }
    }

    fn advance_clock(&self, now: DateTime<Utc>) {
        let mut clock = self
            .last_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *clock = Some(clock.map_or(now, |prev| prev.max(now)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{FxError, Result};
    use crate::core::rate::RateQuote;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{TempDir, tempdir};

    fn hours(n: i64) -> chrono::TimeDelta {
        chrono::TimeDelta::hours(n)
    }

    struct MockRateSource {
        call_count: AtomicUsize,
        calls: std::sync::Mutex<Vec<CurrencyCode>>,
        failing: HashSet<CurrencyCode>,
        hanging: HashSet<CurrencyCode>,
        delay: Option<Duration>,
    }

    impl MockRateSource {
        fn new() -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                calls: std::sync::Mutex::new(Vec::new()),
                failing: HashSet::new(),
                hanging: HashSet::new(),
                delay: None,
            }
        }

        fn failing(mut self, code: CurrencyCode) -> Self {
            self.failing.insert(code);
            self
        }

        /// Requests for `code` never complete.
        fn hanging(mut self, code: CurrencyCode) -> Self {
            self.hanging.insert(code);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn calls_for(&self, code: CurrencyCode) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| **c == code).count()
        }
    }

    #[async_trait]
    impl RateSource for MockRateSource {
        async fn fetch(&self, currency: CurrencyCode) -> Result<RateQuote> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(currency);
            if self.hanging.contains(&currency) {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&currency) {
                return Err(FxError::Network(format!(
                    "HTTP error: 500 Internal Server Error for currency: {currency}"
                )));
            }
            Ok(RateQuote {
                visa_rate: 1.5,
                currency_name: format!("{currency} name"),
                benchmark_rate: 1.49,
                markup_fraction: 0.0067,
            })
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn service(
        source: Arc<MockRateSource>,
        policy: StalenessPolicy,
    ) -> (RateCacheService, TempDir) {
        let dir = tempdir().unwrap();
        let log = Arc::new(ObservationLog::new(dir.path().join("fx_log.csv")));
        let svc = RateCacheService::new(source, log, Duration::from_secs(3 * 60 * 60), policy);
        (svc, dir)
    }

    #[tokio::test]
    async fn test_ttl_scenario() {
        let source = Arc::new(MockRateSource::new());
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);

        let first = cache.get_or_refresh(CurrencyCode::Jpy, t0()).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.last_refresh(), Some(t0()));
        assert_eq!(first.observation().unwrap().timestamp, t0().naive_utc());

        let second = cache.get_or_refresh(CurrencyCode::Jpy, t0() + hours(1)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(second, first);

        let third = cache.get_or_refresh(CurrencyCode::Jpy, t0() + hours(4)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.last_refresh(), Some(t0() + hours(4)));
        assert_ne!(third, first);

        assert_eq!(cache.log().read_all().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_first_call_fetches_regardless_of_clock() {
        let source = Arc::new(MockRateSource::new());
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);

        cache.get_or_refresh(CurrencyCode::Jpy, t0()).await;
        // The clock is fresh, but EUR has never been fetched
        cache.get_or_refresh(CurrencyCode::Eur, t0() + hours(1)).await;
        assert_eq!(source.calls_for(CurrencyCode::Eur), 1);
        assert_eq!(cache.last_refresh(), Some(t0() + hours(1)));
    }

    #[tokio::test]
    async fn test_ttl_boundary_is_not_stale() {
        let source = Arc::new(MockRateSource::new());
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);

        cache.get_or_refresh(CurrencyCode::Gbp, t0()).await;
        cache.get_or_refresh(CurrencyCode::Gbp, t0() + hours(3)).await;
        assert_eq!(source.calls(), 1);

        cache
            .get_or_refresh(CurrencyCode::Gbp, t0() + hours(3) + chrono::TimeDelta::seconds(1))
            .await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_shared_clock_is_reset_by_any_currency() {
        let source = Arc::new(MockRateSource::new());
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);

        cache.get_or_refresh(CurrencyCode::Jpy, t0()).await;
        cache.get_or_refresh(CurrencyCode::Eur, t0() + hours(2)).await;

        // JPY is older than the TTL, but EUR reset the shared clock
        cache.get_or_refresh(CurrencyCode::Jpy, t0() + hours(4)).await;
        assert_eq!(source.calls_for(CurrencyCode::Jpy), 1);
    }

    #[tokio::test]
    async fn test_per_currency_clock() {
        let source = Arc::new(MockRateSource::new());
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::PerCurrency);

        cache.get_or_refresh(CurrencyCode::Jpy, t0()).await;
        cache.get_or_refresh(CurrencyCode::Eur, t0() + hours(2)).await;

        cache.get_or_refresh(CurrencyCode::Jpy, t0() + hours(4)).await;
        cache.get_or_refresh(CurrencyCode::Eur, t0() + hours(4)).await;
        assert_eq!(source.calls_for(CurrencyCode::Jpy), 2);
        assert_eq!(source.calls_for(CurrencyCode::Eur), 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_currency() {
        let source = Arc::new(MockRateSource::new().failing(CurrencyCode::Eur));
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);

        let results = cache
            .refresh_all(&[CurrencyCode::Jpy, CurrencyCode::Eur, CurrencyCode::Gbp], t0())
            .await;

        let codes: Vec<_> = results.iter().map(|(c, _)| *c).collect();
        assert_eq!(codes, vec![CurrencyCode::Jpy, CurrencyCode::Eur, CurrencyCode::Gbp]);
        assert!(results[0].1.observation().is_some());
        assert!(results[1].1.is_error());
        assert!(results[2].1.observation().is_some());

        let logged = cache.log().read_all().unwrap();
        assert_eq!(logged.len(), 2);
        assert!(logged.iter().all(|o| o.currency != CurrencyCode::Eur));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 3);
        match &snapshot[&CurrencyCode::Eur] {
            CacheEntry::Error { error } => assert!(error.contains("HTTP error: 500")),
            other => panic!("Expected an error entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_leaves_clock_untouched() {
        let source = Arc::new(MockRateSource::new().failing(CurrencyCode::Eur));
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);

        cache.get_or_refresh(CurrencyCode::Eur, t0()).await;
        assert_eq!(cache.last_refresh(), None);

        // No successful fetch yet, so the error entry is retried
        cache.get_or_refresh(CurrencyCode::Eur, t0() + chrono::TimeDelta::minutes(1)).await;
        assert_eq!(source.calls(), 2);

        cache.get_or_refresh(CurrencyCode::Jpy, t0() + hours(1)).await;
        assert_eq!(cache.last_refresh(), Some(t0() + hours(1)));

        // Clock is fresh now, so the stale error entry is served as is
        let entry = cache.get_or_refresh(CurrencyCode::Eur, t0() + hours(2)).await;
        assert!(entry.is_error());
        assert_eq!(source.calls_for(CurrencyCode::Eur), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_fetch_once() {
        let source =
            Arc::new(MockRateSource::new().with_delay(Duration::from_millis(50)));
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);

        let (a, b) = tokio::join!(
            cache.get_or_refresh(CurrencyCode::Thb, t0()),
            cache.get_or_refresh(CurrencyCode::Thb, t0()),
        );

        assert_eq!(a, b);
        assert_eq!(source.calls(), 1);
        assert_eq!(cache.log().read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_roll_back_cache() {
        let source = Arc::new(MockRateSource::new());
        let dir = tempdir().unwrap();
        // A directory cannot be opened for appending
        let log = Arc::new(ObservationLog::new(dir.path()));
        let cache = RateCacheService::new(
            Arc::clone(&source) as Arc<dyn RateSource>,
            log,
            Duration::from_secs(3 * 60 * 60),
            StalenessPolicy::Shared,
        );

        let entry = cache.get_or_refresh(CurrencyCode::Cad, t0()).await;
        assert!(entry.observation().is_some());
        assert_eq!(cache.last_refresh(), Some(t0()));
        assert_eq!(cache.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_does_not_wait_for_hung_fetch() {
        let source = Arc::new(MockRateSource::new().hanging(CurrencyCode::Jpy));
        let (cache, _dir) = service(Arc::clone(&source), StalenessPolicy::Shared);
        let cache = Arc::new(cache);

        cache.get_or_refresh(CurrencyCode::Eur, t0()).await;

        let stuck = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get_or_refresh(CurrencyCode::Jpy, t0()).await }
        });
        while source.calls_for(CurrencyCode::Jpy) == 0 {
            tokio::task::yield_now().await;
        }

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[&CurrencyCode::Eur].observation().is_some());

        // Other currencies are not held up either
        let eur = tokio::time::timeout(
            Duration::from_secs(2),
            cache.get_or_refresh(CurrencyCode::Eur, t0() + hours(1)),
        )
        .await
        .expect("EUR lookup blocked behind the JPY fetch");
        assert!(eur.observation().is_some());

        assert!(!stuck.is_finished());
        stuck.abort();
    }
}
