use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use raccolta_core::{
    CacheEntry, CacheError, CachePort, Clock, CollectionEvent, FetchCause, FetchError, FetchPort, FileCache,
    FreshnessWindow, ManualClock, MemoryCache, NormalizedSchedule, ProviderMeta, RawPayload,
    ScheduleService, SnapshotSource, UnavailableCause, WasteTypeCode, ZoneId, ZoneReport,
    tomorrow_view,
};
use tempfile::TempDir;

const ORGANIC_TOMORROW: &str = r#"{"data": [
    {"id": "3704", "title": "Organico", "collections": ["2025-10-02 06:00:00", "2025-10-09 06:00:00"]}
]}"#;

const PAPER_NEXT_WEEK: &str = r#"{"data": [
    {"id": "3581", "title": "Carta", "collections": ["2025-10-08 06:00:00"]}
]}"#;

struct ScriptedFetcher {
    meta: ProviderMeta,
    replies: Mutex<VecDeque<Result<RawPayload, FetchError>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedFetcher {
    fn new(replies: Vec<Result<RawPayload, FetchError>>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    fn with_delay(replies: Vec<Result<RawPayload, FetchError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            meta: ProviderMeta {
                id: String::from("scripted"),
                name: String::from("Scripted"),
            },
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchPort for ScriptedFetcher {
    fn provider(&self) -> &ProviderMeta {
        &self.meta
    }

    async fn fetch(&self, _zone: &ZoneId) -> Result<RawPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or(Err(FetchError::Network(String::from("no scripted reply"))))
    }
}

fn start() -> DateTime<Utc> {
    "2025-10-01T08:00:00Z".parse().expect("timestamp")
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, day).expect("date")
}

fn zone() -> ZoneId {
    ZoneId::from("3631")
}

fn cached_entry(stored_at: DateTime<Utc>) -> CacheEntry {
    cached_entry_for(&zone(), stored_at)
}

fn cached_entry_for(zone: &ZoneId, stored_at: DateTime<Utc>) -> CacheEntry {
    CacheEntry {
        zone: zone.clone(),
        schedule: NormalizedSchedule {
            zone: zone.clone(),
            fetched_at: stored_at,
            events: vec![CollectionEvent {
                waste_type: WasteTypeCode::from("3710"),
                title: String::from("Vetro"),
                date: date(2),
            }],
        },
        stored_at,
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    cache: Arc<MemoryCache>,
    fetcher: Arc<ScriptedFetcher>,
    service: ScheduleService,
}

fn harness(replies: Vec<Result<RawPayload, FetchError>>) -> Harness {
    let clock = Arc::new(ManualClock::new(start()));
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    let fetcher = ScriptedFetcher::new(replies);
    let service = ScheduleService::new(fetcher.clone(), cache.clone(), clock.clone());
    Harness {
        clock,
        cache,
        fetcher,
        service,
    }
}

#[tokio::test]
async fn cold_cache_fetches_and_caches() {
    let h = harness(vec![Ok(RawPayload::from(ORGANIC_TOMORROW))]);

    let snapshot = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("schedule");

    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(snapshot.source, SnapshotSource::Fetched);
    assert_eq!(snapshot.last_update, start());

    let view = tomorrow_view(&snapshot.schedule, h.clock.today());
    assert_eq!(view.count, 1);
    assert_eq!(view.waste_types, BTreeSet::from([WasteTypeCode::from("3704")]));

    let stored = h.cache.get(&zone()).expect("cached");
    assert_eq!(stored.schedule, snapshot.schedule);
}

#[tokio::test]
async fn fresh_entry_skips_network() {
    let h = harness(vec![Ok(RawPayload::from(PAPER_NEXT_WEEK))]);
    h.cache.seed(cached_entry(start() - TimeDelta::hours(23)));

    let snapshot = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("schedule");

    assert_eq!(h.fetcher.calls(), 0);
    assert_eq!(snapshot.source, SnapshotSource::Cache);
    assert_eq!(snapshot.last_update, start() - TimeDelta::hours(23));
}

#[tokio::test]
async fn stale_entry_is_replaced_on_success() {
    let h = harness(vec![Ok(RawPayload::from(PAPER_NEXT_WEEK))]);
    h.cache.seed(cached_entry(start() - TimeDelta::hours(25)));

    let snapshot = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("schedule");

    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(snapshot.source, SnapshotSource::Fetched);
    let stored = h.cache.get(&zone()).expect("cached");
    assert_eq!(stored.stored_at, start());
    let codes: Vec<&str> = stored
        .schedule
        .events
        .iter()
        .map(|event| event.waste_type.0.as_str())
        .collect();
    assert_eq!(codes, vec!["3581"]);
}

#[tokio::test]
async fn timeout_serves_stale_entry_with_its_stored_timestamp() {
    let h = harness(vec![Err(FetchError::Timeout)]);
    let stored_at = start() - TimeDelta::hours(30);
    h.cache.seed(cached_entry(stored_at));

    let snapshot = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("stale fallback");

    assert_eq!(h.fetcher.calls(), 1);
    assert!(snapshot.is_fallback());
    assert_eq!(snapshot.last_update, stored_at);
    assert_eq!(snapshot.schedule, cached_entry(stored_at).schedule);
    assert_eq!(h.cache.get(&zone()).expect("untouched").stored_at, stored_at);
}

#[tokio::test]
async fn failure_without_cache_is_unavailable() {
    let h = harness(vec![Err(FetchError::HttpStatus { status: 503 })]);

    let err = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect_err("no data");

    assert_eq!(err.zone, zone());
    assert!(matches!(
        err.cause,
        UnavailableCause::Fetch(ref fetch) if fetch.cause() == FetchCause::HttpStatus
    ));
    assert!(h.cache.get(&zone()).is_none());
}

#[tokio::test]
async fn malformed_payload_falls_back_or_fails() {
    let h = harness(vec![Ok(RawPayload::from("<html>maintenance</html>"))]);
    let err = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect_err("parse failure");
    assert!(matches!(err.cause, UnavailableCause::Parse(_)));

    let h = harness(vec![Ok(RawPayload::from(r#"{"zones": []}"#))]);
    h.cache.seed(cached_entry(start() - TimeDelta::hours(48)));
    let snapshot = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("fallback");
    assert!(snapshot.is_fallback());
    assert_eq!(h.cache.get(&zone()).expect("kept").stored_at, start() - TimeDelta::hours(48));
}

#[tokio::test]
async fn force_refresh_bypasses_fresh_entry() {
    let h = harness(vec![Ok(RawPayload::from(PAPER_NEXT_WEEK)), Err(FetchError::Timeout)]);
    h.cache.seed(cached_entry(start()));

    let refreshed = h.service.force_refresh(&zone()).await.expect("refresh");
    assert_eq!(h.fetcher.calls(), 1);
    assert_eq!(refreshed.source, SnapshotSource::Fetched);

    h.clock.advance(TimeDelta::minutes(1));
    let fallback = h.service.force_refresh(&zone()).await.expect("fallback");
    assert_eq!(h.fetcher.calls(), 2);
    assert!(fallback.is_fallback());
    assert_eq!(fallback.schedule, refreshed.schedule);
}

#[tokio::test]
async fn window_governs_network_use() {
    let h = harness(vec![
        Ok(RawPayload::from(ORGANIC_TOMORROW)),
        Ok(RawPayload::from(ORGANIC_TOMORROW)),
    ]);
    let window = FreshnessWindow::from_hours(6);

    h.service.get_schedule(&zone(), window).await.expect("first");
    h.clock.advance(TimeDelta::hours(6));
    h.service.get_schedule(&zone(), window).await.expect("at boundary");
    assert_eq!(h.fetcher.calls(), 1);

    h.clock.advance(TimeDelta::seconds(1));
    h.service.get_schedule(&zone(), window).await.expect("past boundary");
    assert_eq!(h.fetcher.calls(), 2);
}

#[tokio::test]
async fn concurrent_calls_for_one_zone_fetch_once() {
    let clock = Arc::new(ManualClock::new(start()));
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    let fetcher = ScriptedFetcher::with_delay(
        vec![Ok(RawPayload::from(ORGANIC_TOMORROW))],
        Duration::from_millis(20),
    );
    let service = ScheduleService::new(fetcher.clone(), cache, clock);
    let window = FreshnessWindow::from_hours(24);
    let zone = zone();

    let (first, second) = tokio::join!(
        service.get_schedule(&zone, window),
        service.get_schedule(&zone, window)
    );

    assert_eq!(fetcher.calls(), 1);
    let first = first.expect("first");
    let second = second.expect("second");
    assert_eq!(first.schedule, second.schedule);
}

#[tokio::test]
async fn distinct_zones_fetch_in_parallel() {
    let clock = Arc::new(ManualClock::new(start()));
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    let fetcher = ScriptedFetcher::with_delay(
        vec![
            Ok(RawPayload::from(ORGANIC_TOMORROW)),
            Ok(RawPayload::from(ORGANIC_TOMORROW)),
        ],
        Duration::from_millis(100),
    );
    let service = ScheduleService::new(fetcher.clone(), cache.clone(), clock);
    let window = FreshnessWindow::from_hours(24);
    let first_zone = ZoneId::from("3631");
    let second_zone = ZoneId::from("3700");

    let (first, second) = tokio::time::timeout(Duration::from_millis(180), async {
        tokio::join!(
            service.get_schedule(&first_zone, window),
            service.get_schedule(&second_zone, window)
        )
    })
    .await
    .expect("zones fetched one after the other");

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(first.expect("first zone").schedule.zone, first_zone);
    assert_eq!(second.expect("second zone").schedule.zone, second_zone);
    assert_eq!(cache.get(&first_zone).expect("first cached").zone, first_zone);
    assert_eq!(cache.get(&second_zone).expect("second cached").zone, second_zone);
}

struct SlowReadCache {
    inner: MemoryCache,
    slow_zone: ZoneId,
    delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
}

impl CachePort for SlowReadCache {
    fn get(&self, zone: &ZoneId) -> Option<CacheEntry> {
        if zone == &self.slow_zone {
            thread::sleep(self.delay);
            self.log.lock().expect("log lock").push(format!("read {zone}"));
        }
        self.inner.get(zone)
    }

    fn put(&self, zone: &ZoneId, schedule: NormalizedSchedule) -> Result<CacheEntry, CacheError> {
        self.inner.put(zone, schedule)
    }
}

#[tokio::test]
async fn blocking_cache_read_does_not_stall_other_zones() {
    let clock = Arc::new(ManualClock::new(start()));
    let slow_zone = ZoneId::from("3631");
    let fast_zone = ZoneId::from("3700");
    let log = Arc::new(Mutex::new(Vec::new()));
    let inner = MemoryCache::new(clock.clone());
    inner.seed(cached_entry_for(&slow_zone, start()));
    inner.seed(cached_entry_for(&fast_zone, start()));
    let cache = Arc::new(SlowReadCache {
        inner,
        slow_zone: slow_zone.clone(),
        delay: Duration::from_millis(150),
        log: Arc::clone(&log),
    });
    let fetcher = ScriptedFetcher::new(Vec::new());
    let service = ScheduleService::new(fetcher.clone(), cache, clock);
    let window = FreshnessWindow::from_hours(24);

    let (slow, fast) = tokio::join!(service.get_schedule(&slow_zone, window), async {
        let snapshot = service.get_schedule(&fast_zone, window).await;
        log.lock().expect("log lock").push(format!("served {fast_zone}"));
        snapshot
    });

    assert_eq!(slow.expect("slow zone").source, SnapshotSource::Cache);
    assert_eq!(fast.expect("fast zone").source, SnapshotSource::Cache);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(
        *log.lock().expect("log lock"),
        vec![String::from("served 3700"), String::from("read 3631")]
    );
}

#[tokio::test]
async fn file_cache_survives_service_restart() {
    let dir = TempDir::new().expect("tempdir");
    let clock = Arc::new(ManualClock::new(start()));

    let first_fetcher = ScriptedFetcher::new(vec![Ok(RawPayload::from(ORGANIC_TOMORROW))]);
    let cache = Arc::new(FileCache::new(dir.path(), clock.clone()).expect("open"));
    let service = ScheduleService::new(first_fetcher.clone(), cache, clock.clone());
    let fetched = service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("fetch");
    drop(service);

    clock.advance(TimeDelta::hours(30));
    let failing = ScriptedFetcher::new(vec![Err(FetchError::Timeout)]);
    let cache = Arc::new(FileCache::new(dir.path(), clock.clone()).expect("reopen"));
    let service = ScheduleService::new(failing.clone(), cache, clock);
    let restored = service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("fallback");

    assert_eq!(failing.calls(), 1);
    assert!(restored.is_fallback());
    assert_eq!(restored.last_update, fetched.last_update);
    assert_eq!(restored.schedule, fetched.schedule);
}

#[tokio::test]
async fn report_combines_views() {
    let h = harness(vec![Ok(RawPayload::from(ORGANIC_TOMORROW))]);
    let snapshot = h
        .service
        .get_schedule(&zone(), FreshnessWindow::from_hours(24))
        .await
        .expect("schedule");
    let tracked = [WasteTypeCode::from("3704"), WasteTypeCode::from("3707")];

    let report = ZoneReport::build(&snapshot, &tracked, h.clock.today(), Some(1));

    assert_eq!(report.zone, zone());
    assert_eq!(report.last_update, start());
    assert_eq!(report.tomorrow.state(), "Organico");
    let [organic, plastic] = report.waste_types.as_slice() else {
        panic!("expected two views");
    };
    assert!(organic.is_tomorrow);
    assert_eq!(organic.next_dates, vec![date(2)]);
    assert!(!plastic.is_tomorrow);
    assert!(plastic.next_dates.is_empty());
    assert!(plastic.title.is_none());
}
