use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::browser::PageHost;
use crate::campaign::Campaign;
use crate::config::{Config, TARGET_URL};
use crate::db::{self, Store};
use crate::driver;
use crate::error::SessionError;
use crate::notify::{self, LogNotifier, Notifier};
use crate::parser::locators::FieldTable;
use crate::relay::{Relay, RelayMeta};
use crate::wait::{FixedDelay, Phase, WaitStrategy};

/// How often a running session refreshes its lease.
const HEARTBEAT_EVERY: Duration = Duration::from_secs(30);
/// A lease not refreshed for this long belongs to a dead process.
const LEASE_TTL_SECS: i64 = 120;

fn lease_ttl() -> chrono::Duration {
    chrono::Duration::seconds(LEASE_TTL_SECS)
}

static NEXT_OWNER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Scraping,
    Success,
    Error,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Scraping => "scraping",
            Status::Success => "success",
            Status::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Status::Idle),
            "scraping" => Some(Status::Scraping),
            "success" => Some(Status::Success),
            "error" => Some(Status::Error),
            _ => None,
        }
    }
}

/// What started a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Periodic,
    OnDemand,
}

/// The single-slot record of the current or most recent session.
///
/// `last_run_at` and `result_count` describe the last *successful* run and
/// survive a later failure untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSession {
    pub status: Status,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub result_count: usize,
    pub run_count: u64,
}

impl Default for ScrapeSession {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            last_run_at: None,
            last_error: None,
            result_count: 0,
            run_count: 0,
        }
    }
}

impl ScrapeSession {
    /// Read the persisted record as it stands. `scraping` is kept while its
    /// holder still heartbeats; one left behind by a dead process reads as
    /// `idle`.
    pub fn load(store: &Store) -> Result<Self> {
        let status = match store.get(db::STATUS)?.as_deref().and_then(Status::parse) {
            Some(Status::Scraping) if store.lease_holder(Utc::now(), lease_ttl())?.is_some() => {
                Status::Scraping
            }
            Some(Status::Scraping) | None => Status::Idle,
            Some(s) => s,
        };
        let last_run_at = store
            .get(db::LAST_RUN_AT)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc));
        let last_error = match status {
            Status::Error => store.get(db::LAST_ERROR)?,
            _ => None,
        };
        let run_count = store
            .get(db::RUN_COUNT)?
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        let result_count = last_campaigns(store)?.len();
        Ok(Self {
            status,
            last_run_at,
            last_error,
            result_count,
            run_count,
        })
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Scraping
    }
}

/// The batch saved by the last successful session.
pub fn last_campaigns(store: &Store) -> Result<Vec<Campaign>> {
    match store.get(db::LAST_CAMPAIGNS)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

#[derive(Debug)]
pub struct SessionReport {
    pub campaigns: Vec<Campaign>,
    pub stored: usize,
}

/// Runs scrape sessions one at a time and owns the session record.
///
/// Single flight holds within the process (`active`) and across processes
/// sharing the database (the session lease in the store).
pub struct SessionController<H: PageHost> {
    host: H,
    owner: String,
    active: AtomicBool,
    relay: Arc<dyn Relay>,
    store: Arc<Store>,
    notifier: Box<dyn Notifier>,
    wait: Box<dyn WaitStrategy>,
    table: FieldTable,
    session: Mutex<ScrapeSession>,
}

impl<H: PageHost> SessionController<H> {
    pub fn new(host: H, relay: Arc<dyn Relay>, store: Arc<Store>) -> Result<Self> {
        let session = ScrapeSession::load(&store)?;
        let owner = format!(
            "pid{}-{}",
            std::process::id(),
            NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
        );
        Ok(Self {
            host,
            owner,
            active: AtomicBool::new(false),
            relay,
            store,
            notifier: Box::new(LogNotifier),
            wait: Box::new(FixedDelay::default()),
            table: FieldTable::default(),
            session: Mutex::new(session),
        })
    }

    pub fn with_wait(mut self, wait: impl WaitStrategy + 'static) -> Self {
        self.wait = Box::new(wait);
        self
    }

    pub fn with_table(mut self, table: FieldTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Copy of the current session record.
    pub fn snapshot(&self) -> ScrapeSession {
        self.lock().clone()
    }

    /// Run one full session. A trigger that arrives while another session is
    /// in flight, here or in another process on the same database, is refused
    /// with [`SessionError::Busy`] and changes nothing.
    pub async fn run(&self, trigger: Trigger) -> Result<SessionReport, SessionError> {
        self.begin(trigger)?;
        let mut guard = InFlight { ctl: self, settled: false };

        let outcome = {
            let work = self.execute();
            tokio::pin!(work);
            let mut beat = tokio::time::interval(HEARTBEAT_EVERY);
            beat.set_missed_tick_behavior(MissedTickBehavior::Delay);
            beat.tick().await;
            loop {
                tokio::select! {
                    out = &mut work => break out,
                    _ = beat.tick() => self.heartbeat(),
                }
            }
        };
        match &outcome {
            Ok(report) => self.succeed(report),
            Err(e) => self.fail(&e.to_string()),
        }
        guard.settled = true;
        outcome
    }

    fn begin(&self, trigger: Trigger) -> Result<(), SessionError> {
        if self.active.swap(true, Ordering::AcqRel) {
            warn!("{:?} trigger refused: session already in progress", trigger);
            return Err(SessionError::Busy);
        }
        match self.store.claim_lease(&self.owner, Utc::now(), lease_ttl()) {
            Ok(true) => {}
            Ok(false) => {
                self.active.store(false, Ordering::Release);
                warn!("{:?} trigger refused: another process is scraping", trigger);
                return Err(SessionError::Busy);
            }
            Err(e) => {
                self.active.store(false, Ordering::Release);
                return Err(SessionError::Store(e.to_string()));
            }
        }
        {
            let mut session = self.lock();
            session.status = Status::Scraping;
            session.last_error = None;
        }
        info!("Starting scrape session ({:?})", trigger);
        Ok(())
    }

    fn heartbeat(&self) {
        match self.store.renew_lease(&self.owner, Utc::now()) {
            Ok(true) => debug!("Session lease renewed"),
            Ok(false) => warn!("Session lease was taken over by another process"),
            Err(e) => warn!("Failed to renew session lease: {}", e),
        }
    }

    async fn execute(&self) -> Result<SessionReport, SessionError> {
        let config = Config::load(&self.store).map_err(|e| SessionError::Store(format!("{:#}", e)))?;
        // no point driving the browser for a batch that cannot be delivered
        if config.endpoint_url.is_none() {
            return Err(SessionError::MissingConfig);
        }

        let page = self.acquire_page().await?;
        let campaigns: Vec<Campaign> = driver::campaigns(&page, &self.table, &*self.wait)
            .try_collect()
            .await?;
        info!("Extracted {} campaigns", campaigns.len());

        let stored = self
            .relay
            .send(config.endpoint_url.as_deref(), &campaigns, &RelayMeta::now())
            .await?;
        Ok(SessionReport { campaigns, stored })
    }

    async fn acquire_page(&self) -> Result<H::Page, SessionError> {
        let unavailable = |e: anyhow::Error| SessionError::ContextUnavailable(format!("{:#}", e));

        if let Some(page) = self.host.find_page(TARGET_URL).await.map_err(unavailable)? {
            debug!("Using already open campaigns tab");
            return Ok(page);
        }
        info!("Opening {}", TARGET_URL);
        let page = self.host.open_page(TARGET_URL).await.map_err(unavailable)?;
        self.wait.settle(Phase::PageOpen).await;
        Ok(page)
    }

    fn succeed(&self, report: &SessionReport) {
        let count = report.campaigns.len();
        let (at, runs) = {
            let mut session = self.lock();
            session.status = Status::Success;
            session.last_run_at = Some(Utc::now());
            session.last_error = None;
            session.result_count = count;
            session.run_count += 1;
            (session.last_run_at, session.run_count)
        };

        let batch = match serde_json::to_string(&report.campaigns) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("Could not serialise last batch: {}", e);
                None
            }
        };
        let mut entries = vec![
            (db::STATUS, Some(Status::Success.as_str().to_string())),
            (db::LAST_RUN_AT, at.map(|t| t.to_rfc3339())),
            (db::LAST_ERROR, None),
            (db::RUN_COUNT, Some(runs.to_string())),
            (db::SESSION_OWNER, None),
            (db::SESSION_HEARTBEAT, None),
        ];
        if batch.is_some() {
            entries.push((db::LAST_CAMPAIGNS, batch));
        }
        self.persist(&entries);
        self.active.store(false, Ordering::Release);

        info!("Session succeeded: {} campaigns", count);
        self.notifier
            .notify(notify::TITLE, &format!("Successfully scraped {} campaigns", count), false);
    }

    fn fail(&self, message: &str) {
        {
            let mut session = self.lock();
            session.status = Status::Error;
            session.last_error = Some(message.to_string());
        }
        self.persist(&[
            (db::STATUS, Some(Status::Error.as_str().to_string())),
            (db::LAST_ERROR, Some(message.to_string())),
            (db::SESSION_OWNER, None),
            (db::SESSION_HEARTBEAT, None),
        ]);
        self.active.store(false, Ordering::Release);

        error!("Session failed: {}", message);
        self.notifier
            .notify(notify::ERROR_TITLE, &format!("Error: {}", message), true);
    }

    fn persist(&self, entries: &[(&str, Option<String>)]) {
        if let Err(e) = self.store.set_many(entries) {
            warn!("Failed to persist session state: {}", e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScrapeSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Marks the session failed if the running future is dropped before it
/// settles, so the record never stays stuck in `scraping`.
struct InFlight<'a, H: PageHost> {
    ctl: &'a SessionController<H>,
    settled: bool,
}

impl<H: PageHost> Drop for InFlight<'_, H> {
    fn drop(&mut self) {
        if !self.settled {
            self.ctl.fail("session interrupted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::ChromeHost;
    use crate::relay::HttpRelay;
    use crate::testing::{card_html, FakeCard, FakeHost, FakePage, RecordingRelay};
    use crate::wait::Immediate;
    use tokio::sync::Notify;

    fn store(endpoint: Option<&str>) -> Arc<Store> {
        let store = Store::in_memory().unwrap();
        let mut cfg = Config::default();
        if let Some(url) = endpoint {
            cfg.set_endpoint(url).unwrap();
        }
        cfg.save(&store).unwrap();
        Arc::new(store)
    }

    fn controller(host: FakeHost, relay: Arc<RecordingRelay>, store: Arc<Store>) -> SessionController<FakeHost> {
        SessionController::new(host, relay, store).unwrap().with_wait(Immediate)
    }

    const ENDPOINT: &str = "http://127.0.0.1:9/ingest";

    fn three_cards(failing: Option<usize>) -> FakePage {
        let cards = ["One", "Two", "Three"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let card = FakeCard::new(&card_html(name));
                if Some(i) == failing {
                    card.failing_click()
                } else {
                    card
                }
            })
            .collect();
        FakePage::new(cards)
    }

    #[tokio::test]
    async fn zero_cards_is_success() {
        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(
            FakeHost::with_open_tab(FakePage::new(Vec::new())),
            Arc::clone(&relay),
            store(Some(ENDPOINT)),
        );
        let report = ctl.run(Trigger::OnDemand).await.unwrap();
        assert!(report.campaigns.is_empty());

        let s = ctl.snapshot();
        assert_eq!(s.status, Status::Success);
        assert_eq!(s.result_count, 0);
        assert_eq!(s.run_count, 1);
        assert!(s.last_run_at.is_some());
        assert_eq!(relay.calls(), 1);
    }

    #[tokio::test]
    async fn missing_endpoint_fails_before_any_work() {
        let relay = Arc::new(RecordingRelay::default());
        let host = FakeHost::opening(three_cards(None));
        let ctl = controller(host, Arc::clone(&relay), store(None));

        let err = ctl.run(Trigger::Periodic).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingConfig));

        let s = ctl.snapshot();
        assert_eq!(s.status, Status::Error);
        assert!(s.last_error.unwrap().contains("not configured"));
        assert_eq!(relay.calls(), 0);
        assert!(ctl.host.opened.lock().unwrap().is_empty());
        assert_eq!(ctl.store().get(db::STATUS).unwrap().as_deref(), Some("error"));
    }

    #[tokio::test]
    async fn bad_card_costs_only_itself() {
        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(
            FakeHost::with_open_tab(three_cards(Some(1))),
            Arc::clone(&relay),
            store(Some(ENDPOINT)),
        );
        let report = ctl.run(Trigger::Periodic).await.unwrap();
        let names: Vec<&str> = report.campaigns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["One", "Three"]);
        assert_eq!(relay.sent.lock().unwrap()[0].len(), 2);
        assert_eq!(ctl.snapshot().result_count, 2);

        let saved = last_campaigns(ctl.store()).unwrap();
        assert_eq!(saved, report.campaigns);
    }

    #[tokio::test]
    async fn opens_tab_when_none_is_open() {
        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(FakeHost::opening(three_cards(None)), relay, store(Some(ENDPOINT)));
        let report = ctl.run(Trigger::OnDemand).await.unwrap();
        assert_eq!(report.campaigns.len(), 3);
        assert_eq!(*ctl.host.opened.lock().unwrap(), [TARGET_URL]);
    }

    #[tokio::test]
    async fn reuses_open_tab() {
        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(FakeHost::with_open_tab(three_cards(None)), relay, store(Some(ENDPOINT)));
        ctl.run(Trigger::OnDemand).await.unwrap();
        assert!(ctl.host.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_context_keeps_previous_counters() {
        let store = store(Some(ENDPOINT));
        store
            .set_many(&[
                (db::STATUS, Some("success".into())),
                (db::RUN_COUNT, Some("4".into())),
                (db::LAST_RUN_AT, Some("2025-01-02T03:04:05+00:00".into())),
                (db::LAST_CAMPAIGNS, Some("[]".into())),
            ])
            .unwrap();
        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(FakeHost::broken(), Arc::clone(&relay), store);
        let before = ctl.snapshot();
        assert_eq!(before.run_count, 4);

        let err = ctl.run(Trigger::Periodic).await.unwrap_err();
        assert!(matches!(err, SessionError::ContextUnavailable(_)));

        let after = ctl.snapshot();
        assert_eq!(after.status, Status::Error);
        assert_eq!(after.run_count, 4);
        assert_eq!(after.last_run_at, before.last_run_at);
        assert_eq!(after.result_count, before.result_count);
        assert_eq!(relay.calls(), 0);
    }

    #[tokio::test]
    async fn relay_failure_is_recorded() {
        let relay = Arc::new(RecordingRelay::failing("connection reset"));
        let ctl = controller(FakeHost::with_open_tab(three_cards(None)), relay, store(Some(ENDPOINT)));
        ctl.run(Trigger::Periodic).await.unwrap_err();

        let s = ctl.snapshot();
        assert_eq!(s.status, Status::Error);
        assert_eq!(s.run_count, 0);
        let persisted = ctl.store().get(db::LAST_ERROR).unwrap().unwrap();
        assert!(persisted.contains("connection reset"));
    }

    #[tokio::test]
    async fn success_after_error_clears_message() {
        let relay = Arc::new(RecordingRelay::default());
        let store = store(None);
        let ctl = controller(FakeHost::with_open_tab(three_cards(None)), relay, Arc::clone(&store));
        ctl.run(Trigger::Periodic).await.unwrap_err();
        assert!(ctl.snapshot().last_error.is_some());

        let mut cfg = Config::load(&store).unwrap();
        cfg.set_endpoint(ENDPOINT).unwrap();
        cfg.save(&store).unwrap();

        ctl.run(Trigger::OnDemand).await.unwrap();
        let s = ctl.snapshot();
        assert_eq!(s.status, Status::Success);
        assert_eq!(s.last_error, None);
        assert_eq!(store.get(db::LAST_ERROR).unwrap(), None);
    }

    #[tokio::test]
    async fn overlapping_trigger_is_refused() {
        let gate = Arc::new(Notify::new());
        let mut host = FakeHost::with_open_tab(three_cards(None));
        host.gate = Some(Arc::clone(&gate));
        let relay = Arc::new(RecordingRelay::default());
        let ctl = Arc::new(controller(host, Arc::clone(&relay), store(Some(ENDPOINT))));

        let first = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move { ctl.run(Trigger::Periodic).await })
        };
        while !ctl.snapshot().is_running() {
            tokio::task::yield_now().await;
        }

        let second = ctl.run(Trigger::OnDemand).await;
        assert!(matches!(second, Err(SessionError::Busy)));
        assert_eq!(ctl.snapshot().status, Status::Scraping);

        gate.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.campaigns.len(), 3);
        assert_eq!(relay.calls(), 1);
        assert_eq!(ctl.snapshot().run_count, 1);
    }

    #[derive(Clone, Default)]
    struct Alerts(Arc<Mutex<Vec<(String, bool)>>>);

    impl Notifier for Alerts {
        fn notify(&self, _title: &str, body: &str, is_error: bool) {
            self.0.lock().unwrap().push((body.to_string(), is_error));
        }
    }

    #[tokio::test]
    async fn outcome_is_announced() {
        let alerts = Alerts::default();
        let ctl = controller(
            FakeHost::with_open_tab(three_cards(None)),
            Arc::new(RecordingRelay::default()),
            store(Some(ENDPOINT)),
        )
        .with_notifier(alerts.clone());
        ctl.run(Trigger::OnDemand).await.unwrap();

        let ctl = controller(FakeHost::broken(), Arc::new(RecordingRelay::default()), store(Some(ENDPOINT)))
            .with_notifier(alerts.clone());
        ctl.run(Trigger::OnDemand).await.unwrap_err();

        let seen = alerts.0.lock().unwrap().clone();
        assert_eq!(seen[0], ("Successfully scraped 3 campaigns".to_string(), false));
        assert!(seen[1].0.starts_with("Error: page context unavailable"));
        assert!(seen[1].1);
    }

    #[test]
    fn interrupted_session_restores_as_idle() {
        let store = Store::in_memory().unwrap();
        store.set(db::STATUS, "scraping").unwrap();
        store.set(db::LAST_ERROR, "stale").unwrap();
        let s = ScrapeSession::load(&store).unwrap();
        assert_eq!(s.status, Status::Idle);
        assert_eq!(s.last_error, None);
    }

    #[tokio::test]
    async fn dropped_session_does_not_stay_scraping() {
        let gate = Arc::new(Notify::new());
        let mut host = FakeHost::with_open_tab(three_cards(None));
        host.gate = Some(gate);
        let ctl = controller(host, Arc::new(RecordingRelay::default()), store(Some(ENDPOINT)));

        let mut run = Box::pin(ctl.run(Trigger::Periodic));
        assert!(futures::poll!(run.as_mut()).is_pending());
        assert!(ctl.snapshot().is_running());
        drop(run);

        let s = ctl.snapshot();
        assert_eq!(s.status, Status::Error);
        assert_eq!(s.last_error.as_deref(), Some("session interrupted"));
    }

    #[tokio::test]
    async fn closed_tab_fails_instead_of_reporting_nothing() {
        let store = store(Some(ENDPOINT));
        let kept = vec![Campaign::blank("c1", Utc::now())];
        store
            .set_many(&[
                (db::RUN_COUNT, Some("2".into())),
                (db::LAST_CAMPAIGNS, Some(serde_json::to_string(&kept).unwrap())),
            ])
            .unwrap();
        let mut page = three_cards(None);
        page.dead = true;
        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(FakeHost::with_open_tab(page), Arc::clone(&relay), Arc::clone(&store));

        let err = ctl.run(Trigger::Periodic).await.unwrap_err();
        assert!(matches!(err, SessionError::ContextUnavailable(ref m) if m.contains("target closed")));

        let s = ctl.snapshot();
        assert_eq!(s.status, Status::Error);
        assert_eq!(s.run_count, 2);
        assert_eq!(relay.calls(), 0);
        assert_eq!(last_campaigns(&store).unwrap().len(), 1);
    }

    fn held_by_other(heartbeat: DateTime<Utc>) -> Arc<Store> {
        let store = store(Some(ENDPOINT));
        store
            .set_many(&[
                (db::STATUS, Some("scraping".into())),
                (db::SESSION_OWNER, Some("other-process".into())),
                (db::SESSION_HEARTBEAT, Some(heartbeat.to_rfc3339())),
            ])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn session_held_elsewhere_is_reported_and_refused() {
        let store = held_by_other(Utc::now());
        assert_eq!(ScrapeSession::load(&store).unwrap().status, Status::Scraping);

        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(FakeHost::with_open_tab(three_cards(None)), Arc::clone(&relay), Arc::clone(&store));
        let err = ctl.run(Trigger::OnDemand).await.unwrap_err();
        assert!(matches!(err, SessionError::Busy));

        assert_eq!(relay.calls(), 0);
        assert_eq!(store.get(db::STATUS).unwrap().as_deref(), Some("scraping"));
        assert_eq!(store.get(db::SESSION_OWNER).unwrap().as_deref(), Some("other-process"));
    }

    #[tokio::test]
    async fn session_of_dead_process_is_taken_over() {
        let store = held_by_other(Utc::now() - chrono::Duration::minutes(10));
        assert_eq!(ScrapeSession::load(&store).unwrap().status, Status::Idle);

        let relay = Arc::new(RecordingRelay::default());
        let ctl = controller(FakeHost::with_open_tab(three_cards(None)), Arc::clone(&relay), Arc::clone(&store));
        ctl.run(Trigger::OnDemand).await.unwrap();

        assert_eq!(relay.calls(), 1);
        assert_eq!(store.get(db::STATUS).unwrap().as_deref(), Some("success"));
        assert_eq!(store.get(db::SESSION_OWNER).unwrap(), None);
        assert_eq!(store.lease_holder(Utc::now(), lease_ttl()).unwrap(), None);
    }

    #[tokio::test]
    async fn missing_endpoint_is_recorded_without_a_browser() {
        let store = store(None);
        let ctl = SessionController::new(
            ChromeHost::new(),
            Arc::new(HttpRelay::new().unwrap()),
            Arc::clone(&store),
        )
        .unwrap();

        let err = ctl.run(Trigger::OnDemand).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingConfig));
        assert_eq!(store.get(db::STATUS).unwrap().as_deref(), Some("error"));
        assert!(store.get(db::LAST_ERROR).unwrap().unwrap().contains("not configured"));
    }
}
