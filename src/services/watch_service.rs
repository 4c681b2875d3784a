use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::{FeedError, FeedHistory, FeedOutcome, Digest, RunReport, SeenIds, SeenState};
use crate::errors::WatcherResult;
use crate::notifier::Notifier;
use crate::services::novelty;
use crate::sources::FeedReader;
use crate::storage::StateStore;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub recipients: Vec<String>,
    pub bootstrap_on_empty_state: bool,
    pub max_ids_per_feed: Option<usize>,
    /// Fetch and diff only: nothing is sent and no state is written.
    pub dry_run: bool,
}

impl WatchOptions {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        Self {
            recipients: config.email_to.clone(),
            bootstrap_on_empty_state: config.bootstrap_on_empty_state,
            max_ids_per_feed: config.max_ids_per_feed,
            dry_run,
        }
    }
}

/// One pass over the configured feeds: fetch, diff, notify, persist.
///
/// Notification is best-effort: a feed's seen set is stored whether or not its
/// email went out, so an entry is announced at most once. State is saved after
/// every feed that changed it, and a failed save ends the run.
///
/// A feed seen for the first time whose fetch comes back empty is not recorded
/// at all, rather than stored with an empty set. Its bootstrap then happens on
/// the first non-empty fetch, so that fetch's backlog is never emailed.
pub struct WatchService<R: FeedReader, S: StateStore, N: Notifier> {
    reader: R,
    store: S,
    notifier: N,
    options: WatchOptions,
}

impl<R: FeedReader, S: StateStore, N: Notifier> WatchService<R, S, N> {
    pub fn new(reader: R, store: S, notifier: N, options: WatchOptions) -> Self {
        Self {
            reader,
            store,
            notifier,
            options,
        }
    }

    pub fn run(&self, feed_urls: &[String]) -> WatcherResult<RunReport> {
        let mut state = self.store.load()?;
        let mut report = RunReport::default();

        for feed_url in feed_urls {
            let outcome = self.process_feed(feed_url, &mut state)?;
            report.outcomes.push(outcome);
        }

        info!(
            feeds = report.outcomes.len(),
            new = report.total_new(),
            failed = report.failures().count(),
            "run complete"
        );
        Ok(report)
    }

    fn process_feed(&self, feed_url: &str, state: &mut SeenState) -> WatcherResult<FeedOutcome> {
        let mut outcome = FeedOutcome::new(feed_url);

        let entries = match self.reader.fetch(feed_url) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(feed = feed_url, error = %e, "fetch failed, feed skipped");
                outcome.error = Some(FeedError::from(&e));
                return Ok(outcome);
            }
        };
        outcome.fetched_count = entries.len();

        let empty = SeenIds::new();
        let history = match state.history(feed_url) {
            FeedHistory::Unknown if !self.options.bootstrap_on_empty_state => {
                FeedHistory::Seen(&empty)
            }
            history => history,
        };
        let detection = novelty::detect(history, &entries);

        if detection.bootstrap {
            if detection.seen.is_empty() {
                // Recording an empty set now would email the whole backlog next time
                info!(feed = feed_url, "feed returned no entries, bootstrap deferred");
                return Ok(outcome);
            }
            info!(
                feed = feed_url,
                entries = detection.seen.len(),
                "bootstrapped feed without notifying"
            );
            outcome.bootstrapped = true;
        }

        outcome.new_count = detection.new_entries.len();
        if !detection.new_entries.is_empty() {
            let digest = Digest::for_new_entries(feed_url, &detection.new_entries);

            if self.options.dry_run {
                info!(
                    feed = feed_url,
                    new = outcome.new_count,
                    subject = %digest.subject,
                    "dry run, notification not sent"
                );
            } else {
                match self.notifier.send(
                    &digest.subject,
                    &digest.body,
                    &self.options.recipients,
                ) {
                    Ok(()) => {
                        info!(feed = feed_url, new = outcome.new_count, "notification sent");
                        outcome.notified = true;
                    }
                    Err(e) => {
                        warn!(feed = feed_url, error = %e, "notification failed, entries still marked seen");
                        outcome.error = Some(FeedError::from(&e));
                    }
                }
            }
        } else if !detection.bootstrap {
            info!(feed = feed_url, fetched = outcome.fetched_count, "no new entries");
        }

        let mut seen = detection.seen;
        if let Some(max) = self.options.max_ids_per_feed {
            seen.keep_newest(max);
        }

        if state.get(feed_url) != Some(&seen) {
            state.record(feed_url, seen);
            if !self.options.dry_run {
                self.store.save(state).map_err(|e| {
                    error!(feed = feed_url, error = %e, "could not save state, aborting run");
                    e
                })?;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::domain::FeedEntry;
    use crate::errors::{ErrorKind, WatcherError};
    use crate::notifier::traits::MockNotifier;
    use crate::sources::traits::MockFeedReader;
    use crate::storage::traits::MockStateStore;
    use crate::storage::JsonStateStore;

    const FEED_F: &str = "https://f.example/feed";
    const FEED_G: &str = "https://g.example/feed";

    fn entries(ids: &[&str]) -> Vec<FeedEntry> {
        ids.iter()
            .map(|id| {
                FeedEntry::new(*id, format!("Product {}", id))
                    .with_link(format!("https://f.example/p/{}", id))
            })
            .collect()
    }

    fn seen(ids: &[&str]) -> SeenIds {
        ids.iter().copied().collect()
    }

    fn options() -> WatchOptions {
        WatchOptions {
            recipients: vec!["me@example.com".to_string()],
            bootstrap_on_empty_state: true,
            max_ids_per_feed: None,
            dry_run: false,
        }
    }

    fn reader_returning(feeds: Vec<(&'static str, WatcherResult<Vec<FeedEntry>>)>) -> MockFeedReader {
        let mut reader = MockFeedReader::new();
        for (url, result) in feeds {
            let result = Mutex::new(Some(result));
            reader
                .expect_fetch()
                .withf(move |u: &str| u == url)
                .times(1)
                .returning(move |_| result.lock().unwrap().take().unwrap());
        }
        reader
    }

    /// A store mock that starts from `initial` and records every saved state.
    fn recording_store(initial: SeenState) -> (MockStateStore, Arc<Mutex<Vec<SeenState>>>) {
        let saves = Arc::new(Mutex::new(Vec::new()));
        let mut store = MockStateStore::new();
        store.expect_load().returning(move || Ok(initial.clone()));
        let sink = Arc::clone(&saves);
        store.expect_save().returning(move |state| {
            sink.lock().unwrap().push(state.clone());
            Ok(())
        });
        (store, saves)
    }

    fn silent_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().never();
        notifier
    }

    #[test]
    fn test_first_run_bootstraps_without_email() {
        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["A", "B", "C"])))]);
        let (store, saves) = recording_store(SeenState::new());

        let service = WatchService::new(reader, store, silent_notifier(), options());
        let report = service.run(&[FEED_F.to_string()]).unwrap();

        let outcome = report.outcome(FEED_F).unwrap();
        assert!(outcome.bootstrapped);
        assert_eq!(outcome.fetched_count, 3);
        assert_eq!(outcome.new_count, 0);
        assert!(!outcome.notified);

        let saves = saves.lock().unwrap();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].get(FEED_F), Some(&seen(&["A", "B", "C"])));
    }

    #[test]
    fn test_new_entry_is_emailed_and_recorded() {
        let mut initial = SeenState::new();
        initial.record(FEED_F, seen(&["A", "B", "C"]));

        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["A", "B", "C", "D"])))]);
        let (store, saves) = recording_store(initial);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|subject, body, recipients| {
                subject == "New entry detected (f.example): Product D"
                    && body.contains("https://f.example/p/D")
                    && recipients.len() == 1
                    && recipients[0] == "me@example.com"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = WatchService::new(reader, store, notifier, options());
        let report = service.run(&[FEED_F.to_string()]).unwrap();

        let outcome = report.outcome(FEED_F).unwrap();
        assert_eq!(outcome.new_count, 1);
        assert!(outcome.notified);
        assert!(outcome.is_ok());

        let saves = saves.lock().unwrap();
        assert_eq!(saves.last().unwrap().get(FEED_F), Some(&seen(&["A", "B", "C", "D"])));
    }

    #[test]
    fn test_fetch_failure_is_isolated() {
        let mut initial = SeenState::new();
        initial.record(FEED_G, seen(&["g1"]));
        initial.record(FEED_F, seen(&["A"]));

        let reader = reader_returning(vec![
            (FEED_G, Err(WatcherError::FeedParse("truncated document".to_string()))),
            (FEED_F, Ok(entries(&["A", "B"]))),
        ]);
        let (store, saves) = recording_store(initial);
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(1).returning(|_, _, _| Ok(()));

        let service = WatchService::new(reader, store, notifier, options());
        let report = service
            .run(&[FEED_G.to_string(), FEED_F.to_string()])
            .unwrap();

        assert_eq!(report.outcomes[0].feed_url, FEED_G);
        let failed = report.outcome(FEED_G).unwrap();
        assert_eq!(failed.error.as_ref().unwrap().kind, ErrorKind::Fetch);
        assert_eq!(report.failures().count(), 1);

        assert_eq!(report.outcome(FEED_F).unwrap().new_count, 1);

        let saves = saves.lock().unwrap();
        let last = saves.last().unwrap();
        assert_eq!(last.get(FEED_G), Some(&seen(&["g1"])));
        assert_eq!(last.get(FEED_F), Some(&seen(&["A", "B"])));
    }

    #[test]
    fn test_delivery_failure_still_persists() {
        let mut initial = SeenState::new();
        initial.record(FEED_F, seen(&["A"]));

        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["B", "A"])))]);
        let (store, saves) = recording_store(initial);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_, _, _| Err(WatcherError::Notification("connection refused".to_string())));

        let service = WatchService::new(reader, store, notifier, options());
        let report = service.run(&[FEED_F.to_string()]).unwrap();

        let outcome = report.outcome(FEED_F).unwrap();
        assert!(!outcome.notified);
        assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::Delivery);
        assert_eq!(
            saves.lock().unwrap().last().unwrap().get(FEED_F),
            Some(&seen(&["A", "B"]))
        );
    }

    #[test]
    fn test_unchanged_feed_is_not_saved() {
        let mut initial = SeenState::new();
        initial.record(FEED_F, seen(&["A", "B"]));

        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["A", "B"])))]);
        let mut store = MockStateStore::new();
        store.expect_load().returning(move || Ok(initial.clone()));
        store.expect_save().never();

        let service = WatchService::new(reader, store, silent_notifier(), options());
        let report = service.run(&[FEED_F.to_string()]).unwrap();
        assert_eq!(report.total_new(), 0);
    }

    #[test]
    fn test_empty_fetch_defers_bootstrap() {
        let reader = reader_returning(vec![(FEED_F, Ok(Vec::new()))]);
        let mut store = MockStateStore::new();
        store.expect_load().returning(|| Ok(SeenState::new()));
        store.expect_save().never();

        let service = WatchService::new(reader, store, silent_notifier(), options());
        let report = service.run(&[FEED_F.to_string()]).unwrap();

        let outcome = report.outcome(FEED_F).unwrap();
        assert!(!outcome.bootstrapped);
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_bootstrap_disabled_emails_backlog() {
        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["A", "B"])))]);
        let (store, _saves) = recording_store(SeenState::new());
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|subject, _, _| subject == "2 new entries detected (f.example)")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = WatchService::new(
            reader,
            store,
            notifier,
            WatchOptions {
                bootstrap_on_empty_state: false,
                ..options()
            },
        );
        let report = service.run(&[FEED_F.to_string()]).unwrap();
        assert_eq!(report.outcome(FEED_F).unwrap().new_count, 2);
    }

    #[test]
    fn test_dry_run_sends_and_saves_nothing() {
        let mut initial = SeenState::new();
        initial.record(FEED_F, seen(&["A"]));

        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["A", "B"])))]);
        let mut store = MockStateStore::new();
        store.expect_load().returning(move || Ok(initial.clone()));
        store.expect_save().never();

        let service = WatchService::new(
            reader,
            store,
            silent_notifier(),
            WatchOptions {
                dry_run: true,
                ..options()
            },
        );
        let report = service.run(&[FEED_F.to_string()]).unwrap();

        let outcome = report.outcome(FEED_F).unwrap();
        assert_eq!(outcome.new_count, 1);
        assert!(!outcome.notified);
    }

    #[test]
    fn test_save_failure_aborts_run() {
        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["A"])))]);
        let mut store = MockStateStore::new();
        store.expect_load().returning(|| Ok(SeenState::new()));
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(WatcherError::State("read-only filesystem".to_string())));

        let service = WatchService::new(reader, store, silent_notifier(), options());
        let err = service
            .run(&[FEED_F.to_string(), FEED_G.to_string()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_load_failure_aborts_before_fetching() {
        let mut reader = MockFeedReader::new();
        reader.expect_fetch().never();
        let mut store = MockStateStore::new();
        store
            .expect_load()
            .returning(|| Err(WatcherError::State("permission denied".to_string())));

        let service = WatchService::new(reader, store, silent_notifier(), options());
        assert!(service.run(&[FEED_F.to_string()]).is_err());
    }

    #[test]
    fn test_seen_set_capped_when_configured() {
        let mut initial = SeenState::new();
        initial.record(FEED_F, seen(&["A", "B"]));

        let reader = reader_returning(vec![(FEED_F, Ok(entries(&["C", "B"])))]);
        let (store, saves) = recording_store(initial);
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(1).returning(|_, _, _| Ok(()));

        let service = WatchService::new(
            reader,
            store,
            notifier,
            WatchOptions {
                max_ids_per_feed: Some(2),
                ..options()
            },
        );
        service.run(&[FEED_F.to_string()]).unwrap();

        assert_eq!(
            saves.lock().unwrap().last().unwrap().get(FEED_F),
            Some(&seen(&["B", "C"]))
        );
    }

    #[test]
    fn test_two_runs_against_json_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_feed_items.json");

        let first = WatchService::new(
            reader_returning(vec![(FEED_F, Ok(entries(&["A", "B", "C"])))]),
            JsonStateStore::new(&path),
            silent_notifier(),
            options(),
        );
        first.run(&[FEED_F.to_string()]).unwrap();

        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(1).returning(|_, _, _| Ok(()));
        let second = WatchService::new(
            reader_returning(vec![(FEED_F, Ok(entries(&["A", "B", "C", "D"])))]),
            JsonStateStore::new(&path),
            notifier,
            options(),
        );
        let report = second.run(&[FEED_F.to_string()]).unwrap();
        assert_eq!(report.outcome(FEED_F).unwrap().new_count, 1);

        let third = WatchService::new(
            reader_returning(vec![(FEED_F, Ok(entries(&["A", "B", "C", "D"])))]),
            JsonStateStore::new(&path),
            silent_notifier(),
            options(),
        );
        let report = third.run(&[FEED_F.to_string()]).unwrap();
        assert_eq!(report.total_new(), 0);

        let state = JsonStateStore::new(&path).load().unwrap();
        assert_eq!(state.get(FEED_F), Some(&seen(&["A", "B", "C", "D"])));
    }
}
