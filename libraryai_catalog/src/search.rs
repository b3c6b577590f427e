use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;

use crate::book::{Book, Summary};
use crate::catalog_data_source::CatalogDataSource;
use crate::notifications::{Notification, Notifier};

const SEARCH_FAILED: &str = "Failed to search books";
const SUMMARY_FAILED: &str = "Failed to generate AI summary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What happens when only one of the search and summary requests fails
pub enum SummaryFailurePolicy {
    /// Any failure aborts the whole search attempt, nothing is updated
    #[default]
    FailFast,
    /// The successful half is still displayed, the failed half is reported
    Independent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchState {
    /// Query of the most recent search
    pub query: Option<String>,
    pub books: Vec<Book>,
    /// Query `books` were found for, lags behind `query` after a failed search
    pub books_query: Option<String>,
    /// Always belongs to `query` when present
    pub summary: Option<Summary>,
    pub books_loading: bool,
    pub summary_loading: bool,
    pub phase: SearchPhase,
    /// Sequence number of the search this state belongs to
    pub sequence: u64,
}

impl SearchState {
    /// Books to display next to `query`, empty when they were found for another query
    pub fn visible_books(&self) -> &[Book] {
        if self.books_query.is_some() && self.books_query == self.query {
            &self.books
        } else {
            &[]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank query, nothing was requested
    Rejected,
    Completed,
    /// Only one of books and summary was stored
    PartiallyCompleted,
    Failed,
    /// A newer search was issued before this one resolved, its results were dropped
    Superseded,
}

/// Runs catalog search and summary requests for user queries and keeps the displayed results
pub struct SearchOrchestrator {
    data_source: Arc<dyn CatalogDataSource>,
    notifier: Arc<dyn Notifier>,
    policy: SummaryFailurePolicy,
    sequence_generator: AtomicU64,
    state: parking_lot::Mutex<SearchState>,
}

impl SearchOrchestrator {
    pub fn new(
        data_source: Arc<dyn CatalogDataSource>,
        notifier: Arc<dyn Notifier>,
        policy: SummaryFailurePolicy,
    ) -> Self {
        Self {
            data_source,
            notifier,
            policy,
            sequence_generator: AtomicU64::new(0),
            state: Default::default(),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.lock().clone()
    }

    pub fn policy(&self) -> SummaryFailurePolicy {
        self.policy
    }

    /// Forgets results and summary; searches still in flight will be discarded
    pub fn reset(&self) {
        let sequence = self.sequence_generator.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.lock() = SearchState {
            sequence,
            ..SearchState::default()
        };
    }

    pub async fn run_search(&self, query: &str) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::Rejected;
        }

        let sequence = self.sequence_generator.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock();
            state.sequence = sequence;
            state.query = Some(query.to_string());
            state.summary = None;
            state.books_loading = true;
            state.summary_loading = true;
            state.phase = SearchPhase::Loading;
        }

        let (books, summary) = tokio::join!(
            self.data_source.search(query),
            self.data_source.fetch_summary(query)
        );

        let mut state = self.state.lock();
        if state.sequence != sequence {
            tracing::warn!(
                "Dropping results of search {} for {:?}, search {} is newer",
                sequence,
                query,
                state.sequence
            );
            return SearchOutcome::Superseded;
        }
        state.books_loading = false;
        state.summary_loading = false;

        let (outcome, notification) = match (books, summary, self.policy) {
            (Ok(books), Ok(summary), _) => {
                tracing::info!("Search {:?} found {} books", query, books.len());
                state.books = books;
                state.books_query = Some(query.to_string());
                state.summary = Some(summary);
                state.phase = SearchPhase::Succeeded;
                (
                    SearchOutcome::Completed,
                    Notification::success(
                        "AI Summary Generated",
                        "The AI has analyzed your search results.",
                    ),
                )
            }
            (Ok(books), Err(err), SummaryFailurePolicy::Independent) => {
                tracing::error!("Summary for {:?} failed {}", query, err);
                state.books = books;
                state.books_query = Some(query.to_string());
                state.phase = SearchPhase::Succeeded;
                (
                    SearchOutcome::PartiallyCompleted,
                    Notification::error(SUMMARY_FAILED),
                )
            }
            (Err(err), Ok(summary), SummaryFailurePolicy::Independent) => {
                tracing::error!("Search {:?} failed {}", query, err);
                // books of an earlier query must not sit next to this summary
                state.books.clear();
                state.books_query = None;
                state.summary = Some(summary);
                state.phase = SearchPhase::Failed;
                (
                    SearchOutcome::PartiallyCompleted,
                    Notification::error(SEARCH_FAILED),
                )
            }
            (books, summary, _) => {
                let description = if let Err(err) = &books {
                    tracing::error!("Search {:?} failed {}", query, err);
                    SEARCH_FAILED
                } else {
                    SUMMARY_FAILED
                };
                if let Err(err) = &summary {
                    tracing::error!("Summary for {:?} failed {}", query, err);
                }
                state.phase = SearchPhase::Failed;
                (SearchOutcome::Failed, Notification::error(description))
            }
        };
        drop(state);

        self.notifier.notify(notification);
        outcome
    }
}

#[cfg(test)]
mod search_orchestrator_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::notifications::NotificationLog;
    use crate::search::{SearchOrchestrator, SearchOutcome, SearchPhase, SummaryFailurePolicy};
    use crate::test_support::{FlakyCatalogDataSource, Operation};

    fn orchestrator(
        policy: SummaryFailurePolicy,
    ) -> (
        SearchOrchestrator,
        Arc<FlakyCatalogDataSource>,
        Arc<NotificationLog>,
    ) {
        let data_source = Arc::new(FlakyCatalogDataSource::with_fixture_books());
        let notifications = Arc::new(NotificationLog::default());
        (
            SearchOrchestrator::new(data_source.clone(), notifications.clone(), policy),
            data_source,
            notifications,
        )
    }

    fn titles(orchestrator: &SearchOrchestrator) -> Vec<String> {
        orchestrator
            .state()
            .books
            .iter()
            .map(|b| b.title.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_search_stores_books_and_summary() {
        let (search, _, notifications) = orchestrator(SummaryFailurePolicy::FailFast);

        assert_eq!(search.run_search("Orwell").await, SearchOutcome::Completed);

        let state = search.state();
        assert_eq!(titles(&search), vec!["1984"]);
        assert_eq!(state.books[0].author, "George Orwell");
        assert_eq!(state.query.as_deref(), Some("Orwell"));
        let summary = state.summary.expect("Summary missing");
        assert_eq!(summary.query, "Orwell");
        assert!(summary.text.contains("1949"));
        assert!(summary.text.contains("Dystopian"));
        assert!(summary.text.contains("Orwell"));
        assert!(!state.books_loading);
        assert!(!state.summary_loading);
        assert_eq!(state.phase, SearchPhase::Succeeded);

        let entries = notifications.entries();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_error());
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected_without_requests() {
        let (search, data_source, notifications) = orchestrator(SummaryFailurePolicy::FailFast);

        assert_eq!(search.run_search("   ").await, SearchOutcome::Rejected);
        assert_eq!(search.run_search("").await, SearchOutcome::Rejected);

        assert_eq!(data_source.calls(Operation::Search), 0);
        assert_eq!(data_source.calls(Operation::FetchSummary), 0);
        assert_eq!(search.state().phase, SearchPhase::Idle);
        assert!(notifications.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_search_clears_summary_while_loading() {
        let (search, data_source, _) = orchestrator(SummaryFailurePolicy::FailFast);
        search.run_search("Orwell").await;
        assert!(search.state().summary.is_some());

        data_source.delay_query("Hobbit", Duration::from_millis(100));
        let loading_snapshot = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            search.state()
        };
        let (outcome, loading_state) = tokio::join!(search.run_search("Hobbit"), loading_snapshot);

        assert_eq!(outcome, SearchOutcome::Completed);
        assert_eq!(loading_state.phase, SearchPhase::Loading);
        assert!(loading_state.summary.is_none());
        assert!(loading_state.books_loading);
        assert!(loading_state.summary_loading);
        assert_eq!(loading_state.query.as_deref(), Some("Hobbit"));
        assert_eq!(titles(&search), vec!["The Hobbit"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_earlier_search_is_discarded() {
        let (search, data_source, notifications) = orchestrator(SummaryFailurePolicy::FailFast);
        data_source.delay_query("Orwell", Duration::from_millis(200));
        data_source.delay_query("Hobbit", Duration::from_millis(10));

        let later_search = async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            search.run_search("Hobbit").await
        };
        let (first, second) = tokio::join!(search.run_search("Orwell"), later_search);

        assert_eq!(first, SearchOutcome::Superseded);
        assert_eq!(second, SearchOutcome::Completed);
        let state = search.state();
        assert_eq!(titles(&search), vec!["The Hobbit"]);
        assert_eq!(state.summary.unwrap().query, "Hobbit");
        assert_eq!(state.query.as_deref(), Some("Hobbit"));
        assert_eq!(notifications.entries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_earlier_search_is_discarded_too() {
        let (search, data_source, _) = orchestrator(SummaryFailurePolicy::FailFast);
        data_source.delay_query("Orwell", Duration::from_millis(20));
        data_source.delay_query("Hobbit", Duration::from_millis(100));

        let later_search = async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            search.run_search("Hobbit").await
        };
        let loading_snapshot = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            search.state()
        };
        let (first, second, between) =
            tokio::join!(search.run_search("Orwell"), later_search, loading_snapshot);

        assert_eq!(first, SearchOutcome::Superseded);
        assert_eq!(second, SearchOutcome::Completed);
        // the earlier answer arrived first but never became visible
        assert!(between.books.is_empty());
        assert!(between.summary.is_none());
        assert_eq!(titles(&search), vec!["The Hobbit"]);
    }

    #[tokio::test]
    async fn test_fail_fast_summary_failure_aborts_whole_search() {
        let (search, data_source, notifications) = orchestrator(SummaryFailurePolicy::FailFast);
        search.run_search("Orwell").await;
        notifications.drain();

        data_source.fail(Operation::FetchSummary);
        assert_eq!(search.run_search("Hobbit").await, SearchOutcome::Failed);

        let state = search.state();
        assert_eq!(titles(&search), vec!["1984"]);
        assert_eq!(state.books_query.as_deref(), Some("Orwell"));
        assert!(state.visible_books().is_empty());
        assert!(state.summary.is_none());
        assert!(!state.books_loading);
        assert!(!state.summary_loading);
        assert_eq!(state.phase, SearchPhase::Failed);

        let entries = notifications.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_error());
        assert_eq!(entries[0].description, "Failed to generate AI summary");
    }

    #[tokio::test]
    async fn test_fail_fast_search_failure_reports_search() {
        let (search, data_source, notifications) = orchestrator(SummaryFailurePolicy::FailFast);
        data_source.fail(Operation::Search);
        data_source.fail(Operation::FetchSummary);

        assert_eq!(search.run_search("Orwell").await, SearchOutcome::Failed);
        assert!(search.state().books.is_empty());
        assert_eq!(notifications.entries()[0].description, "Failed to search books");
    }

    #[tokio::test]
    async fn test_independent_policy_keeps_books_when_summary_fails() {
        let (search, data_source, notifications) =
            orchestrator(SummaryFailurePolicy::Independent);
        data_source.fail(Operation::FetchSummary);

        assert_eq!(
            search.run_search("Hobbit").await,
            SearchOutcome::PartiallyCompleted
        );

        let state = search.state();
        assert_eq!(titles(&search), vec!["The Hobbit"]);
        assert!(state.summary.is_none());
        assert!(!state.summary_loading);
        assert_eq!(state.phase, SearchPhase::Succeeded);
        let entries = notifications.entries();
        assert!(entries[0].is_error());
        assert_eq!(entries[0].description, "Failed to generate AI summary");
    }

    #[tokio::test]
    async fn test_independent_policy_keeps_summary_when_search_fails() {
        let (search, data_source, notifications) =
            orchestrator(SummaryFailurePolicy::Independent);
        data_source.fail(Operation::Search);

        assert_eq!(
            search.run_search("Orwell").await,
            SearchOutcome::PartiallyCompleted
        );

        let state = search.state();
        assert!(state.books.is_empty());
        assert_eq!(state.summary.unwrap().query, "Orwell");
        assert_eq!(state.phase, SearchPhase::Failed);
        assert_eq!(notifications.entries()[0].description, "Failed to search books");
    }

    #[tokio::test]
    async fn test_independent_search_failure_drops_books_of_previous_query() {
        let (search, data_source, _) = orchestrator(SummaryFailurePolicy::Independent);
        assert_eq!(search.run_search("Orwell").await, SearchOutcome::Completed);
        assert_eq!(titles(&search), vec!["1984"]);

        data_source.fail(Operation::Search);
        assert_eq!(
            search.run_search("Hobbit").await,
            SearchOutcome::PartiallyCompleted
        );

        let state = search.state();
        assert_eq!(state.query.as_deref(), Some("Hobbit"));
        assert_eq!(state.summary.as_ref().unwrap().query, "Hobbit");
        assert!(state.books.is_empty());
        assert_eq!(state.books_query, None);
        assert!(state.visible_books().is_empty());
    }

    #[tokio::test]
    async fn test_visible_books_follow_the_current_query() {
        let (search, data_source, _) = orchestrator(SummaryFailurePolicy::FailFast);
        search.run_search("Orwell").await;
        assert_eq!(search.state().visible_books().len(), 1);

        data_source.fail(Operation::Search);
        assert_eq!(search.run_search("Hobbit").await, SearchOutcome::Failed);
        let state = search.state();
        assert_eq!(state.query.as_deref(), Some("Hobbit"));
        assert!(state.visible_books().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_search_in_flight() {
        let (search, data_source, notifications) = orchestrator(SummaryFailurePolicy::FailFast);
        data_source.delay_query("Orwell", Duration::from_millis(100));

        let navigate_away = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            search.reset();
        };
        let (outcome, _) = tokio::join!(search.run_search("Orwell"), navigate_away);

        assert_eq!(outcome, SearchOutcome::Superseded);
        let state = search.state();
        assert_eq!(state.phase, SearchPhase::Idle);
        assert!(state.books.is_empty());
        assert!(state.summary.is_none());
        assert!(notifications.entries().is_empty());
    }
}
