use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::book::{Book, BookDraft, Summary};
use crate::catalog_data_source::{
    BookPage, CatalogDataSource, CatalogError, CheckoutReceipt, InMemoryCatalogDataSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListPaged,
    Search,
    FetchSummary,
    FetchOne,
    Create,
    Update,
    Delete,
    Checkout,
}

/// Fixture catalog that can be told to fail or to answer slowly
pub struct FlakyCatalogDataSource {
    inner: InMemoryCatalogDataSource,
    failing: parking_lot::Mutex<HashSet<Operation>>,
    operation_delays: parking_lot::Mutex<HashMap<Operation, Duration>>,
    query_delays: parking_lot::Mutex<HashMap<String, Duration>>,
    calls: parking_lot::Mutex<HashMap<Operation, usize>>,
}

impl FlakyCatalogDataSource {
    pub fn with_fixture_books() -> Self {
        Self::new(InMemoryCatalogDataSource::with_fixture_books())
    }

    pub fn new(inner: InMemoryCatalogDataSource) -> Self {
        Self {
            inner,
            failing: Default::default(),
            operation_delays: Default::default(),
            query_delays: Default::default(),
            calls: Default::default(),
        }
    }

    pub fn fail(&self, operation: Operation) {
        self.failing.lock().insert(operation);
    }

    pub fn delay(&self, operation: Operation, delay: Duration) {
        self.operation_delays.lock().insert(operation, delay);
    }

    /// Both search and summary for `query` answer after `delay`
    pub fn delay_query(&self, query: &str, delay: Duration) {
        self.query_delays.lock().insert(query.to_string(), delay);
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.lock().get(&operation).cloned().unwrap_or_default()
    }

    async fn enter(&self, operation: Operation, query: Option<&str>) -> Result<(), CatalogError> {
        *self.calls.lock().entry(operation).or_default() += 1;

        let operation_delay = self.operation_delays.lock().get(&operation).cloned();
        let query_delay = query.and_then(|q| self.query_delays.lock().get(q).cloned());
        if let Some(delay) = operation_delay.into_iter().chain(query_delay).max() {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(&operation) {
            return Err(CatalogError::Status {
                status: 500,
                message: format!("injected {operation:?} failure"),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogDataSource for FlakyCatalogDataSource {
    async fn list_paged(&self, page: u32, page_size: u32) -> Result<BookPage, CatalogError> {
        self.enter(Operation::ListPaged, None).await?;
        self.inner.list_paged(page, page_size).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>, CatalogError> {
        self.enter(Operation::Search, Some(query)).await?;
        self.inner.search(query).await
    }

    async fn fetch_summary(&self, query: &str) -> Result<Summary, CatalogError> {
        self.enter(Operation::FetchSummary, Some(query)).await?;
        self.inner.fetch_summary(query).await
    }

    async fn fetch_one(&self, book_id: &str) -> Result<Book, CatalogError> {
        self.enter(Operation::FetchOne, None).await?;
        self.inner.fetch_one(book_id).await
    }

    async fn create(&self, draft: BookDraft) -> Result<Book, CatalogError> {
        self.enter(Operation::Create, None).await?;
        self.inner.create(draft).await
    }

    async fn update(&self, book_id: &str, draft: BookDraft) -> Result<(), CatalogError> {
        self.enter(Operation::Update, None).await?;
        self.inner.update(book_id, draft).await
    }

    async fn delete(&self, book_id: &str) -> Result<(), CatalogError> {
        self.enter(Operation::Delete, None).await?;
        self.inner.delete(book_id).await
    }

    async fn checkout(
        &self,
        book_id: &str,
        duration_days: u32,
    ) -> Result<CheckoutReceipt, CatalogError> {
        self.enter(Operation::Checkout, None).await?;
        self.inner.checkout(book_id, duration_days).await
    }
}
