use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::book::{Book, BookDraft};
use crate::catalog_data_source::{page_offset, CatalogDataSource};
use crate::notifications::{Notification, Notifier};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Page size {0} is not one of 5, 10, 20, 50")]
pub struct InvalidPageSize(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    Five,
    #[default]
    Ten,
    Twenty,
    Fifty,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Five,
        PageSize::Ten,
        PageSize::Twenty,
        PageSize::Fifty,
    ];

    pub fn get(self) -> u32 {
        match self {
            PageSize::Five => 5,
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = InvalidPageSize;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.get() == value)
            .ok_or(InvalidPageSize(value))
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

/// Number of pages needed for `total` records
pub fn page_count(total: u64, page_size: PageSize) -> u32 {
    total.div_ceil(u64::from(page_size.get())) as u32
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminState {
    /// Records of the current page
    pub books: Vec<Book>,
    /// Number of records in the whole catalog, as last reported
    pub total: u64,
    /// 1-indexed
    pub current_page: u32,
    pub page_size: PageSize,
    pub loading: bool,
}

impl AdminState {
    fn new(page_size: PageSize) -> Self {
        Self {
            books: vec![],
            total: 0,
            current_page: 1,
            page_size,
            loading: false,
        }
    }

    pub fn page_count(&self) -> u32 {
        page_count(self.total, self.page_size)
    }

    pub fn offset(&self) -> u64 {
        page_offset(self.current_page, self.page_size.get())
    }

    /// First and last record number shown, `(0, 0)` for an empty catalog
    pub fn range(&self) -> (u64, u64) {
        if self.total == 0 {
            return (0, 0);
        }
        let end = (u64::from(self.current_page) * u64::from(self.page_size.get())).min(self.total);
        (self.offset() + 1, end)
    }

    pub fn range_label(&self) -> String {
        let (start, end) = self.range();
        format!("Showing {}-{} of {} books", start, end, self.total)
    }

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.current_page, self.page_count())
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.page_count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOutcome {
    Applied,
    /// Nothing to do, e.g. next page on the last page
    Unchanged,
    Failed,
}

/// Paginated catalog listing with add, update and delete
pub struct AdminOrchestrator {
    data_source: Arc<dyn CatalogDataSource>,
    notifier: Arc<dyn Notifier>,
    state: parking_lot::Mutex<AdminState>,
}

impl AdminOrchestrator {
    pub fn new(
        data_source: Arc<dyn CatalogDataSource>,
        notifier: Arc<dyn Notifier>,
        page_size: PageSize,
    ) -> Self {
        Self {
            data_source,
            notifier,
            state: parking_lot::Mutex::new(AdminState::new(page_size)),
        }
    }

    pub fn state(&self) -> AdminState {
        self.state.lock().clone()
    }

    /// Loads the current page
    pub async fn load(&self) -> AdminOutcome {
        let (page, page_size) = self.position();
        self.load_page(page, page_size).await
    }

    /// Loads the given page, pages past the end are clamped to the last one
    pub async fn go_to_page(&self, page: u32) -> AdminOutcome {
        let (_, page_size) = self.position();
        self.load_page(page.max(1), page_size).await
    }

    pub async fn next_page(&self) -> AdminOutcome {
        let (state_has_next, page, page_size) = {
            let state = self.state.lock();
            (state.has_next(), state.current_page, state.page_size)
        };
        if !state_has_next {
            return AdminOutcome::Unchanged;
        }
        self.load_page(page + 1, page_size).await
    }

    pub async fn prev_page(&self) -> AdminOutcome {
        let (page, page_size) = self.position();
        if page <= 1 {
            return AdminOutcome::Unchanged;
        }
        self.load_page(page - 1, page_size).await
    }

    /// Switches page size and goes back to the first page
    pub async fn set_page_size(&self, page_size: PageSize) -> AdminOutcome {
        self.load_page(1, page_size).await
    }

    pub async fn add_book(&self, draft: BookDraft) -> AdminOutcome {
        if let Err(err) = draft.validate() {
            tracing::warn!("Rejected new book {:?}: {}", draft.title, err);
            self.notifier
                .notify(Notification::error(format!("Failed to add book: {err}")));
            return AdminOutcome::Failed;
        }
        let book = match self.data_source.create(draft).await {
            Ok(book) => book,
            Err(err) => {
                tracing::error!("Add book failed {}", err);
                self.notifier.notify(Notification::error("Failed to add book"));
                return AdminOutcome::Failed;
            }
        };
        tracing::info!("Added book {}", book.id);

        let (was_on_first_page, page_size) = {
            let mut state = self.state.lock();
            state.books.push(book.clone());
            state.total += 1;
            let was_on_first_page = state.current_page == 1;
            state.current_page = 1;
            (was_on_first_page, state.page_size)
        };
        self.notifier.notify(Notification::success(
            "Book Added",
            format!("\"{}\" has been successfully added.", book.title),
        ));

        if !was_on_first_page && self.load_page(1, page_size).await == AdminOutcome::Applied {
            let mut state = self.state.lock();
            // the catalog usually lists new books last, keep it visible
            if !state.books.iter().any(|b| b.id == book.id) {
                state.books.push(book);
            }
        }
        AdminOutcome::Applied
    }

    pub async fn update_book(&self, book_id: &str, draft: BookDraft) -> AdminOutcome {
        if let Err(err) = draft.validate() {
            tracing::warn!("Rejected update of book {}: {}", book_id, err);
            self.notifier
                .notify(Notification::error(format!("Failed to update book: {err}")));
            return AdminOutcome::Failed;
        }
        if let Err(err) = self.data_source.update(book_id, draft.clone()).await {
            tracing::error!("Update book {} failed {}", book_id, err);
            self.notifier
                .notify(Notification::error("Failed to update book"));
            return AdminOutcome::Failed;
        }
        tracing::info!("Updated book {}", book_id);

        let title = draft.title.clone();
        if let Some(book) = self
            .state
            .lock()
            .books
            .iter_mut()
            .find(|b| b.id == book_id)
        {
            book.apply_draft(draft);
        }
        self.notifier.notify(Notification::success(
            "Book Updated",
            format!("\"{title}\" has been successfully updated."),
        ));
        AdminOutcome::Applied
    }

    pub async fn delete_book(&self, book_id: &str) -> AdminOutcome {
        let title = self
            .state
            .lock()
            .books
            .iter()
            .find(|b| b.id == book_id)
            .map(|b| b.title.clone());

        if let Err(err) = self.data_source.delete(book_id).await {
            tracing::error!("Delete book {} failed {}", book_id, err);
            self.notifier
                .notify(Notification::error("Failed to delete book"));
            return AdminOutcome::Failed;
        }
        tracing::info!("Deleted book {}", book_id);

        let page_to_reload = {
            let mut state = self.state.lock();
            state.books.retain(|b| b.id != book_id);
            state.total = state.total.saturating_sub(1);
            let max_page = state.page_count().max(1);
            if state.books.is_empty() && state.current_page > 1 && state.current_page > max_page
            {
                state.current_page = (state.current_page - 1).min(max_page);
                Some((state.current_page, state.page_size))
            } else {
                None
            }
        };
        self.notifier.notify(Notification::destructive(
            "Book Deleted",
            match title {
                Some(title) => format!("\"{title}\" has been successfully removed."),
                None => "The book has been removed.".to_string(),
            },
        ));

        if let Some((page, page_size)) = page_to_reload {
            self.load_page(page, page_size).await;
        }
        AdminOutcome::Applied
    }

    fn position(&self) -> (u32, PageSize) {
        let state = self.state.lock();
        (state.current_page, state.page_size)
    }

    async fn load_page(&self, page: u32, page_size: PageSize) -> AdminOutcome {
        self.state.lock().loading = true;

        let mut page = page;
        let mut result = self.data_source.list_paged(page, page_size.get()).await;
        if let Ok(listing) = &result {
            let last_page = page_count(listing.total, page_size);
            if page > last_page && last_page >= 1 {
                tracing::info!("Page {} is past the end, loading page {}", page, last_page);
                page = last_page;
                result = self.data_source.list_paged(page, page_size.get()).await;
            }
        }

        let mut state = self.state.lock();
        state.loading = false;
        match result {
            Ok(listing) => {
                state.books = listing.books;
                state.total = listing.total;
                state.current_page = page;
                state.page_size = page_size;
                AdminOutcome::Applied
            }
            Err(err) => {
                drop(state);
                tracing::error!("Loading page {} failed {}", page, err);
                self.notifier
                    .notify(Notification::error("Failed to load books"));
                AdminOutcome::Failed
            }
        }
    }
}
