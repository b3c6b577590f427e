use std::sync::Arc;

use crate::book::{Book, BookId, CheckoutStatus};
use crate::catalog_data_source::{CatalogDataSource, CatalogError, CheckoutReceipt};
use crate::notifications::{Notification, Notifier};

pub const DEFAULT_CHECKOUT_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DetailView {
    #[default]
    Idle,
    Loading,
    Loaded(Book),
    NotFound(BookId),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailState {
    pub view: DetailView,
    /// The checkout confirmation is waiting for an answer
    pub confirmation_open: bool,
    pub checking_out: bool,
}

impl DetailState {
    pub fn book(&self) -> Option<&Book> {
        match &self.view {
            DetailView::Loaded(book) => Some(book),
            _ => None,
        }
    }

    pub fn can_checkout(&self) -> bool {
        !self.checking_out
            && self
                .book()
                .is_some_and(|book| !book.is_checked_out())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    CheckedOut(CheckoutReceipt),
    /// The confirmation was not open, nothing was sent
    NotConfirmed,
    /// Another checkout is still running, nothing was sent
    InFlight,
    Failed,
}

/// Single book view with a confirmed checkout action
pub struct DetailOrchestrator {
    data_source: Arc<dyn CatalogDataSource>,
    notifier: Arc<dyn Notifier>,
    state: parking_lot::Mutex<DetailState>,
}

impl DetailOrchestrator {
    pub fn new(data_source: Arc<dyn CatalogDataSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            data_source,
            notifier,
            state: Default::default(),
        }
    }

    pub fn state(&self) -> DetailState {
        self.state.lock().clone()
    }

    pub async fn load_detail(&self, book_id: &str) -> DetailView {
        *self.state.lock() = DetailState {
            view: DetailView::Loading,
            ..DetailState::default()
        };

        let view = match self.data_source.fetch_one(book_id).await {
            Ok(book) => DetailView::Loaded(book),
            Err(CatalogError::NotFound(_)) => {
                tracing::warn!("Book {} not found", book_id);
                self.notifier
                    .notify(Notification::error("Failed to load book details"));
                DetailView::NotFound(book_id.to_string())
            }
            Err(err) => {
                tracing::error!("Get book {} failed {}", book_id, err);
                self.notifier
                    .notify(Notification::error("Failed to load book details"));
                DetailView::Failed
            }
        };
        self.state.lock().view = view.clone();
        view
    }

    /// Asks for confirmation, returns false if the loaded book cannot be checked out
    pub fn open_checkout_confirmation(&self) -> bool {
        let mut state = self.state.lock();
        if !state.can_checkout() {
            return false;
        }
        state.confirmation_open = true;
        true
    }

    pub fn cancel_checkout(&self) {
        self.state.lock().confirmation_open = false;
    }

    /// Sends the checkout once the confirmation is open. The confirmation closes whatever the result.
    pub async fn confirm_checkout(&self, duration_days: u32) -> CheckoutOutcome {
        let book_id = {
            let mut state = self.state.lock();
            if state.checking_out {
                return CheckoutOutcome::InFlight;
            }
            if !state.confirmation_open {
                return CheckoutOutcome::NotConfirmed;
            }
            let Some(book_id) = state.book().map(|book| book.id.clone()) else {
                state.confirmation_open = false;
                return CheckoutOutcome::NotConfirmed;
            };
            state.checking_out = true;
            book_id
        };

        let result = self.data_source.checkout(&book_id, duration_days).await;

        let mut state = self.state.lock();
        state.checking_out = false;
        state.confirmation_open = false;
        match result {
            Ok(receipt) => {
                if let DetailView::Loaded(book) = &mut state.view {
                    if book.id == book_id {
                        book.status = CheckoutStatus::CheckedOut {
                            checkout_date: receipt.checkout_date,
                            due_date: receipt.due_date,
                        };
                    }
                }
                drop(state);
                tracing::info!("Checked out book {} until {}", book_id, receipt.due_date);
                self.notifier.notify(Notification::success(
                    "Success",
                    receipt
                        .message
                        .clone()
                        .unwrap_or_else(|| "Book has been checked out successfully.".to_string()),
                ));
                CheckoutOutcome::CheckedOut(receipt)
            }
            Err(err) => {
                drop(state);
                tracing::error!("Checkout of book {} failed {}", book_id, err);
                self.notifier.notify(Notification::error(
                    "Failed to check out the book. Please try again.",
                ));
                CheckoutOutcome::Failed
            }
        }
    }
}
