pub use in_memory_catalog_data_source::InMemoryCatalogDataSource;
#[cfg(any(feature = "client", test))]
pub use remote_catalog_data_source::RemoteCatalogDataSource;

use chrono::NaiveDate;

use crate::api::CheckoutResponse;
use crate::book::{parse_wire_date, Book, BookDraft, BookId, Summary};

mod in_memory_catalog_data_source;
#[cfg(any(feature = "client", test))]
mod remote_catalog_data_source;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network failure {0}")]
    Network(String),

    #[error("Failed to deserialize response: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Invalid response {0}")]
    InvalidResponse(String),

    #[error("Invalid book id {0}")]
    InvalidBookId(BookId),

    #[error("Invalid pagination, page {page} with page size {page_size}")]
    InvalidPagination { page: u32, page_size: u32 },

    #[error("Book {0} is already checked out")]
    AlreadyCheckedOut(BookId),

    #[error("Other error {0}")]
    Other(String),
}

impl CatalogError {
    /// True for unsuccessful HTTP statuses and transport failures
    pub fn is_network(&self) -> bool {
        matches!(self, CatalogError::Status { .. } | CatalogError::Network(_))
    }
}

#[cfg(any(feature = "client", test))]
impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Network(err.to_string())
    }
}

#[cfg(any(feature = "client", test))]
impl From<reqwest_middleware::Error> for CatalogError {
    fn from(err: reqwest_middleware::Error) -> Self {
        CatalogError::Network(err.to_string())
    }
}

/// Zero-based offset of the first record of a 1-indexed page
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(page_size)
}

pub(crate) fn validate_pagination(page: u32, page_size: u32) -> Result<(), CatalogError> {
    if page == 0 || page_size == 0 {
        return Err(CatalogError::InvalidPagination { page, page_size });
    }
    Ok(())
}

/// The live service identifies books by integers
pub(crate) fn numeric_book_id(book_id: &str) -> Result<u64, CatalogError> {
    book_id
        .trim()
        .parse()
        .map_err(|_| CatalogError::InvalidBookId(book_id.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
/// One page of the catalog listing
pub struct BookPage {
    pub books: Vec<Book>,
    /// Number of books in the whole catalog
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a successful checkout
pub struct CheckoutReceipt {
    pub checkout_date: NaiveDate,
    pub due_date: NaiveDate,
    pub message: Option<String>,
}

impl TryFrom<CheckoutResponse> for CheckoutReceipt {
    type Error = CatalogError;

    fn try_from(response: CheckoutResponse) -> Result<Self, Self::Error> {
        let parse = |field: &str, value: Option<String>| {
            value
                .as_deref()
                .and_then(parse_wire_date)
                .ok_or_else(|| {
                    CatalogError::InvalidResponse(format!("checkout {field} {value:?}"))
                })
        };
        Ok(CheckoutReceipt {
            checkout_date: parse("checkout_date", response.checkout_date)?,
            due_date: parse("due_date", response.due_date)?,
            message: response.message.filter(|message| !message.is_empty()),
        })
    }
}

#[async_trait::async_trait]
pub trait CatalogDataSource: Send + Sync {
    /// Lists one page of books, `page` is 1-indexed
    async fn list_paged(&self, page: u32, page_size: u32) -> Result<BookPage, CatalogError>;
    /// Searches the catalog, the query must not be blank
    async fn search(&self, query: &str) -> Result<Vec<Book>, CatalogError>;
    /// Retrieves a natural-language summary for the query
    async fn fetch_summary(&self, query: &str) -> Result<Summary, CatalogError>;
    /// Retrieves a single book
    async fn fetch_one(&self, book_id: &str) -> Result<Book, CatalogError>;
    /// Adds a book, returns it with the id assigned by the catalog
    async fn create(&self, draft: BookDraft) -> Result<Book, CatalogError>;
    /// Replaces the editable fields of a book
    async fn update(&self, book_id: &str, draft: BookDraft) -> Result<(), CatalogError>;
    /// Removes a book from the catalog
    async fn delete(&self, book_id: &str) -> Result<(), CatalogError>;
    /// Checks a book out for `duration_days`
    async fn checkout(
        &self,
        book_id: &str,
        duration_days: u32,
    ) -> Result<CheckoutReceipt, CatalogError>;
}
