use std::time::Duration;

use anyhow::Context;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;

use crate::api::{
    ApiBook, CheckoutRequest, CheckoutResponse, ListBooksResponse, RagResponse,
};
use crate::book::{Book, BookDraft, CheckoutStatus, Summary};
use crate::catalog_data_source::{
    numeric_book_id, page_offset, validate_pagination, BookPage, CatalogDataSource,
    CatalogError, CheckoutReceipt,
};

/// Catalog backed by the remote book service
pub struct RemoteCatalogDataSource {
    url: String,
    client: ClientWithMiddleware,
}

impl RemoteCatalogDataSource {
    pub fn new(url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Malformed bodies are decode failures, not network failures
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CatalogError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

async fn error_from_response(response: reqwest::Response) -> CatalogError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    CatalogError::Status { status, message }
}

#[async_trait::async_trait]
impl CatalogDataSource for RemoteCatalogDataSource {
    /// Calls GET /books?limit=&offset= endpoint
    async fn list_paged(&self, page: u32, page_size: u32) -> Result<BookPage, CatalogError> {
        validate_pagination(page, page_size)?;
        let offset = page_offset(page, page_size);
        tracing::debug!("Listing books limit {} offset {}", page_size, offset);

        let response = self
            .client
            .get(format!("{}/books", self.url))
            .query(&[("limit", u64::from(page_size)), ("offset", offset)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let listing: ListBooksResponse = read_json(response).await?;
        Ok(BookPage {
            total: listing.total,
            books: listing.books.into_iter().map(Book::from).collect(),
        })
    }

    /// Calls GET /search?query= endpoint
    async fn search(&self, query: &str) -> Result<Vec<Book>, CatalogError> {
        let response = self
            .client
            .get(format!("{}/search", self.url))
            .query(&[("query", query)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let books: Vec<ApiBook> = read_json(response).await?;
        Ok(books.into_iter().map(Book::from).collect())
    }

    /// Calls GET /rag?query= endpoint
    async fn fetch_summary(&self, query: &str) -> Result<Summary, CatalogError> {
        let response = self
            .client
            .get(format!("{}/rag", self.url))
            .query(&[("query", query)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let rag: RagResponse = read_json(response).await?;
        Ok(Summary::from_rag(query, rag))
    }

    /// Calls GET /books/{id} endpoint
    /// Returns NotFound if the book is not in the catalog
    async fn fetch_one(&self, book_id: &str) -> Result<Book, CatalogError> {
        let id = numeric_book_id(book_id)?;
        let response = self
            .client
            .get(format!("{}/books/{}", self.url, id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(book_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let book: ApiBook = read_json(response).await?;
        Ok(Book::from(book))
    }

    /// Calls POST /books/create endpoint
    /// Returns the created book with id assigned by the service
    async fn create(&self, draft: BookDraft) -> Result<Book, CatalogError> {
        let response = self
            .client
            .post(format!("{}/books/create", self.url))
            .json(&draft.to_create_request())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let created: ApiBook = read_json(response).await?;
        if created.id.is_none() {
            return Err(CatalogError::InvalidResponse(
                "created book has no id".to_string(),
            ));
        }
        let mut book = Book::from(created);
        // a freshly created book is never checked out
        if book.status == CheckoutStatus::Unknown {
            book.status = CheckoutStatus::Available;
        }
        Ok(book)
    }

    /// Calls POST /books/update endpoint, the response body is ignored
    async fn update(&self, book_id: &str, draft: BookDraft) -> Result<(), CatalogError> {
        let id = numeric_book_id(book_id)?;
        let response = self
            .client
            .post(format!("{}/books/update", self.url))
            .json(&draft.to_update_request(id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(book_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Calls DELETE /books/{id} endpoint
    async fn delete(&self, book_id: &str) -> Result<(), CatalogError> {
        let id = numeric_book_id(book_id)?;
        let response = self
            .client
            .delete(format!("{}/books/{}", self.url, id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(book_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Calls POST /books/checkout endpoint
    async fn checkout(
        &self,
        book_id: &str,
        duration_days: u32,
    ) -> Result<CheckoutReceipt, CatalogError> {
        let request = CheckoutRequest {
            book_id: numeric_book_id(book_id)?,
            days: duration_days,
        };
        let response = self
            .client
            .post(format!("{}/books/checkout", self.url))
            .json(&request)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(book_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let checkout: CheckoutResponse = read_json(response).await?;
        CheckoutReceipt::try_from(checkout)
    }
}
