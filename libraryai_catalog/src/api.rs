use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier as sent by the catalog service; the live service uses integers
/// but string ids are accepted as well.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(untagged)]
pub enum WireBookId {
    Number(u64),
    Text(String),
}

impl fmt::Display for WireBookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireBookId::Number(id) => write!(f, "{id}"),
            WireBookId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
/// Book object returned by GET /books, GET /books/{id}, GET /search and POST /books/create.
/// Every field except the id is optional on the wire.
pub struct ApiBook {
    pub id: Option<WireBookId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// ISO date, the year is the only part that is displayed
    #[serde(default)]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub checked_out: Option<bool>,
    #[serde(default)]
    pub checkout_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
/// Response of GET /books?limit=&offset=
pub struct ListBooksResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub books: Vec<ApiBook>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Body of POST /books/create
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub publish_date: String,
    pub isbn: String,
    pub description: String,
    pub publisher: String,
    pub pages: u32,
    pub language: String,
    pub rating: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Body of POST /books/update, the book fields plus the id of the book to update
pub struct UpdateBookRequest {
    #[serde(flatten)]
    pub book: CreateBookRequest,
    pub book_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Body of POST /books/checkout
pub struct CheckoutRequest {
    pub book_id: u64,
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
/// Response of POST /books/checkout
pub struct CheckoutResponse {
    #[serde(default)]
    pub checkout_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
/// Response of GET /rag?query=
pub struct RagResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub response: String,
}
