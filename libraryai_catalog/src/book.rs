use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::api::{ApiBook, CreateBookRequest, RagResponse, UpdateBookRequest};

pub type BookId = String;

const COVER_URL_BASE: &str = "https://picsum.photos/seed";
const DEFAULT_LANGUAGE: &str = "English";
const DEFAULT_CREATE_RATING: f32 = 3.0;
const DEFAULT_UPDATE_RATING: f32 = 0.0;
const MAX_RATING: f32 = 5.0;

/// Cover image reference for a book. The catalog service never provides covers,
/// so the image is derived from the id: the same id always yields the same cover.
pub fn cover_url_for(book_id: &str) -> String {
    format!("{COVER_URL_BASE}/{book_id}/600/900")
}

/// Year-only published dates are stored by the service as the first day of that year
pub fn year_to_publish_date(year: i32) -> String {
    format!("{year:04}-01-01")
}

/// Extracts the year from a publish date, 0 if the date is missing or unreadable
pub fn publish_date_to_year(publish_date: &str) -> i32 {
    if let Some(date) = parse_wire_date(publish_date) {
        return date.year();
    }
    let digits: String = publish_date
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or_default()
}

/// Parses a date sent by the service, accepting plain dates and full timestamps
pub fn parse_wire_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|d| d.date())
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
/// Checkout state of a book. Dates only exist while the book is checked out.
pub enum CheckoutStatus {
    /// The service did not report a checkout state
    Unknown,
    Available,
    CheckedOut {
        checkout_date: NaiveDate,
        due_date: NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Display-ready book record
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: String,
    pub published_year: i32,
    pub isbn: String,
    pub cover_url: String,
    pub pages: Option<u32>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub rating: Option<f32>,
    pub status: CheckoutStatus,
}

impl Book {
    pub fn is_checked_out(&self) -> bool {
        matches!(self.status, CheckoutStatus::CheckedOut { .. })
    }

    pub fn checkout_date(&self) -> Option<NaiveDate> {
        match self.status {
            CheckoutStatus::CheckedOut { checkout_date, .. } => Some(checkout_date),
            _ => None,
        }
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        match self.status {
            CheckoutStatus::CheckedOut { due_date, .. } => Some(due_date),
            _ => None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.status {
            CheckoutStatus::Unknown => "Status unknown",
            CheckoutStatus::Available => "Available",
            CheckoutStatus::CheckedOut { .. } => "Checked Out",
        }
    }

    /// Rating rounded to whole stars, e.g. `★★★★☆`
    pub fn rating_stars(&self) -> String {
        let filled = self
            .rating
            .unwrap_or_default()
            .clamp(0.0, MAX_RATING)
            .round() as usize;
        format!(
            "{}{}",
            "★".repeat(filled),
            "☆".repeat(MAX_RATING as usize - filled)
        )
    }

    /// Editable fields of the book
    pub fn draft(&self) -> BookDraft {
        BookDraft {
            title: self.title.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            genre: self.genre.clone(),
            published_year: self.published_year,
            isbn: self.isbn.clone(),
            pages: self.pages,
            language: self.language.clone(),
            publisher: self.publisher.clone(),
            rating: self.rating,
        }
    }

    /// Replaces the editable fields, id, cover and checkout state are kept
    pub fn apply_draft(&mut self, draft: BookDraft) {
        self.title = draft.title;
        self.author = draft.author;
        self.description = draft.description;
        self.genre = draft.genre;
        self.published_year = draft.published_year;
        self.isbn = draft.isbn;
        self.pages = draft.pages;
        self.language = draft.language;
        self.publisher = draft.publisher;
        self.rating = draft.rating;
    }
}

impl From<ApiBook> for Book {
    fn from(api_book: ApiBook) -> Self {
        let id = api_book
            .id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let status = checkout_status_from_wire(
            &id,
            api_book.checked_out,
            api_book.checkout_date.as_deref(),
            api_book.due_date.as_deref(),
        );
        Book {
            cover_url: cover_url_for(&id),
            title: api_book.title.unwrap_or_default(),
            author: api_book.author.unwrap_or_default(),
            description: api_book.description.unwrap_or_default(),
            genre: api_book.genre.unwrap_or_default(),
            published_year: api_book
                .publish_date
                .as_deref()
                .map(publish_date_to_year)
                .unwrap_or_default(),
            isbn: api_book.isbn.unwrap_or_default(),
            pages: api_book.pages,
            language: api_book.language,
            publisher: api_book.publisher,
            rating: api_book.rating,
            status,
            id,
        }
    }
}

fn checkout_status_from_wire(
    book_id: &str,
    checked_out: Option<bool>,
    checkout_date: Option<&str>,
    due_date: Option<&str>,
) -> CheckoutStatus {
    match checked_out {
        None => CheckoutStatus::Unknown,
        Some(false) => CheckoutStatus::Available,
        Some(true) => match (
            checkout_date.and_then(parse_wire_date),
            due_date.and_then(parse_wire_date),
        ) {
            (Some(checkout_date), Some(due_date)) => CheckoutStatus::CheckedOut {
                checkout_date,
                due_date,
            },
            _ => {
                tracing::warn!(
                    "Book {} reported as checked out without valid dates ({:?}, {:?})",
                    book_id,
                    checkout_date,
                    due_date
                );
                CheckoutStatus::Unknown
            }
        },
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
/// Book fields entered by an administrator, everything but the id
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: String,
    pub published_year: i32,
    pub isbn: String,
    pub pages: Option<u32>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub rating: Option<f32>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidBookDraft {
    #[error("missing {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

impl BookDraft {
    /// Title, author, published year, genre, ISBN and description are required
    pub fn validate(&self) -> Result<(), InvalidBookDraft> {
        let blank = |value: &str| value.trim().is_empty();
        let missing: Vec<&'static str> = [
            ("title", blank(&self.title)),
            ("author", blank(&self.author)),
            ("published year", self.published_year <= 0),
            ("genre", blank(&self.genre)),
            ("isbn", blank(&self.isbn)),
            ("description", blank(&self.description)),
        ]
        .into_iter()
        .filter_map(|(field, is_missing)| is_missing.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(InvalidBookDraft::MissingFields(missing))
        }
    }

    pub fn to_create_request(&self) -> CreateBookRequest {
        self.to_request(DEFAULT_CREATE_RATING)
    }

    pub fn to_update_request(&self, book_id: u64) -> UpdateBookRequest {
        UpdateBookRequest {
            book: self.to_request(DEFAULT_UPDATE_RATING),
            book_id,
        }
    }

    fn to_request(&self, default_rating: f32) -> CreateBookRequest {
        CreateBookRequest {
            title: self.title.clone(),
            author: self.author.clone(),
            genre: self.genre.clone(),
            publish_date: year_to_publish_date(self.published_year),
            isbn: self.isbn.clone(),
            description: self.description.clone(),
            publisher: self.publisher.clone().unwrap_or_default(),
            pages: self.pages.unwrap_or_default(),
            language: self
                .language
                .clone()
                .filter(|language| !language.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            // zero counts as not provided
            rating: self
                .rating
                .filter(|rating| *rating != 0.0)
                .unwrap_or(default_rating),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Natural-language summary produced for exactly one search query
pub struct Summary {
    pub query: String,
    pub text: String,
}

impl Summary {
    /// The summary always belongs to the query that was asked, whatever the service echoes back
    pub fn from_rag(requested_query: &str, response: RagResponse) -> Self {
        if !response.query.is_empty() && response.query != requested_query {
            tracing::warn!(
                "Summary service answered query {:?} for request {:?}",
                response.query,
                requested_query
            );
        }
        Summary {
            query: requested_query.to_string(),
            text: response.response,
        }
    }
}
