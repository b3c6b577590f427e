use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;

use crate::api::{ApiBook, WireBookId};
use crate::book::{year_to_publish_date, Book, BookDraft, Summary};
use crate::catalog_data_source::{
    numeric_book_id, validate_pagination, BookPage, CatalogDataSource, CatalogError,
    CheckoutReceipt,
};
use crate::summary::generate_summary;

struct FixtureBook {
    title: &'static str,
    author: &'static str,
    description: &'static str,
    published_year: i32,
    genre: &'static str,
    isbn: &'static str,
}

const FIXTURE_BOOKS: [FixtureBook; 5] = [
    FixtureBook {
        title: "To Kill a Mockingbird",
        author: "Harper Lee",
        description: "The unforgettable novel of a childhood in a sleepy Southern town and the crisis of conscience that rocked it. 'To Kill A Mockingbird' became both an instant bestseller and a critical success when it was first published in 1960.",
        published_year: 1960,
        genre: "Fiction",
        isbn: "978-0061120084",
    },
    FixtureBook {
        title: "1984",
        author: "George Orwell",
        description: "Winston Smith toes the Party line, rewriting history to satisfy the demands of the Ministry of Truth. With each lie he writes, Winston grows to hate the Party that seeks power for its own sake and persecutes those who dare to commit thoughtcrimes.",
        published_year: 1949,
        genre: "Dystopian",
        isbn: "978-0451524935",
    },
    FixtureBook {
        title: "The Great Gatsby",
        author: "F. Scott Fitzgerald",
        description: "The story of the fabulously wealthy Jay Gatsby and his love for the beautiful Daisy Buchanan, of lavish parties on Long Island at a time when The New York Times noted 'gin was the national drink and sex the national obsession.'",
        published_year: 1925,
        genre: "Fiction",
        isbn: "978-0743273565",
    },
    FixtureBook {
        title: "Pride and Prejudice",
        author: "Jane Austen",
        description: "Since its immediate success in 1813, Pride and Prejudice has remained one of the most popular novels in the English language. Jane Austen called this brilliant work 'her own darling child.'",
        published_year: 1813,
        genre: "Romance",
        isbn: "978-0486284736",
    },
    FixtureBook {
        title: "The Hobbit",
        author: "J.R.R. Tolkien",
        description: "Bilbo Baggins is a hobbit who enjoys a comfortable, unambitious life, rarely traveling any farther than his pantry or cellar. But his contentment is disturbed when the wizard Gandalf and a company of dwarves arrive on his doorstep.",
        published_year: 1937,
        genre: "Fantasy",
        isbn: "978-0547928227",
    },
];

/// Catalog kept in process memory, stored in the same shape the remote service sends
pub struct InMemoryCatalogDataSource {
    book_sequence_generator: AtomicU64,
    books: parking_lot::RwLock<BTreeMap<u64, ApiBook>>,
    simulated_latency: Duration,
}

impl Default for InMemoryCatalogDataSource {
    fn default() -> Self {
        Self {
            book_sequence_generator: AtomicU64::new(1),
            books: Default::default(),
            simulated_latency: Duration::ZERO,
        }
    }
}

impl InMemoryCatalogDataSource {
    /// Catalog seeded with the bundled fixture books, ids 1 to 5
    pub fn with_fixture_books() -> Self {
        let result = Self::default();
        for fixture in FIXTURE_BOOKS.iter() {
            let draft = BookDraft {
                title: fixture.title.to_string(),
                author: fixture.author.to_string(),
                description: fixture.description.to_string(),
                genre: fixture.genre.to_string(),
                published_year: fixture.published_year,
                isbn: fixture.isbn.to_string(),
                ..BookDraft::default()
            };
            result.insert(&draft);
        }
        result
    }

    /// Every call waits `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = latency;
        self
    }

    fn insert(&self, draft: &BookDraft) -> ApiBook {
        let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
        let record = ApiBook {
            id: Some(WireBookId::Number(id)),
            title: Some(draft.title.clone()),
            author: Some(draft.author.clone()),
            description: Some(draft.description.clone()),
            publish_date: Some(year_to_publish_date(draft.published_year)),
            genre: Some(draft.genre.clone()),
            isbn: Some(draft.isbn.clone()),
            pages: draft.pages,
            language: draft.language.clone(),
            publisher: draft.publisher.clone(),
            rating: draft.rating,
            checked_out: Some(false),
            checkout_date: None,
            due_date: None,
        };
        self.books.write().insert(id, record.clone());
        record
    }

    async fn simulate_latency(&self) {
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }
    }

    fn matching_books(&self, query: &str) -> Vec<Book> {
        let query = query.trim().to_lowercase();
        let matches = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&query))
        };
        self.books
            .read()
            .values()
            .filter(|book| matches(&book.title) || matches(&book.author) || matches(&book.genre))
            .cloned()
            .map(Book::from)
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogDataSource for InMemoryCatalogDataSource {
    async fn list_paged(&self, page: u32, page_size: u32) -> Result<BookPage, CatalogError> {
        validate_pagination(page, page_size)?;
        self.simulate_latency().await;

        let books = self.books.read();
        Ok(BookPage {
            total: books.len() as u64,
            books: books
                .values()
                .skip((page as usize - 1) * page_size as usize)
                .take(page_size as usize)
                .cloned()
                .map(Book::from)
                .collect(),
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<Book>, CatalogError> {
        self.simulate_latency().await;
        Ok(self.matching_books(query))
    }

    async fn fetch_summary(&self, query: &str) -> Result<Summary, CatalogError> {
        self.simulate_latency().await;
        Ok(generate_summary(query, &self.matching_books(query)))
    }

    async fn fetch_one(&self, book_id: &str) -> Result<Book, CatalogError> {
        self.simulate_latency().await;
        let id = numeric_book_id(book_id)
            .map_err(|_| CatalogError::NotFound(book_id.to_string()))?;
        self.books
            .read()
            .get(&id)
            .cloned()
            .map(Book::from)
            .ok_or_else(|| CatalogError::NotFound(book_id.to_string()))
    }

    async fn create(&self, draft: BookDraft) -> Result<Book, CatalogError> {
        self.simulate_latency().await;
        Ok(Book::from(self.insert(&draft)))
    }

    async fn update(&self, book_id: &str, draft: BookDraft) -> Result<(), CatalogError> {
        self.simulate_latency().await;
        let id = numeric_book_id(book_id)?;
        let mut locked_books = self.books.write();
        if let Some(book) = locked_books.get_mut(&id) {
            let mut result_book = json!(book);
            json_patch::merge(&mut result_book, &json!(draft.to_update_request(id).book));
            *book = serde_json::from_value(result_book)?;
            Ok(())
        } else {
            Err(CatalogError::NotFound(book_id.to_string()))
        }
    }

    async fn delete(&self, book_id: &str) -> Result<(), CatalogError> {
        self.simulate_latency().await;
        let id = numeric_book_id(book_id)?;
        self.books
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CatalogError::NotFound(book_id.to_string()))
    }

    async fn checkout(
        &self,
        book_id: &str,
        duration_days: u32,
    ) -> Result<CheckoutReceipt, CatalogError> {
        self.simulate_latency().await;
        let id = numeric_book_id(book_id)?;
        let mut locked_books = self.books.write();
        let book = locked_books
            .get_mut(&id)
            .ok_or_else(|| CatalogError::NotFound(book_id.to_string()))?;
        if book.checked_out == Some(true) {
            return Err(CatalogError::AlreadyCheckedOut(book_id.to_string()));
        }

        let checkout_date = chrono::Local::now().date_naive();
        let due_date = checkout_date + chrono::Days::new(u64::from(duration_days));
        book.checked_out = Some(true);
        book.checkout_date = Some(checkout_date.to_string());
        book.due_date = Some(due_date.to_string());

        Ok(CheckoutReceipt {
            checkout_date,
            due_date,
            message: Some(format!(
                "Book {} checked out until {}",
                book.title.as_deref().unwrap_or_default(),
                due_date
            )),
        })
    }
}
