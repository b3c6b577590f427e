use itertools::Itertools;

use crate::book::{Book, Summary};

/// Builds the summary text for a query and the books found for it.
/// Used by the in-memory catalog in place of the remote text-generation service.
pub fn generate_summary(query: &str, books: &[Book]) -> Summary {
    let text = match books {
        [] => format!(
            "I couldn't find any books matching \"{query}\". Try searching for a different term, \
             or check if there are any spelling errors in your query."
        ),
        [first, ..] => {
            let genres = books.iter().map(|b| b.genre.as_str()).unique().collect_vec();
            let authors = books.iter().map(|b| b.author.as_str()).unique().collect_vec();
            // non-empty, so min and max always exist
            let oldest = books.iter().map(|b| b.published_year).min().unwrap_or_default();
            let newest = books.iter().map(|b| b.published_year).max().unwrap_or_default();

            let genres_sentence = if genres.len() > 1 {
                format!(
                    "These books span across {} genres including {}.",
                    genres.len(),
                    genres.join(", ")
                )
            } else {
                format!("All of these books are in the {} genre.", genres[0])
            };
            let authors_phrase = if authors.len() > 1 {
                format!("authors such as {}", authors.join(", "))
            } else {
                authors[0].to_string()
            };

            format!(
                "I found {} books matching your search for \"{query}\". {genres_sentence} \
                 The collection features work by {authors_phrase}, with publication dates \
                 ranging from {oldest} to {newest}. \"{}\" is a noteworthy example that might \
                 interest you.",
                books.len(),
                first.title
            )
        }
    };

    Summary {
        query: query.to_string(),
        text,
    }
}
