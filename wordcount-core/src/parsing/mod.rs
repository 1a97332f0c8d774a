//! Collaborators used by the parser pool: content retrieval and tokenization.

pub mod fetch;
pub mod tokenize;

pub use fetch::{DocumentFetcher, HttpFetcher};
pub use tokenize::{HtmlTextTokenizer, Tokenizer, WhitespaceTokenizer};
