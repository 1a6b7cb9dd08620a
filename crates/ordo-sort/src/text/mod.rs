//! Text analysis of object definitions.
//!
//! [`comment`] strips comments and splits identifiers; [`extract`] turns the
//! identifiers naming other objects of the batch into code dependencies.

pub mod comment;
pub mod extract;

pub use comment::{
    ScanError, Token, TokenKind, remove_comments, split_tokens, strip_comments,
    tokenize,
};
pub use extract::{TextDependencyExtractable, TextDependencyExtractor};
