//! Library-side media records

pub mod library;

pub use library::{EntryStatus, LibraryEntry, LibraryItem, LibraryKind};
