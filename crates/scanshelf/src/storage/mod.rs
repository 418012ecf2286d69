pub mod filesystem;

pub use filesystem::{FileResolver, PDF_EXTENSION};
