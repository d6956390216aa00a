pub mod documents;
pub mod outputs;

pub use documents::{
    DocumentKind, DocumentStore, FileDocumentStore, InMemoryDocumentStore, sanitize_name,
};
pub use outputs::{OutputFile, OutputJob, OutputStore};
