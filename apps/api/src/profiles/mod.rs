pub mod extractor;
pub mod handlers;
pub mod ingest;
pub mod merge;
pub mod models;
pub mod prompts;
pub mod reader;
pub mod store;
pub mod validation;
