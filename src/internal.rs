pub mod download_error;
pub mod engine;
pub mod progress;
pub mod record_store;
pub mod states;
pub mod transport;
pub mod writer;
