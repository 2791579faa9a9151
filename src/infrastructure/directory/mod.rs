//! Directory client implementations

mod http_client;
mod in_memory;

pub use http_client::HttpDirectoryClient;
pub use in_memory::{DirectoryCall, Fault, InMemoryDirectoryClient};
