//! External directory (mailing-list group) domain module

mod client;
mod error;
mod operation;

pub use client::DirectoryClient;
#[cfg(test)]
pub use client::MockDirectoryClient;
pub use error::DirectoryError;
pub use operation::DirectoryOperation;
