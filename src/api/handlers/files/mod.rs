pub mod list;
pub mod manage;
pub mod types;
pub mod upload;

// Re-export all types
pub use types::*;

// Re-export all handlers
pub use list::list_files;
pub use manage::{delete_file, rename_file};
pub use upload::upload_file;
