//! File uploads: blob storage plus the metadata index.
//!
//! - Upload: write the blob, then insert the metadata row (compensating on failure)
//! - List: metadata rows, optionally filtered by owner
//! - Download: metadata lookup, then blob lookup
//! - Delete: ownership check, blob removal, then row removal

mod error;
mod key;
mod service;
mod types;

pub use error::FileError;
pub use key::{default_filename, sanitize_filename, upload_key};
pub use service::{FileRepository, FileService};
pub use types::{FileDownload, FileRecord, NewFileRecord, UploadInput, UploadedFile};
