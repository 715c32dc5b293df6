//! # crm-storage
//!
//! Object storage adapter for CRM documents.
//!
//! - [`ObjectStorage`]: the provider-agnostic adapter contract (upload,
//!   folder creation, shareable links, delete, connection test)
//! - [`BucketStorage`]: an S3-compatible backend built on `object_store`
//! - [`StorageSettings`] and [`StorageSettingsLoader`]: adapter credentials,
//!   injected at construction instead of fetched per call
//! - [`progress`]: mapping provider progress into a larger progress bar

mod adapter;
mod bucket;
mod error;
pub mod progress;
mod settings;

pub use adapter::{ObjectStorage, ProgressFn, UploadFile, UploadedObject, object_path};
pub use bucket::{BucketStorage, StorageOptions, connect};
pub use error::StorageError;
pub use settings::{BUCKET_PROVIDER, StaticSettingsLoader, StorageSettings, StorageSettingsLoader};
