//! Media ingestion for Stall product images.
//!
//! An uploaded image is checked against a [`MediaPolicy`], normalized into a
//! bounded JPEG, and handed to an [`ObjectStore`]. [`MediaPipeline`] glues the
//! steps together and owns the best-effort cleanup of superseded assets.

pub mod backend;
pub mod cloudinary;
pub mod config;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod policy;
pub mod store;

pub use backend::Backend;
pub use config::{BackendKind, CloudinaryConfig, MediaConfig};
pub use error::{Error, Result};
pub use pipeline::MediaPipeline;
pub use policy::{MediaPolicy, Normalized};
pub use store::{ObjectStore, StoredObject};
