//! Storage backends for save blobs.

mod blob;

pub use blob::BlobStore;
