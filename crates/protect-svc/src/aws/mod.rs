//! AWS integration: the S3 document backend.
//!
//! Key management (KMS/HSM) stays outside this service; the encryption key
//! arrives through configuration.

pub mod clients;
pub mod s3_store;

pub use clients::s3_client;
pub use s3_store::S3Store;
