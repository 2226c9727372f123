/// Key-value backends holding the session snapshot.
pub mod kv_store;
/// Persisted snapshot layout.
pub mod models;
/// Storage error types shared by every backend.
pub mod storage;
