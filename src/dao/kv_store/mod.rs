#[cfg(feature = "file-store")]
pub mod file;
pub mod memory;

use crate::dao::storage::StorageResult;

#[cfg(feature = "file-store")]
pub use self::file::FileStore;
pub use self::memory::MemoryStore;

/// Durable string storage keyed by name, the server-side analogue of browser local storage.
///
/// Calls are synchronous and expected to be quick; the session writes through after every
/// accepted event.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Delete `key`; deleting a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}
