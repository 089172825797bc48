//! Key-value blob persistence port.

use crate::domain::error::AuagError;

/// Read/write contract for the persisted cache. One key holds one
/// opaque blob; the store layer owns serialization and the decision to
/// swallow write failures.
pub trait CachePort {
    /// `Ok(None)` when the key has never been written.
    fn read(&self, key: &str) -> Result<Option<String>, AuagError>;

    fn write(&self, key: &str, value: &str) -> Result<(), AuagError>;
}
