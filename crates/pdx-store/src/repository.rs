use std::collections::HashMap;
use std::sync::RwLock;

use pdx_bodies::Body;
use pdx_types::{Did, VersionId};

use crate::error::{StoreError, StoreResult};

/// Raw document storage keyed by `account(20 bytes) ‖ version(32 bytes)`.
///
/// Values are tagged body encodings (the type-registry prefix byte followed
/// by the serialised body, envelope and salts included). Every version is
/// its own record; records are never mutated after an anchored version is
/// written.
pub trait DocumentRepository: Send + Sync {
    /// Read the record, if present.
    fn get(&self, account: &Did, version: &VersionId) -> StoreResult<Option<Body>>;

    /// Write a fresh record. Fails with [`StoreError::AlreadyExists`] if
    /// the key is taken.
    fn create(&self, account: &Did, version: &VersionId, body: &Body) -> StoreResult<()>;

    /// Overwrite the record at the key (used within the pre-anchor
    /// mutation windows).
    fn update(&self, account: &Did, version: &VersionId, body: &Body) -> StoreResult<()>;

    /// Returns `true` if a record exists at the key.
    fn exists(&self, account: &Did, version: &VersionId) -> StoreResult<bool>;
}

fn record_key(account: &Did, version: &VersionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(52);
    key.extend_from_slice(account.as_bytes());
    key.extend_from_slice(version.as_bytes());
    key
}

/// In-memory repository for tests and embedding.
pub struct InMemoryRepository {
    records: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRepository for InMemoryRepository {
    fn get(&self, account: &Did, version: &VersionId) -> StoreResult<Option<Body>> {
        let records = self.records.read().expect("lock poisoned");
        match records.get(&record_key(account, version)) {
            Some(bytes) => Ok(Some(Body::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }

    fn create(&self, account: &Did, version: &VersionId, body: &Body) -> StoreResult<()> {
        let bytes = body.to_bytes()?;
        let mut records = self.records.write().expect("lock poisoned");
        let key = record_key(account, version);
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists(*version));
        }
        records.insert(key, bytes);
        Ok(())
    }

    fn update(&self, account: &Did, version: &VersionId, body: &Body) -> StoreResult<()> {
        let bytes = body.to_bytes()?;
        let mut records = self.records.write().expect("lock poisoned");
        records.insert(record_key(account, version), bytes);
        Ok(())
    }

    fn exists(&self, account: &Did, version: &VersionId) -> StoreResult<bool> {
        let records = self.records.read().expect("lock poisoned");
        Ok(records.contains_key(&record_key(account, version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdx_bodies::{Invoice, InvoiceData};

    fn invoice() -> Body {
        Body::Invoice(Invoice::new(InvoiceData::default(), vec![Did::random()]))
    }

    #[test]
    fn create_and_get_roundtrip() {
        let repo = InMemoryRepository::new();
        let account = Did::random();
        let body = invoice();
        let version = body.core().current_version;

        repo.create(&account, &version, &body).unwrap();
        let read_back = repo.get(&account, &version).unwrap().expect("should exist");
        assert_eq!(read_back, body);
    }

    #[test]
    fn create_twice_fails() {
        let repo = InMemoryRepository::new();
        let account = Did::random();
        let body = invoice();
        let version = body.core().current_version;

        repo.create(&account, &version, &body).unwrap();
        let err = repo.create(&account, &version, &body).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(v) if v == version));
    }

    #[test]
    fn update_overwrites() {
        let repo = InMemoryRepository::new();
        let account = Did::random();
        let mut body = invoice();
        let version = body.core().current_version;

        repo.create(&account, &version, &body).unwrap();
        if let Body::Invoice(inv) = &mut body {
            inv.data.comment = "updated".into();
        }
        repo.update(&account, &version, &body).unwrap();

        let read_back = repo.get(&account, &version).unwrap().unwrap();
        assert_eq!(read_back, body);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn records_are_scoped_by_account() {
        let repo = InMemoryRepository::new();
        let body = invoice();
        let version = body.core().current_version;
        let account_a = Did::random();
        let account_b = Did::random();

        repo.create(&account_a, &version, &body).unwrap();
        assert!(repo.exists(&account_a, &version).unwrap());
        assert!(!repo.exists(&account_b, &version).unwrap());
        assert!(repo.get(&account_b, &version).unwrap().is_none());
    }
}
