use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tracing::debug;

use pdx_bodies::Body;
use pdx_types::{Did, DocumentId, VersionId};

use crate::error::{StoreError, StoreResult};
use crate::repository::DocumentRepository;

/// Durable storage facade for documents.
///
/// The service tracks the current version of every document per account
/// (`document_id -> current version`) and guards updates with a
/// compare-and-swap on that head: of two writers deriving from the same
/// base, the first to store wins and the second fails with
/// [`StoreError::StaleBase`].
pub struct DocumentService<R> {
    repo: R,
    heads: RwLock<HashMap<(Did, DocumentId), VersionId>>,
}

impl<R: DocumentRepository> DocumentService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            heads: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Store version zero of a new document.
    ///
    /// A record written earlier in the signing window (the in-flight copy
    /// stored when answering a signature request) is overwritten by the
    /// final version.
    pub fn create(&self, account: &Did, body: &Body) -> StoreResult<()> {
        let core = body.core();
        let version = core.current_version;
        let mut heads = self.heads.write().expect("lock poisoned");
        if heads.contains_key(&(*account, core.document_id)) {
            return Err(StoreError::AlreadyExists(version));
        }
        self.write_record(account, &version, body)?;
        heads.insert((*account, core.document_id), version);
        debug!(document = %core.document_id, version = %version, "stored genesis version");
        Ok(())
    }

    fn write_record(&self, account: &Did, version: &VersionId, body: &Body) -> StoreResult<()> {
        if self.repo.exists(account, version)? {
            self.repo.update(account, version, body)
        } else {
            self.repo.create(account, version, body)
        }
    }

    /// Store a derived version. The body's `previous_version` must still
    /// be the current head for its document, or the write fails with
    /// [`StoreError::StaleBase`].
    pub fn update(&self, account: &Did, body: &Body) -> StoreResult<()> {
        let core = body.core();
        let document_id = core.document_id;
        let previous = core
            .previous_version
            .ok_or(StoreError::MissingPredecessor(document_id))?;

        let mut heads = self.heads.write().expect("lock poisoned");
        match heads.get(&(*account, document_id)) {
            Some(head) if *head == previous => {}
            Some(_) => return Err(StoreError::StaleBase(document_id)),
            // A peer's document we have never seen: accept and start
            // tracking from here.
            None => {}
        }

        self.write_record(account, &core.current_version, body)?;
        heads.insert((*account, document_id), core.current_version);
        debug!(document = %document_id, version = %core.current_version, "stored derived version");
        Ok(())
    }

    /// Overwrite the stored record of a not-yet-advanced version (the
    /// pre-anchor mutation windows write through here).
    pub fn store_revision(&self, account: &Did, body: &Body) -> StoreResult<()> {
        self.repo.update(account, &body.core().current_version, body)
    }

    /// Fetch a specific version.
    pub fn get_version(&self, account: &Did, version: &VersionId) -> StoreResult<Body> {
        self.repo
            .get(account, version)?
            .ok_or(StoreError::NotFound(*version))
    }

    /// Fetch the latest stored version of a document by its identifier.
    pub fn get_document(&self, account: &Did, document_id: &DocumentId) -> StoreResult<Body> {
        let head = {
            let heads = self.heads.read().expect("lock poisoned");
            heads.get(&(*account, *document_id)).copied()
        };
        match head {
            Some(version) => self.get_current_version(account, &version),
            None => self.get_current_version(account, document_id),
        }
    }

    /// Walk `next_version` links from `start` until no stored record
    /// follows, returning the last stored version.
    ///
    /// The walk is bounded: lineage pointers form a chain per document but
    /// a corrupted store could close a cycle, which is detected and
    /// rejected rather than looped on.
    pub fn get_current_version(&self, account: &Did, start: &VersionId) -> StoreResult<Body> {
        let mut visited: HashSet<VersionId> = HashSet::new();
        let mut current = self.get_version(account, start)?;

        loop {
            if !visited.insert(current.core().current_version) {
                return Err(StoreError::CorruptedLineage(format!(
                    "next_version cycle at {}",
                    current.core().current_version
                )));
            }
            let next = current.core().next_version;
            match self.repo.get(account, &next)? {
                Some(successor) => current = successor,
                None => return Ok(current),
            }
        }
    }

    /// Returns `true` if the version is stored.
    pub fn exists(&self, account: &Did, version: &VersionId) -> StoreResult<bool> {
        self.repo.exists(account, version)
    }

    /// Rebuild a typed body from wire bytes.
    pub fn derive_from_bytes(&self, bytes: &[u8]) -> StoreResult<Body> {
        Ok(Body::from_bytes(bytes)?)
    }
}
