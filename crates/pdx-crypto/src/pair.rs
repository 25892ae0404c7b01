use pdx_types::{Preimage, VersionId};

/// A freshly generated `(preimage, version)` pair.
///
/// The version is the domain-separated hash of the preimage. Generating the
/// next version's pair ahead of time lets a document commit to its successor
/// without revealing it.
#[derive(Clone, Copy, Debug)]
pub struct HashPair {
    pub preimage: Preimage,
    pub version: VersionId,
}

impl HashPair {
    /// Generate a fresh random pair.
    pub fn generate() -> Self {
        let preimage = Preimage::random();
        let version = preimage.version();
        Self { preimage, version }
    }

    /// Rebuild the pair from a known preimage.
    pub fn from_preimage(preimage: Preimage) -> Self {
        Self {
            version: preimage.version(),
            preimage,
        }
    }

    /// Check that `preimage` commits to `version`.
    pub fn verify(preimage: &Preimage, version: &VersionId) -> bool {
        preimage.version() == *version
    }
}
