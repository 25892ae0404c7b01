/// Domain-separated BLAKE3 hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation. This prevents cross-type collisions: a merkle leaf and an
/// internal node with identical bytes produce different hashes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for merkle leaves.
    pub const LEAF: Self = Self {
        domain: "pdx-leaf-v1",
    };
    /// Hasher for internal merkle nodes.
    pub const NODE: Self = Self {
        domain: "pdx-node-v1",
    };
    /// Hasher for access-token signing payloads.
    pub const ACCESS_TOKEN: Self = Self {
        domain: "pdx-access-token-v1",
    };
    /// Hasher for deriving participant addresses from public keys.
    pub const DID: Self = Self {
        domain: "pdx-did-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash a sequence of byte segments as a single message.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }

    /// Hash a byte-sorted pair. The siblings are ordered by byte value
    /// before hashing, so the result is independent of argument order.
    pub fn hash_sorted_pair(&self, a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.hash_parts(&[lo, hi])
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::LEAF.hash(data), ContentHasher::LEAF.hash(data));
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let data = b"same content";
        assert_ne!(ContentHasher::LEAF.hash(data), ContentHasher::NODE.hash(data));
    }

    #[test]
    fn hash_parts_matches_concatenation() {
        let whole = ContentHasher::LEAF.hash(b"abcdef");
        let parts = ContentHasher::LEAF.hash_parts(&[b"abc", b"def"]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn sorted_pair_is_commutative() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(
            ContentHasher::NODE.hash_sorted_pair(&a, &b),
            ContentHasher::NODE.hash_sorted_pair(&b, &a)
        );
    }

    #[test]
    fn sorted_pair_differs_from_single() {
        let a = [3u8; 32];
        assert_ne!(ContentHasher::NODE.hash_sorted_pair(&a, &a), a);
    }

    #[test]
    fn custom_domain() {
        let hasher = ContentHasher::new("my-domain-v1");
        assert_ne!(hasher.hash(b"data"), ContentHasher::LEAF.hash(b"data"));
    }
}
