//! Well-known tree prefixes and field properties.
//!
//! Tree prefixes occupy the first byte of a 4-byte compact slice; well-known
//! envelope fields occupy the last byte. Typed-body prefixes use the second
//! byte (see `pdx-bodies`). Concatenation composes a prefix with a field's
//! own compact bytes.

use pdx_tree::Property;

/// Prefix for the document-root tree.
pub const DR_TREE_PREFIX: &str = "dr_tree";
/// Prefix for the coredoc envelope tree.
pub const CD_TREE_PREFIX: &str = "cd_tree";
/// Prefix for the signing tree.
pub const SIGNING_TREE_PREFIX: &str = "signing_tree";
/// Prefix for the signature-data tree.
pub const SIGNATURES_TREE_PREFIX: &str = "signatures_tree";

/// Readable name of the signing-root leaf.
pub const SIGNING_ROOT_FIELD: &str = "signing_root";
/// Readable name of the signatures-root leaf.
pub const SIGNATURES_ROOT_FIELD: &str = "signatures_root";
/// Readable name of the data-root leaf.
pub const DATA_ROOT_FIELD: &str = "data_root";
/// Readable name of the coredoc-root leaf.
pub const CD_ROOT_FIELD: &str = "cd_root";
/// Readable name of the document-type leaf.
pub const DOCUMENT_TYPE_FIELD: &str = "document_type";

/// Compact bytes for a tree prefix or well-known field.
pub fn compact(key: &str) -> &'static [u8] {
    match key {
        CD_ROOT_FIELD => &[0, 0, 0, 7],
        DATA_ROOT_FIELD => &[0, 0, 0, 5],
        DOCUMENT_TYPE_FIELD => &[0, 0, 0, 100],
        SIGNATURES_ROOT_FIELD => &[0, 0, 0, 6],
        SIGNING_ROOT_FIELD => &[0, 0, 0, 10],

        CD_TREE_PREFIX => &[1, 0, 0, 0],
        SIGNING_TREE_PREFIX => &[2, 0, 0, 0],
        SIGNATURES_TREE_PREFIX => &[3, 0, 0, 0],
        DR_TREE_PREFIX => &[4, 0, 0, 0],

        _ => &[],
    }
}

/// Property for a bare tree prefix.
pub fn prefix_property(prefix: &str) -> Property {
    Property::new(prefix, compact(prefix).to_vec())
}

/// Property for a well-known field under a tree prefix:
/// readable `"{prefix}.{field}"`, compact bytes concatenated.
pub fn field_property(prefix: &str, field: &str) -> Property {
    let mut bytes = compact(prefix).to_vec();
    bytes.extend_from_slice(compact(field));
    Property::new(format!("{prefix}.{field}"), bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_use_first_byte() {
        assert_eq!(compact(CD_TREE_PREFIX)[0], 1);
        assert_eq!(compact(SIGNING_TREE_PREFIX)[0], 2);
        assert_eq!(compact(SIGNATURES_TREE_PREFIX)[0], 3);
        assert_eq!(compact(DR_TREE_PREFIX)[0], 4);
    }

    #[test]
    fn fields_use_last_byte() {
        for field in [
            CD_ROOT_FIELD,
            DATA_ROOT_FIELD,
            SIGNATURES_ROOT_FIELD,
            SIGNING_ROOT_FIELD,
            DOCUMENT_TYPE_FIELD,
        ] {
            let bytes = compact(field);
            assert_eq!(&bytes[..3], &[0, 0, 0]);
            assert_ne!(bytes[3], 0);
        }
    }

    #[test]
    fn field_property_concatenates() {
        let prop = field_property(DR_TREE_PREFIX, SIGNING_ROOT_FIELD);
        assert_eq!(prop.readable(), "dr_tree.signing_root");
        assert_eq!(prop.compact(), &[4, 0, 0, 0, 0, 0, 0, 10]);
    }

    #[test]
    fn unknown_key_is_empty() {
        assert!(compact("nonsense").is_empty());
    }
}
