use std::collections::BTreeMap;

use tracing::debug;

use pdx_bodies::Body;
use pdx_document::{fields, CoreDocument, TransitionAction};
use pdx_tree::{traverse, Property};
use pdx_types::{Did, RoleKey};

use crate::error::{AccessError, AccessResult};

/// Decides whether a proposed new version is permitted by the previous
/// version's transition rules.
pub struct TransitionValidator;

impl TransitionValidator {
    /// Validate that `actor` may derive `new` from `old`.
    ///
    /// Both the data tree and the envelope's governance fields (roles,
    /// read rules, transition rules, NFTs, access tokens) are walked in
    /// leaf-property order; insertions and deletions count as changes.
    /// Every changed leaf must be covered by a transition rule of the OLD
    /// version whose role set includes one of the actor's roles. Lineage
    /// fields are excluded from the walk — they change by construction and
    /// are guarded by the chain invariants instead.
    pub fn collaborator_can_update(old: &Body, new: &Body, actor: &Did) -> AccessResult<()> {
        if old.type_url() != new.type_url() {
            return Err(AccessError::UnpermittedTransition {
                property: "cd_tree.document_type".into(),
            });
        }

        let actor_roles = old.core().roles_of(actor);

        let mut changed = Vec::new();
        changed.extend(diff_leaves(
            &flatten(
                &Property::new(old.prefix(), old.compact_prefix().to_vec()),
                &old.data_value(),
            ),
            &flatten(
                &Property::new(new.prefix(), new.compact_prefix().to_vec()),
                &new.data_value(),
            ),
        ));
        changed.extend(diff_leaves(
            &flatten(
                &fields::prefix_property(fields::CD_TREE_PREFIX),
                &governance_value(old.core()),
            ),
            &flatten(
                &fields::prefix_property(fields::CD_TREE_PREFIX),
                &governance_value(new.core()),
            ),
        ));

        for property in changed {
            if !Self::rule_covers(old.core(), &actor_roles, &property) {
                debug!(property = %property.0, actor = %actor, "uncovered transition");
                return Err(AccessError::UnpermittedTransition {
                    property: property.0,
                });
            }
        }

        Ok(())
    }

    fn rule_covers(core: &CoreDocument, actor_roles: &[RoleKey], property: &(String, Vec<u8>)) -> bool {
        core.transition_rules.iter().any(|rule| {
            rule.action == TransitionAction::Allow
                && rule.roles.iter().any(|key| actor_roles.contains(key))
                && rule.matches(&property.1)
        })
    }
}

type LeafMap = BTreeMap<String, (Vec<u8>, Vec<u8>)>;

fn flatten(prefix: &Property, value: &serde_json::Value) -> LeafMap {
    traverse::flatten_value(prefix, value)
        .into_iter()
        .map(|(prop, bytes)| {
            (
                prop.readable().to_string(),
                (prop.compact().to_vec(), bytes),
            )
        })
        .collect()
}

/// Changed leaves between two flattened maps: modifications, insertions,
/// and deletions, as `(readable, compact)` pairs in property order.
fn diff_leaves(old: &LeafMap, new: &LeafMap) -> Vec<(String, Vec<u8>)> {
    let mut changed = Vec::new();

    for (name, (compact, value)) in old {
        match new.get(name) {
            Some((_, new_value)) if new_value == value => {}
            // modified or deleted
            _ => changed.push((name.clone(), compact.clone())),
        }
    }
    for (name, (compact, _)) in new {
        if !old.contains_key(name) {
            changed.push((name.clone(), compact.clone()));
        }
    }

    changed
}

/// The envelope fields governed by transition rules. Lineage identifiers,
/// author, and timestamp are excluded.
fn governance_value(core: &CoreDocument) -> serde_json::Value {
    let full = core.cd_leaf_value();
    let mut out = serde_json::Map::new();
    for key in [
        "roles",
        "read_rules",
        "transition_rules",
        "nfts",
        "access_tokens",
    ] {
        if let Some(v) = full.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }
    serde_json::Value::Object(out)
}
