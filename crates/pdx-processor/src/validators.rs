use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use pdx_access::TransitionValidator;
use pdx_anchors::AnchorRegistry;
use pdx_bodies::Body;
use pdx_identity::IdentityService;
use pdx_types::Did;

use crate::error::{ProcessorError, ProcessorResult};

/// One validation step over a document (and, for version transitions, its
/// predecessor).
#[async_trait]
pub trait DocumentValidator: Send + Sync {
    /// Human-readable name, used in failure reports.
    fn name(&self) -> &'static str;

    async fn validate(&self, old: Option<&Body>, new: &Body) -> ProcessorResult<()>;
}

/// An ordered, fail-fast set of validators.
pub struct ValidatorGroup {
    validators: Vec<Box<dyn DocumentValidator>>,
}

impl ValidatorGroup {
    pub fn new(validators: Vec<Box<dyn DocumentValidator>>) -> Self {
        Self { validators }
    }

    /// Run every validator in order; the first failure stops evaluation.
    pub async fn validate(&self, old: Option<&Body>, new: &Body) -> ProcessorResult<()> {
        for validator in &self.validators {
            validator.validate(old, new).await?;
            debug!(validator = validator.name(), "validator passed");
        }
        Ok(())
    }
}

fn fail(validator: &'static str, reason: impl Into<String>) -> ProcessorError {
    ProcessorError::Validation {
        validator: validator.to_string(),
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// StructureValidator
// ---------------------------------------------------------------------------

/// Structural integrity: rule references resolve, preimages commit to
/// versions, lineage identifiers are consistent.
pub struct StructureValidator;

#[async_trait]
impl DocumentValidator for StructureValidator {
    fn name(&self) -> &'static str {
        "structure"
    }

    async fn validate(&self, _old: Option<&Body>, new: &Body) -> ProcessorResult<()> {
        let core = new.core();

        if core.current_preimage.version() != core.current_version {
            return Err(fail(self.name(), "current preimage does not commit to current version"));
        }
        if core.next_preimage.version() != core.next_version {
            return Err(fail(self.name(), "next preimage does not commit to next version"));
        }
        if core.previous_version.is_none() && core.document_id != core.current_version {
            return Err(fail(self.name(), "genesis document id must equal current version"));
        }

        for (idx, rule) in core.read_rules.iter().enumerate() {
            for key in &rule.roles {
                if core.role(key).is_none() {
                    return Err(fail(self.name(), format!("read rule {idx} references a missing role")));
                }
            }
        }
        for (idx, rule) in core.transition_rules.iter().enumerate() {
            for key in &rule.roles {
                if core.role(key).is_none() {
                    return Err(fail(
                        self.name(),
                        format!("transition rule {idx} references a missing role"),
                    ));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SignatureValidator
// ---------------------------------------------------------------------------

/// Every signature covers exactly the signing root, signers are known to
/// the identity service, their embedded keys match the resolved keys, and
/// no signer appears twice.
pub struct SignatureValidator {
    identities: Arc<dyn IdentityService>,
}

impl SignatureValidator {
    pub fn new(identities: Arc<dyn IdentityService>) -> Self {
        Self { identities }
    }
}

#[async_trait]
impl DocumentValidator for SignatureValidator {
    fn name(&self) -> &'static str {
        "signatures"
    }

    async fn validate(&self, _old: Option<&Body>, new: &Body) -> ProcessorResult<()> {
        let mut scratch = new.clone();
        scratch.calculate_data_root()?;
        let signing_root = scratch.calculate_signing_root()?;

        if let Some(cached) = new.core().signing_root() {
            if cached != signing_root {
                return Err(fail(self.name(), "cached signing root does not match recomputation"));
            }
        }

        let data = &new.core().signature_data;
        if data.is_empty() {
            return Err(fail(self.name(), "document carries no signatures"));
        }
        if data.signers().len() != data.signatures.len() {
            return Err(fail(self.name(), "duplicate signer"));
        }

        for sig in &data.signatures {
            let resolved = self.identities.resolve_key(&sig.signer_id).await?;
            if resolved.as_bytes() != sig.public_key {
                return Err(fail(
                    self.name(),
                    format!("embedded key for signer {} does not match identity", sig.signer_id),
                ));
            }
            self.identities
                .verify_signature(&sig.signer_id, &signing_root, &sig.signature)
                .await?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnchorValidator
// ---------------------------------------------------------------------------

/// The registry's recorded root must equal the recomputed document root,
/// and the anchor must not predate the document's claimed timestamp.
pub struct AnchorValidator {
    registry: Arc<dyn AnchorRegistry>,
}

impl AnchorValidator {
    pub fn new(registry: Arc<dyn AnchorRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DocumentValidator for AnchorValidator {
    fn name(&self) -> &'static str {
        "anchor"
    }

    async fn validate(&self, _old: Option<&Body>, new: &Body) -> ProcessorResult<()> {
        let version = new.core().current_version;

        let mut scratch = new.clone();
        scratch.calculate_data_root()?;
        scratch.calculate_signing_root()?;
        let document_root = scratch.calculate_document_root()?;

        let record = self
            .registry
            .get_anchor(&version)
            .await?
            .ok_or(ProcessorError::AnchorMissing(version))?;

        if record.document_root != document_root {
            return Err(ProcessorError::AnchorMismatch(version));
        }
        if let Some(timestamp) = new.core().timestamp {
            if record.anchored_at < timestamp {
                return Err(ProcessorError::AnchorNotMonotonic(version));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TransitionStep
// ---------------------------------------------------------------------------

/// For non-genesis versions: the lineage links to the stored predecessor
/// hold, and the sender was permitted to make every change.
pub struct TransitionStep {
    sender: Did,
}

impl TransitionStep {
    pub fn new(sender: Did) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl DocumentValidator for TransitionStep {
    fn name(&self) -> &'static str {
        "transition"
    }

    async fn validate(&self, old: Option<&Body>, new: &Body) -> ProcessorResult<()> {
        let Some(previous_version) = new.core().previous_version else {
            return Ok(()); // genesis
        };
        let old = old.ok_or(ProcessorError::UnknownPredecessor(previous_version))?;

        let old_core = old.core();
        let new_core = new.core();

        if new_core.document_id != old_core.document_id {
            return Err(fail(self.name(), "document id changed across versions"));
        }
        if previous_version != old_core.current_version {
            return Err(fail(self.name(), "previous version does not match predecessor"));
        }
        if new_core.current_version != old_core.next_version {
            return Err(fail(self.name(), "current version was not committed by predecessor"));
        }
        if new_core.current_preimage != old_core.next_preimage {
            return Err(fail(self.name(), "current preimage was not committed by predecessor"));
        }
        if new_core.previous_root != old_core.document_root() {
            return Err(fail(self.name(), "previous root does not match predecessor document root"));
        }

        TransitionValidator::collaborator_can_update(old, new, &self.sender)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Signatures only — the pre-signature-request condition.
pub fn signature_validator(identities: Arc<dyn IdentityService>) -> ValidatorGroup {
    ValidatorGroup::new(vec![Box::new(SignatureValidator::new(identities))])
}

/// Structure plus signatures — run before anchoring.
pub fn pre_anchor_validator(identities: Arc<dyn IdentityService>) -> ValidatorGroup {
    ValidatorGroup::new(vec![
        Box::new(StructureValidator),
        Box::new(SignatureValidator::new(identities)),
    ])
}

/// Structure, signatures, and the registry record — run after anchoring,
/// before delivery.
pub fn post_anchored_validator(
    identities: Arc<dyn IdentityService>,
    registry: Arc<dyn AnchorRegistry>,
) -> ValidatorGroup {
    ValidatorGroup::new(vec![
        Box::new(StructureValidator),
        Box::new(SignatureValidator::new(identities)),
        Box::new(AnchorValidator::new(registry)),
    ])
}

/// The full set for received anchored documents, with `sender` as the
/// acting collaborator.
pub fn received_document_validator(
    identities: Arc<dyn IdentityService>,
    registry: Arc<dyn AnchorRegistry>,
    sender: Did,
) -> ValidatorGroup {
    ValidatorGroup::new(vec![
        Box::new(StructureValidator),
        Box::new(SignatureValidator::new(identities)),
        Box::new(AnchorValidator::new(registry)),
        Box::new(TransitionStep::new(sender)),
    ])
}
