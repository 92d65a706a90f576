use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use super::{Holder, RequestedAttribute, RequestedCredentials, RequestedPredicate};
use crate::{
    config::SearchLimit,
    core::{
        credential::CredentialInfo, preview::PresentationPreview,
        proof_request::{AttributeGroupRequest, ProofRequest},
    },
};

/// Why a request cannot be answered automatically.
///
/// This is an expected outcome: the request may still be answered by hand.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Shortfall {
    #[error("referent {referent} did not produce any credentials")]
    NoCandidates { referent: String },

    #[error("none of {candidates} candidates for {referent} carry the proposed {names:?}")]
    ProposalMismatch {
        referent: String,
        names: Vec<String>,
        candidates: usize,
    },
}

/// Outcome of evidence selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every referent is bound.
    Ready(RequestedCredentials),
    /// At least one referent cannot be bound; nothing should be presented.
    Declined(Shortfall),
}

/// Binds every referent of a proof request to held evidence, refusing any
/// binding that contradicts the holder's earlier proposal.
pub struct EvidenceSelector<'a, H: ?Sized> {
    holder: &'a H,
    limit: SearchLimit,
}

impl<'a, H: Holder + ?Sized> EvidenceSelector<'a, H> {
    pub fn new(holder: &'a H, limit: SearchLimit) -> Self {
        Self { holder, limit }
    }

    /// Select evidence for `request`.
    ///
    /// Performs only credential searches. An error means a search failed, not
    /// that evidence is missing.
    pub async fn select(
        &self,
        request: &ProofRequest,
        preview: Option<&PresentationPreview>,
    ) -> Result<Selection> {
        let mut selected = RequestedCredentials::default();

        for (referent, group) in request.requested_attributes() {
            if let Some(value) = self_attestable(group, preview) {
                debug!(%referent, "self-attesting proposed value");
                selected
                    .self_attested_attributes
                    .insert(referent.clone(), value.to_owned());
                continue;
            }

            let candidates = self.candidates(request, referent).await?;
            match bind_attribute(referent, group, &candidates, preview) {
                Ok(cred_id) => {
                    debug!(%referent, cred_id, "bound attribute group");
                    selected.requested_attributes.insert(
                        referent.clone(),
                        RequestedAttribute {
                            cred_id: cred_id.to_owned(),
                            revealed: true,
                        },
                    );
                }
                Err(shortfall) => return Ok(declined(shortfall)),
            }
        }

        for referent in request.requested_predicates().keys() {
            let candidates = self.candidates(request, referent).await?;
            let Some(credential) = candidates.first() else {
                return Ok(declined(Shortfall::NoCandidates {
                    referent: referent.clone(),
                }));
            };
            debug!(%referent, cred_id = %credential.referent, "bound predicate");
            selected.requested_predicates.insert(
                referent.clone(),
                RequestedPredicate {
                    cred_id: credential.referent.clone(),
                },
            );
        }

        Ok(Selection::Ready(selected))
    }

    async fn candidates(
        &self,
        request: &ProofRequest,
        referent: &str,
    ) -> Result<Vec<CredentialInfo>> {
        self.holder
            .credentials_for_referent(request, referent, self.limit)
            .await
            .with_context(|| format!("credential search failed for referent {referent}"))
    }
}

fn declined(shortfall: Shortfall) -> Selection {
    warn!("declining automatic presentation: {shortfall}");
    Selection::Declined(shortfall)
}

/// The value to self-attest for an unrestricted single attribute, when the
/// proposal offered one without a credential definition.
fn self_attestable<'p>(
    group: &AttributeGroupRequest,
    preview: Option<&'p PresentationPreview>,
) -> Option<&'p str> {
    if !group.is_unrestricted() || group.names().len() != 1 {
        return None;
    }
    preview?.self_attested_value(group.names().head())
}

/// Pick the credential for an attribute group from the holder's candidates.
///
/// Candidates that contradict the proposal are dropped before anything is
/// chosen, even when only one candidate exists.
fn bind_attribute<'c>(
    referent: &str,
    group: &AttributeGroupRequest,
    candidates: &'c [CredentialInfo],
    preview: Option<&PresentationPreview>,
) -> Result<&'c str, Shortfall> {
    if candidates.is_empty() {
        return Err(Shortfall::NoCandidates {
            referent: referent.to_owned(),
        });
    }

    let names = group.names();
    let chosen = match preview {
        Some(preview) if names.iter().any(|name| preview.speaks_to(name)) => candidates
            .iter()
            .find(|candidate| preview.is_compliant(names, candidate)),
        _ => candidates.first(),
    };

    chosen
        .map(|credential| credential.referent.as_str())
        .ok_or_else(|| Shortfall::ProposalMismatch {
            referent: referent.to_owned(),
            names: names.to_vec(),
            candidates: candidates.len(),
        })
}
