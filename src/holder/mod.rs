//! The prover's credential capability and the selection of evidence for a
//! proof request.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::SearchLimit,
    core::{credential::CredentialInfo, proof_request::ProofRequest},
};

pub mod memory;
pub mod selector;

/// Search access to the credentials held in the wallet.
#[async_trait]
pub trait Holder: Send + Sync {
    /// Credentials that may satisfy `referent` of `request`, in a stable order.
    ///
    /// Results honour the referent's restrictions and attribute names but are not
    /// filtered by attribute value.
    async fn credentials_for_referent(
        &self,
        request: &ProofRequest,
        referent: &str,
        limit: SearchLimit,
    ) -> Result<Vec<CredentialInfo>>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestedAttribute {
    pub cred_id: String,
    pub revealed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestedPredicate {
    pub cred_id: String,
}

/// Referent to credential bindings handed to proof construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestedCredentials {
    pub self_attested_attributes: BTreeMap<String, String>,
    pub requested_attributes: BTreeMap<String, RequestedAttribute>,
    pub requested_predicates: BTreeMap<String, RequestedPredicate>,
}

impl RequestedCredentials {
    /// Credential bound to `referent`, if it is backed by one.
    pub fn cred_id(&self, referent: &str) -> Option<&str> {
        self.requested_attributes
            .get(referent)
            .map(|attribute| attribute.cred_id.as_str())
            .or_else(|| {
                self.requested_predicates
                    .get(referent)
                    .map(|predicate| predicate.cred_id.as_str())
            })
    }

    pub fn len(&self) -> usize {
        self.self_attested_attributes.len()
            + self.requested_attributes.len()
            + self.requested_predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
