use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::Holder;
use crate::{
    config::SearchLimit,
    core::{
        credential::CredentialInfo,
        proof_request::{ProofRequest, ReferentGroup},
    },
};

/// A local in-memory wallet. Not for production use!
///
/// Credentials are searched in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryHolder {
    credentials: Arc<Mutex<Vec<CredentialInfo>>>,
}

impl MemoryHolder {
    pub async fn insert(&self, credential: CredentialInfo) -> Result<()> {
        let mut credentials = self.credentials.try_lock()?;
        if credentials.iter().any(|held| held.referent == credential.referent) {
            bail!("credential {} is already held", credential.referent)
        }
        credentials.push(credential);
        Ok(())
    }

    pub async fn remove(&self, referent: &str) -> Result<()> {
        let mut credentials = self.credentials.try_lock()?;
        let before = credentials.len();
        credentials.retain(|held| held.referent != referent);
        if credentials.len() == before {
            bail!("credential not found")
        }
        Ok(())
    }
}

#[async_trait]
impl Holder for MemoryHolder {
    async fn credentials_for_referent(
        &self,
        request: &ProofRequest,
        referent: &str,
        limit: SearchLimit,
    ) -> Result<Vec<CredentialInfo>> {
        let Some(group) = request.group(referent) else {
            bail!("referent {referent} is not part of proof request {}", request.name())
        };
        let credentials = self.credentials.try_lock()?;
        Ok(credentials
            .iter()
            .filter(|credential| match group {
                ReferentGroup::Attribute(group) => group.is_satisfied_by(credential),
                ReferentGroup::Predicate(group) => group.is_satisfied_by(credential),
            })
            .take(limit.get())
            .cloned()
            .collect())
    }
}
