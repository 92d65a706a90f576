use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A credential held in the wallet, as returned by a credential search.
///
/// Only the raw (unencoded) attribute values are exposed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialInfo {
    /// Wallet identifier of the credential.
    pub referent: String,
    pub schema_id: String,
    pub cred_def_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_rev_id: Option<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl CredentialInfo {
    pub fn new(
        referent: impl Into<String>,
        schema_id: impl Into<String>,
        cred_def_id: impl Into<String>,
    ) -> Self {
        Self {
            referent: referent.into(),
            schema_id: schema_id.into(),
            cred_def_id: cred_def_id.into(),
            rev_reg_id: None,
            cred_rev_id: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Raw value of an attribute, if the credential carries it.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// DID of the credential definition's issuer: `<did>:3:CL:<schema>:<tag>`.
    pub fn issuer_did(&self) -> Option<&str> {
        let mut parts = self.cred_def_id.split(':');
        let did = parts.next()?;
        (parts.next()? == "3").then_some(did)
    }

    pub fn schema_issuer_did(&self) -> Option<&str> {
        self.schema_parts().map(|(did, _, _)| did)
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_parts().map(|(_, name, _)| name)
    }

    pub fn schema_version(&self) -> Option<&str> {
        self.schema_parts().map(|(_, _, version)| version)
    }

    // <did>:2:<name>:<version>
    fn schema_parts(&self) -> Option<(&str, &str, &str)> {
        let parts: Vec<&str> = self.schema_id.split(':').collect();
        match parts[..] {
            [did, "2", name, version] => Some((did, name, version)),
            _ => None,
        }
    }
}
