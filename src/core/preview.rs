use serde::{Deserialize, Serialize};

use super::{credential::CredentialInfo, proof_request::PredicateType};

pub const PRESENTATION_PREVIEW_TYPE: &str =
    "https://didcomm.org/present-proof/1.0/presentation-preview";

fn preview_type() -> String {
    PRESENTATION_PREVIEW_TYPE.to_owned()
}

/// An attribute the holder proposed to present.
///
/// Without a `cred_def_id` the attribute may be self-attested. The value is
/// compared verbatim; `mime_type` is informational only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresAttrSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(
        rename = "mime-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referent: Option<String>,
}

impl PresAttrSpec {
    pub fn new(
        name: impl Into<String>,
        cred_def_id: Option<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cred_def_id,
            mime_type: None,
            value: Some(value.into()),
            referent: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Whether the credential's value for this attribute is the one proposed, from
    /// the proposed credential definition.
    pub fn admits(&self, credential: &CredentialInfo) -> bool {
        if let Some(cred_def_id) = &self.cred_def_id {
            if *cred_def_id != credential.cred_def_id {
                return false;
            }
        }
        match (&self.value, credential.value(&self.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(proposed), Some(actual)) => proposed == actual,
        }
    }
}

/// A predicate the holder proposed to prove.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresPredSpec {
    pub name: String,
    pub cred_def_id: String,
    pub predicate: PredicateType,
    pub threshold: i64,
}

/// Holder-volunteered description of what it is willing to present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationPreview {
    #[serde(rename = "@type", default = "preview_type")]
    pub message_type: String,
    #[serde(default)]
    pub attributes: Vec<PresAttrSpec>,
    #[serde(default)]
    pub predicates: Vec<PresPredSpec>,
}

impl Default for PresentationPreview {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl PresentationPreview {
    pub fn new(attributes: Vec<PresAttrSpec>, predicates: Vec<PresPredSpec>) -> Self {
        Self {
            message_type: preview_type(),
            attributes,
            predicates,
        }
    }

    /// Proposed specs for the named attribute, in proposal order.
    pub fn attribute_specs<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a PresAttrSpec> + 'a {
        self.attributes.iter().filter(move |spec| spec.name == name)
    }

    pub fn speaks_to(&self, name: &str) -> bool {
        self.attribute_specs(name).next().is_some()
    }

    /// Value proposed for self-attestation: a spec without credential definition.
    pub fn self_attested_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|spec| spec.name == name && spec.cred_def_id.is_none())
            .and_then(|spec| spec.value.as_deref())
    }

    /// Whether the credential agrees with the proposal on every one of `names`
    /// that the proposal mentions. Names the proposal is silent on pass.
    pub fn is_compliant(&self, names: &[String], credential: &CredentialInfo) -> bool {
        names.iter().all(|name| {
            let mut specs = self.attribute_specs(name).peekable();
            specs.peek().is_none() || specs.any(|spec| spec.admits(credential))
        })
    }
}
