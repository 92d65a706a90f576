use std::collections::BTreeMap;

use anyhow::{bail, Context, Error, Result};
use serde::{Deserialize, Serialize};

use super::credential::CredentialInfo;
use crate::utils::NonEmptyVec;

/// A request-local identifier naming one attribute group or predicate clause.
pub type Referent = String;

/// Time window, in seconds since the epoch, over which the credential must not
/// have been revoked.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NonRevokedInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

/// One AND-clause of constraints on the credentials allowed to satisfy a referent.
///
/// Recognized keys are `schema_id`, `schema_issuer_did`, `schema_name`,
/// `schema_version`, `issuer_did`, `cred_def_id`, `rev_reg_id`,
/// `attr::<name>::value` and `attr::<name>::marker`. Unknown keys never match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Restriction(BTreeMap<String, String>);

impl Restriction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a single credential definition.
    pub fn cred_def(cred_def_id: impl Into<String>) -> Self {
        Self::new().with("cred_def_id", cred_def_id)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn cred_def_id(&self) -> Option<&str> {
        self.get("cred_def_id")
    }

    /// Whether the credential satisfies every constraint of this clause.
    pub fn is_satisfied_by(&self, credential: &CredentialInfo) -> bool {
        self.0.iter().all(|(key, expected)| {
            let expected = expected.as_str();
            match key.as_str() {
                "schema_id" => credential.schema_id == expected,
                "schema_issuer_did" => credential.schema_issuer_did() == Some(expected),
                "schema_name" => credential.schema_name() == Some(expected),
                "schema_version" => credential.schema_version() == Some(expected),
                "issuer_did" => credential.issuer_did() == Some(expected),
                "cred_def_id" => credential.cred_def_id == expected,
                "rev_reg_id" => credential.rev_reg_id.as_deref() == Some(expected),
                other => match attribute_tag(other) {
                    Some((name, AttributeTag::Value)) => credential.value(name) == Some(expected),
                    Some((name, AttributeTag::Marker)) => {
                        expected == "1" && credential.value(name).is_some()
                    }
                    None => false,
                },
            }
        })
    }
}

enum AttributeTag {
    Value,
    Marker,
}

fn attribute_tag(key: &str) -> Option<(&str, AttributeTag)> {
    let rest = key.strip_prefix("attr::")?;
    if let Some(name) = rest.strip_suffix("::value") {
        return Some((name, AttributeTag::Value));
    }
    rest.strip_suffix("::marker")
        .map(|name| (name, AttributeTag::Marker))
}

/// A list of restriction clauses is satisfied when any one clause is. An empty
/// list places no constraint at all.
pub fn restrictions_satisfied(restrictions: &[Restriction], credential: &CredentialInfo) -> bool {
    restrictions.is_empty()
        || restrictions
            .iter()
            .any(|restriction| restriction.is_satisfied_by(credential))
}

/// One or more attribute names that a single credential must reveal together.
///
/// On the wire this is either `name` or `names`, never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "AttributeGroupWire", into = "AttributeGroupWire")]
pub struct AttributeGroupRequest {
    names: NonEmptyVec<String>,
    restrictions: Vec<Restriction>,
    non_revoked: Option<NonRevokedInterval>,
}

#[derive(Serialize, Deserialize)]
struct AttributeGroupWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    restrictions: Option<Vec<Restriction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    non_revoked: Option<NonRevokedInterval>,
}

impl TryFrom<AttributeGroupWire> for AttributeGroupRequest {
    type Error = Error;

    fn try_from(wire: AttributeGroupWire) -> Result<Self> {
        let names = match (wire.name, wire.names) {
            (Some(name), None) => NonEmptyVec::new(name),
            (None, Some(names)) => {
                NonEmptyVec::try_from(names).context("`names` must not be empty")?
            }
            (Some(_), Some(_)) => bail!("`name` and `names` are mutually exclusive"),
            (None, None) => bail!("one of `name` or `names` is required"),
        };
        if let Some(name) = names.first_duplicate() {
            bail!("attribute '{name}' is named twice in the same group")
        }
        Ok(Self {
            names,
            restrictions: wire.restrictions.unwrap_or_default(),
            non_revoked: wire.non_revoked,
        })
    }
}

impl From<AttributeGroupRequest> for AttributeGroupWire {
    fn from(group: AttributeGroupRequest) -> Self {
        let (name, names) = if group.names.len() == 1 {
            (Some(group.names.head().clone()), None)
        } else {
            (None, Some(group.names.into_inner()))
        };
        Self {
            name,
            names,
            restrictions: Some(group.restrictions).filter(|r| !r.is_empty()),
            non_revoked: group.non_revoked,
        }
    }
}

impl AttributeGroupRequest {
    /// Request a single attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self::jointly(NonEmptyVec::new(name.into()))
    }

    /// Request several attributes that must all come from the same credential.
    pub fn jointly(names: NonEmptyVec<String>) -> Self {
        Self {
            names,
            restrictions: Vec::new(),
            non_revoked: None,
        }
    }

    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    pub fn names(&self) -> &NonEmptyVec<String> {
        &self.names
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn is_unrestricted(&self) -> bool {
        self.restrictions.is_empty()
    }

    /// Whether the credential passes the restrictions and carries every named attribute.
    pub fn is_satisfied_by(&self, credential: &CredentialInfo) -> bool {
        restrictions_satisfied(&self.restrictions, credential)
            && self
                .names
                .iter()
                .all(|name| credential.value(name).is_some())
    }
}

/// Comparison operator of a predicate clause.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PredicateType {
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "<")]
    Less,
}

impl PredicateType {
    pub fn is_satisfied(&self, value: i64, threshold: i64) -> bool {
        match self {
            PredicateType::GreaterOrEqual => value >= threshold,
            PredicateType::Greater => value > threshold,
            PredicateType::LessOrEqual => value <= threshold,
            PredicateType::Less => value < threshold,
        }
    }
}

/// A request to prove that an attribute satisfies a threshold without revealing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredicateGroupRequest {
    pub name: String,
    pub p_type: PredicateType,
    pub p_value: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PredicateGroupRequest {
    pub fn new(name: impl Into<String>, p_type: PredicateType, p_value: i64) -> Self {
        Self {
            name: name.into(),
            p_type,
            p_value,
            restrictions: Vec::new(),
            non_revoked: None,
        }
    }

    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Whether the credential passes the restrictions and holds an integer value
    /// meeting the threshold.
    pub fn is_satisfied_by(&self, credential: &CredentialInfo) -> bool {
        restrictions_satisfied(&self.restrictions, credential)
            && credential
                .value(&self.name)
                .and_then(|value| value.trim().parse::<i64>().ok())
                .is_some_and(|value| self.p_type.is_satisfied(value, self.p_value))
    }
}

/// The clause a referent names within a [ProofRequest].
#[derive(Debug, Clone, Copy)]
pub enum ReferentGroup<'a> {
    Attribute(&'a AttributeGroupRequest),
    Predicate(&'a PredicateGroupRequest),
}

/// An Indy-style proof request.
///
/// Referents are unique across both the attribute and the predicate maps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ProofRequestWire", into = "ProofRequestWire")]
pub struct ProofRequest {
    name: String,
    version: String,
    nonce: String,
    requested_attributes: BTreeMap<Referent, AttributeGroupRequest>,
    requested_predicates: BTreeMap<Referent, PredicateGroupRequest>,
    non_revoked: Option<NonRevokedInterval>,
}

#[derive(Serialize, Deserialize)]
struct ProofRequestWire {
    name: String,
    version: String,
    nonce: String,
    #[serde(default)]
    requested_attributes: BTreeMap<Referent, AttributeGroupRequest>,
    #[serde(default)]
    requested_predicates: BTreeMap<Referent, PredicateGroupRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    non_revoked: Option<NonRevokedInterval>,
}

impl TryFrom<ProofRequestWire> for ProofRequest {
    type Error = Error;

    fn try_from(wire: ProofRequestWire) -> Result<Self> {
        if let Some(referent) = wire
            .requested_attributes
            .keys()
            .find(|referent| wire.requested_predicates.contains_key(*referent))
        {
            bail!("referent '{referent}' names both an attribute group and a predicate")
        }
        Ok(Self {
            name: wire.name,
            version: wire.version,
            nonce: wire.nonce,
            requested_attributes: wire.requested_attributes,
            requested_predicates: wire.requested_predicates,
            non_revoked: wire.non_revoked,
        })
    }
}

impl From<ProofRequest> for ProofRequestWire {
    fn from(request: ProofRequest) -> Self {
        Self {
            name: request.name,
            version: request.version,
            nonce: request.nonce,
            requested_attributes: request.requested_attributes,
            requested_predicates: request.requested_predicates,
            non_revoked: request.non_revoked,
        }
    }
}

impl ProofRequest {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            nonce: nonce.into(),
            requested_attributes: BTreeMap::new(),
            requested_predicates: BTreeMap::new(),
            non_revoked: None,
        }
    }

    /// Add an attribute group under a fresh referent.
    pub fn with_attribute(
        mut self,
        referent: impl Into<Referent>,
        group: AttributeGroupRequest,
    ) -> Result<Self> {
        let referent = self.fresh_referent(referent.into())?;
        self.requested_attributes.insert(referent, group);
        Ok(self)
    }

    /// Add a predicate under a fresh referent.
    pub fn with_predicate(
        mut self,
        referent: impl Into<Referent>,
        group: PredicateGroupRequest,
    ) -> Result<Self> {
        let referent = self.fresh_referent(referent.into())?;
        self.requested_predicates.insert(referent, group);
        Ok(self)
    }

    fn fresh_referent(&self, referent: Referent) -> Result<Referent> {
        if self.group(&referent).is_some() {
            bail!("referent '{referent}' is already in use")
        }
        Ok(referent)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Attribute groups, in referent order.
    pub fn requested_attributes(&self) -> &BTreeMap<Referent, AttributeGroupRequest> {
        &self.requested_attributes
    }

    /// Predicates, in referent order.
    pub fn requested_predicates(&self) -> &BTreeMap<Referent, PredicateGroupRequest> {
        &self.requested_predicates
    }

    pub fn group(&self, referent: &str) -> Option<ReferentGroup<'_>> {
        if let Some(group) = self.requested_attributes.get(referent) {
            return Some(ReferentGroup::Attribute(group));
        }
        self.requested_predicates
            .get(referent)
            .map(ReferentGroup::Predicate)
    }
}
