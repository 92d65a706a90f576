use anyhow::{bail, Error};
use serde::Deserialize;

/// Prover settings that shape automatic presentation.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Open new exchanges with `auto_present` set.
    pub auto_respond_presentation_request: bool,
    /// Keep exchange records once they complete.
    pub preserve_exchange_records: bool,
    /// Maximum number of candidates fetched per referent.
    pub credential_search_limit: SearchLimit,
}

/// A non-zero bound on the size of a credential search.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "usize")]
pub struct SearchLimit(usize);

impl SearchLimit {
    pub const DEFAULT: SearchLimit = SearchLimit(100);

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for SearchLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for SearchLimit {
    type Error = Error;

    fn try_from(limit: usize) -> Result<Self, Self::Error> {
        if limit == 0 {
            bail!("credential search limit must be at least 1")
        }
        Ok(Self(limit))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config: Config = serde_json::from_value(json!({})).unwrap();
        assert!(!config.auto_respond_presentation_request);
        assert!(!config.preserve_exchange_records);
        assert_eq!(100, config.credential_search_limit.get());
    }

    #[test]
    fn zero_limit() {
        assert!(serde_json::from_value::<Config>(json!({"credential_search_limit": 0})).is_err());
        let config: Config = serde_json::from_value(json!({
            "auto_respond_presentation_request": true,
            "credential_search_limit": 5
        }))
        .unwrap();
        assert!(config.auto_respond_presentation_request);
        assert_eq!(5, config.credential_search_limit.get());
    }
}
