//! Validation at the rule edit boundary
//!
//! Everything the user types goes through here before it can reach the store:
//! keys are cleaned into normalized form and must not be empty, boost input
//! must contain a number and is clamped.

use crate::boost::Boost;
use crate::types::AccountKey;
use crate::url::clean_rule_key;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("Please enter a domain name")]
    EmptyKey,
    #[error("Please enter a boost value between 0 and 600 (got {0:?})")]
    InvalidBoost(String),
    #[error("Account key {0:?} must look like platform:accountName")]
    InvalidAccountKey(String),
}

/// Where an adjustment made from the popup ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditScope {
    /// Applied to the current tab only, never saved.
    CurrentTab,
    /// Saved as a rule for the page's host.
    Site,
    /// Saved as an account rule for the page's account.
    Account,
}

/// Clean a user-typed rule key; rejects keys that clean to nothing.
pub fn validate_rule_key(raw: &str) -> Result<String, EditError> {
    let key = clean_rule_key(raw);
    if key.is_empty() {
        return Err(EditError::EmptyKey);
    }
    Ok(key.to_string())
}

/// Parse a user-typed boost; anything numeric is clamped into range.
pub fn parse_boost_input(raw: &str) -> Result<Boost, EditError> {
    Boost::parse(raw).ok_or_else(|| EditError::InvalidBoost(raw.to_string()))
}

/// A validated rule edit, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEdit {
    pub key: String,
    pub boost: Boost,
}

impl RuleEdit {
    pub fn new(raw_key: &str, boost: Boost) -> Result<Self, EditError> {
        Ok(Self {
            key: validate_rule_key(raw_key)?,
            boost,
        })
    }

    pub fn parse(raw_key: &str, raw_boost: &str) -> Result<Self, EditError> {
        let key = validate_rule_key(raw_key)?;
        let boost = parse_boost_input(raw_boost)?;
        Ok(Self { key, boost })
    }
}

/// A validated account rule edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountEdit {
    pub key: AccountKey,
    pub boost: Boost,
}

impl AccountEdit {
    pub fn parse(raw_key: &str, raw_boost: &str) -> Result<Self, EditError> {
        let key: AccountKey = raw_key.trim().parse()?;
        let boost = parse_boost_input(raw_boost)?;
        Ok(Self { key, boost })
    }
}
