//! # Account Identifiers
//!
//! Accounts are 20-byte addresses rendered as `0x`-prefixed hex. Human labels
//! such as `alice` map to a deterministic address through SHA-256, so the CLI
//! and tests can name parties without juggling raw hex.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::AccountError;

/// Length of an account address in bytes
pub const ACCOUNT_LEN: usize = 20;

/// A ledger account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId([u8; ACCOUNT_LEN]);

impl AccountId {
    /// The "no account" sentinel. Never a valid caller or recipient.
    pub const ZERO: AccountId = AccountId([0u8; ACCOUNT_LEN]);

    pub const fn from_bytes(bytes: [u8; ACCOUNT_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic address from a human-readable label.
    ///
    /// The address is the last 20 bytes of `sha256(label)`.
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; ACCOUNT_LEN];
        bytes.copy_from_slice(&digest[digest.len() - ACCOUNT_LEN..]);
        Self::from_bytes(bytes)
    }

    /// Parse either a hex address (`0x...`) or fall back to a label.
    pub fn parse_or_label(input: &str) -> Result<Self, AccountError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AccountError::Empty);
        }
        if input.starts_with("0x") || input.starts_with("0X") {
            input.parse()
        } else {
            Ok(Self::from_label(input))
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl FromStr for AccountId {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AccountError::Empty);
        }
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let decoded = hex::decode(digits)?;
        let bytes: [u8; ACCOUNT_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| AccountError::Length {
                expected: ACCOUNT_LEN,
                actual: decoded.len(),
            })?;
        Ok(Self::from_bytes(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
