//! Core data model: requests, identities, amounts, and committed records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::ValidationError;

/// Validated email-like identity a fact is recorded against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parse and validate an identity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the input is empty or not shaped like an
    /// email address.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIdentity);
        }

        let malformed = || ValidationError::MalformedIdentity {
            identity: trimmed.to_string(),
        };

        let (local, domain) = trimmed.split_once('@').ok_or_else(malformed)?;
        let domain_ok = domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());

        if local.is_empty()
            || domain.contains('@')
            || !domain_ok
            || trimmed.contains(char::is_whitespace)
        {
            return Err(malformed());
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

/// Strictly positive decimal amount with at most two fractional digits.
///
/// Stored as integer minor units. Displays with exactly two fractional
/// digits, so `50`, `50.0` and `50.00` render identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u64);

impl Amount {
    /// Build an amount from minor units (cents).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositiveAmount` for zero.
    pub const fn from_minor_units(cents: u64) -> Result<Self, ValidationError> {
        if cents == 0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        Ok(Self(cents))
    }

    /// The amount in minor units.
    pub const fn minor_units(self) -> u64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidAmount {
            input: trimmed.to_string(),
        };

        if trimmed.starts_with('-') {
            return Err(ValidationError::NonPositiveAmount);
        }

        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
            return Err(invalid());
        }
        if trimmed.contains('.') && fraction.is_empty() {
            return Err(invalid());
        }
        if fraction.len() > 2 {
            return Err(ValidationError::TooManyDecimals {
                input: trimmed.to_string(),
            });
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let cents: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let total = whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .ok_or_else(invalid)?;

        Self::from_minor_units(total)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl TryFrom<String> for Amount {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

/// A logical "record this fact" request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionRequest {
    identity: Identity,
    amount: Amount,
}

impl SubmissionRequest {
    /// Validate raw caller input into a request.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if either field is malformed.
    pub fn new(identity: &str, amount: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            identity: Identity::parse(identity)?,
            amount: amount.parse()?,
        })
    }

    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Token used to reject concurrent dispatches of the same pair.
    ///
    /// Ignores time entirely; compare [`crate::IdempotencyKey`], which buckets
    /// by second.
    pub fn dedupe_token(&self) -> String {
        format!("{}:{}", self.identity, self.amount)
    }
}

/// Unique identifier for a committed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Ulid);

impl RecordId {
    /// Create a new random record ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal status stored alongside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Success,
    Error,
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// The recorded fact. Created once per idempotency key, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: RecordId,
    pub identity: Identity,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
    pub status: TerminalStatus,
    pub error_detail: Option<String>,
}

impl SubmissionRecord {
    /// Create a successful record for a request.
    pub fn success(request: &SubmissionRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id: RecordId::new(),
            identity: request.identity().clone(),
            amount: request.amount(),
            created_at,
            status: TerminalStatus::Success,
            error_detail: None,
        }
    }

    /// Create an error record. Never cacheable.
    pub fn error(
        request: &SubmissionRequest,
        created_at: DateTime<Utc>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            identity: request.identity().clone(),
            amount: request.amount(),
            created_at,
            status: TerminalStatus::Error,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TerminalStatus::Success
    }
}
