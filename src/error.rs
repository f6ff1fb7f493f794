use std::path::PathBuf;
use thiserror::Error;

use crate::cycle::{BillingKind, PaymentStatus};

/// Broad category of a failure, used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Do not retry.
    Validation,
    /// The bill does not exist yet or its state forbids the action. Re-fetch state.
    Precondition,
    /// Tenant, bill or rate configuration is absent.
    NotFound,
    /// Datastore or gateway unavailable. Safe to retry.
    Transient,
    /// Local configuration is missing or unreadable.
    Config,
}

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Config directory not found at {0}. Run 'rentcycle init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Payment gateway is not configured. Add a [gateway] section to config.toml.")]
    GatewayNotConfigured,

    #[error("Tenant '{0}' not found in tenants.toml")]
    TenantNotFound(String),

    #[error("Bill '{0}' not found")]
    BillNotFound(String),

    #[error("No utility rates configured for building '{0}'")]
    RateNotFound(String),

    #[error("Invalid payment term {0}: must be at least 1")]
    InvalidPaymentTerm(i64),

    #[error("Current reading {current} is below previous reading {previous}")]
    NegativeConsumption { previous: f64, current: f64 },

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Payment proof must not be empty")]
    EmptyProof,

    #[error("Rejection reason must not be empty")]
    EmptyReason,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD or an RFC 3339 timestamp")]
    InvalidDate(String),

    #[error("Unknown billing kind '{0}'. Use rent, electricity, water or generator")]
    InvalidKind(String),

    #[error("No {kind} bill has been generated for tenant '{tenant}' yet")]
    BillNotGenerated { tenant: String, kind: BillingKind },

    #[error("Cannot {action} bill {bill}: status is {status}, expected one of {expected}")]
    InvalidState {
        bill: String,
        action: &'static str,
        status: PaymentStatus,
        expected: String,
    },

    #[error("Rejection is not supported for {0} bills")]
    RejectNotSupported(BillingKind),

    #[error("Transaction '{tx_ref}' is not verified (gateway status: {status})")]
    UnverifiedTransaction { tx_ref: String, status: String },

    #[error("Bill '{bill}' has no checkout transaction; run 'rentcycle pay' first")]
    NoTransaction { bill: String },

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Bill store unavailable: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BillingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPaymentTerm(_)
            | Self::NegativeConsumption { .. }
            | Self::MissingField(_)
            | Self::EmptyProof
            | Self::EmptyReason
            | Self::InvalidDate(_)
            | Self::InvalidKind(_) => ErrorKind::Validation,

            Self::BillNotGenerated { .. }
            | Self::InvalidState { .. }
            | Self::RejectNotSupported(_)
            | Self::UnverifiedTransaction { .. }
            | Self::NoTransaction { .. } => ErrorKind::Precondition,

            Self::TenantNotFound(_) | Self::BillNotFound(_) | Self::RateNotFound(_) => {
                ErrorKind::NotFound
            }

            Self::Gateway(_) | Self::Store(_) | Self::Io(_) => ErrorKind::Transient,

            Self::ConfigNotFound(_)
            | Self::ConfigFileNotFound(_)
            | Self::ConfigParse { .. }
            | Self::AlreadyInitialized(_)
            | Self::GatewayNotConfigured => ErrorKind::Config,
        }
    }

    /// Shorthand for an invalid-state guard failure.
    pub(crate) fn invalid_state(
        bill: &str,
        action: &'static str,
        status: PaymentStatus,
        expected: &[PaymentStatus],
    ) -> Self {
        let expected = expected
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self::InvalidState {
            bill: bill.to_string(),
            action,
            status,
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
