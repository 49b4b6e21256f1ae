use thiserror::Error;

/// Top-level error type for the Makro runtime.
///
/// Every user-visible failure falls into one of these buckets; the gateway
/// maps each variant to a localized ephemeral message at the dispatch
/// boundary, so raw errors never reach the platform.
#[derive(Debug, Error)]
pub enum MakroError {
    #[error("unauthenticated request")]
    Authentication,

    #[error("validation failed: {0}")]
    Validation(ValidationKind),

    #[error("policy violation: {0}")]
    Policy(PolicyKind),

    #[error("command not found")]
    NotFound,

    #[error("command name already in use")]
    Conflict,

    #[error("registry sync failed: {0}")]
    RemoteSync(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Malformed user input, rejected before any state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationKind {
    #[error("must be used in a server")]
    GuildOnly,
    #[error("invalid command name")]
    Name,
    #[error("command name is reserved")]
    ReservedName,
    #[error("reply is required")]
    Reply,
    #[error("visibility did not resolve to a boolean")]
    Visibility,
    #[error("unsupported modal")]
    UnsupportedModal,
}

/// Allowed-but-denied: the request was well formed, policy said no.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyKind {
    #[error("guild is banned")]
    Banned,
    #[error("command limit reached ({0})")]
    LimitReached(u32),
    #[error("manage server permission required")]
    ManageRequired,
    #[error("invoker holds none of the allowed roles")]
    RoleDenied,
}

impl MakroError {
    /// Wrap a storage-layer failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type MakroResult<T> = Result<T, MakroError>;
