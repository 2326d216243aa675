use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogonErrorKind {
    AuthenticationFailure,
    ResourceExhaustion,
    InvalidParameter,
    PlatformError,
}

impl LogonErrorKind {
    /// Classifies a Win32 error code returned by the logon and token APIs.
    pub fn from_win32(code: u32) -> Self {
        const ERROR_INVALID_HANDLE: u32 = 6;
        const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
        const ERROR_OUTOFMEMORY: u32 = 14;
        const ERROR_INVALID_PARAMETER: u32 = 87;
        const ERROR_INVALID_NAME: u32 = 123;
        const ERROR_BAD_ARGUMENTS: u32 = 160;
        const ERROR_NOT_ENOUGH_SERVER_MEMORY: u32 = 1130;
        const ERROR_NO_SUCH_LOGON_SESSION: u32 = 1312;
        const ERROR_PRIVILEGE_NOT_HELD: u32 = 1314;
        const ERROR_NO_SUCH_USER: u32 = 1317;
        const ERROR_LOGON_FAILURE: u32 = 1326;
        const ERROR_ACCOUNT_DISABLED: u32 = 1331;
        const ERROR_LOGON_TYPE_NOT_GRANTED: u32 = 1385;
        const ERROR_NO_SYSTEM_RESOURCES: u32 = 1450;
        const ERROR_ACCOUNT_EXPIRED: u32 = 1793;
        const ERROR_TOO_MANY_CONTEXT_IDS: u32 = 1816;
        const ERROR_PASSWORD_MUST_CHANGE: u32 = 1907;
        const ERROR_ACCOUNT_LOCKED_OUT: u32 = 1909;

        match code {
            ERROR_LOGON_FAILURE..=ERROR_ACCOUNT_DISABLED
            | ERROR_PRIVILEGE_NOT_HELD
            | ERROR_LOGON_TYPE_NOT_GRANTED
            | ERROR_ACCOUNT_EXPIRED
            | ERROR_PASSWORD_MUST_CHANGE
            | ERROR_ACCOUNT_LOCKED_OUT => Self::AuthenticationFailure,
            ERROR_NOT_ENOUGH_MEMORY
            | ERROR_OUTOFMEMORY
            | ERROR_NO_SYSTEM_RESOURCES
            | ERROR_TOO_MANY_CONTEXT_IDS
            | ERROR_NOT_ENOUGH_SERVER_MEMORY => Self::ResourceExhaustion,
            ERROR_INVALID_HANDLE
            | ERROR_INVALID_PARAMETER
            | ERROR_INVALID_NAME
            | ERROR_BAD_ARGUMENTS
            | ERROR_NO_SUCH_LOGON_SESSION
            | ERROR_NO_SUCH_USER => Self::InvalidParameter,
            _ => Self::PlatformError,
        }
    }
}

impl std::fmt::Display for LogonErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthenticationFailure => write!(f, "authentication failure"),
            Self::ResourceExhaustion => write!(f, "resource exhaustion"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::PlatformError => write!(f, "platform error"),
        }
    }
}

/// Acquiring, duplicating or releasing a security token failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} failed: {kind} (native error {code})")]
pub struct LogonError {
    pub operation: TokenOperation,
    pub kind: LogonErrorKind,
    pub code: u32,
}

impl LogonError {
    pub fn new(operation: TokenOperation, kind: LogonErrorKind, code: u32) -> Self {
        Self {
            operation,
            kind,
            code,
        }
    }

    pub fn from_win32(operation: TokenOperation, code: u32) -> Self {
        Self::new(operation, LogonErrorKind::from_win32(code), code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenOperation {
    Logon,
    Duplicate,
    Close,
}

impl std::fmt::Display for TokenOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logon => write!(f, "Logon"),
            Self::Duplicate => write!(f, "Token duplication"),
            Self::Close => write!(f, "Token release"),
        }
    }
}

/// Entering or leaving an impersonation context failed. Always fatal to the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextSwitchError {
    #[error("Capturing the current thread context failed (native error {code})")]
    Capture { code: u32 },
    #[error("Entering the impersonation context failed (native error {code})")]
    Enter { code: u32 },
    #[error("Reverting the impersonation context failed (native error {code})")]
    Revert { code: u32 },
    #[error("The identity handle was already closed")]
    ClosedIdentity,
}

impl ContextSwitchError {
    pub fn code(&self) -> Option<u32> {
        match self {
            Self::Capture { code } | Self::Enter { code } | Self::Revert { code } => Some(*code),
            Self::ClosedIdentity => None,
        }
    }
}
