//! Running code as another Windows principal.
//!
//! [`IdentityResolver`] turns rendered credentials into a cached [`IdentityHandle`],
//! [`ImpersonationRunner`] runs an operation while impersonating it, and
//! [`ImpersonatingWriter`] ties both to a record sink. The OS is reached only through
//! [`SecurityContext`] and [`AccessToken`].

pub mod error;
mod fingerprint;
pub mod handle;
pub mod logon;
pub mod platform;
pub mod resolver;
pub mod runner;
pub mod writer;

#[cfg(test)]
mod fake;

pub use error::{ContextSwitchError, LogonError, LogonErrorKind, TokenOperation};
pub use handle::IdentityHandle;
pub use logon::{Credentials, ImpersonationLevel, LogonOptions, LogonProvider, LogonType};
pub use platform::{AccessToken, SecurityContext};
pub use resolver::IdentityResolver;
pub use runner::ImpersonationRunner;
pub use writer::{
    CredentialLayout, ImpersonatingWriter, RecordWriter, RenderedCredentials, StaticCredentials,
};
