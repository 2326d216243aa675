use crate::{
    error::{ContextSwitchError, LogonError},
    logon::{Credentials, ImpersonationLevel, LogonOptions},
};

/// An owned OS security token.
pub trait AccessToken: Sized {
    /// `None` for a primary token, which carries no impersonation level.
    fn impersonation_level(&self) -> Option<ImpersonationLevel>;

    /// Returns a new impersonation token at `level`. `self` is left untouched.
    fn duplicate(&self, level: ImpersonationLevel) -> Result<Self, LogonError>;

    /// Releases the OS resource.
    fn close(self) -> Result<(), LogonError>;
}

/// The OS primitives the core needs: logging a principal on and switching the calling
/// thread between security contexts.
pub trait SecurityContext {
    type Token: AccessToken;

    /// Whatever is needed to put the calling thread back the way it was.
    type Saved;

    fn logon(
        &self,
        credentials: &Credentials<'_>,
        options: &LogonOptions,
    ) -> Result<Self::Token, LogonError>;

    fn capture(&self) -> Result<Self::Saved, ContextSwitchError>;

    fn impersonate(&self, token: &Self::Token) -> Result<(), ContextSwitchError>;

    /// Impersonates the process identity itself.
    fn impersonate_self(&self, level: ImpersonationLevel) -> Result<(), ContextSwitchError>;

    fn restore(&self, saved: Self::Saved) -> Result<(), ContextSwitchError>;
}
