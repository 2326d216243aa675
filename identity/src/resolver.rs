use log::{debug, trace};

use crate::{
    error::LogonError,
    handle::IdentityHandle,
    logon::{Credentials, LogonOptions},
    platform::SecurityContext,
};

/// Keeps at most one logged-on identity and decides, per call, whether it can be reused.
///
/// Mutation goes through `&mut self`; an embedder that shares a resolver between threads has
/// to put it behind a lock.
pub struct IdentityResolver<C: SecurityContext> {
    context: C,
    options: LogonOptions,
    revert_to_self: bool,
    cached: Option<IdentityHandle<C::Token>>,
}

impl<C: SecurityContext> IdentityResolver<C> {
    pub fn new(context: C, options: LogonOptions, revert_to_self: bool) -> Self {
        Self {
            context,
            options,
            revert_to_self,
            cached: None,
        }
    }

    pub fn options(&self) -> &LogonOptions {
        &self.options
    }

    pub fn revert_to_self(&self) -> bool {
        self.revert_to_self
    }

    /// Returns the identity to impersonate for `credentials`, or `None` to run as the process.
    ///
    /// A cached identity issued for the same username, domain and password is returned as is.
    /// Otherwise the cached identity is released, and a new one is logged on if `force_create`
    /// is set or both username and password are present.
    pub fn resolve(
        &mut self,
        credentials: &Credentials<'_>,
        force_create: bool,
    ) -> Result<Option<&IdentityHandle<C::Token>>, LogonError> {
        if self.revert_to_self {
            return Ok(None);
        }

        let reusable = matches!(
            &self.cached,
            Some(handle) if handle.is_valid(credentials.username, credentials.domain, credentials.password)
        );
        if reusable {
            trace!("Reusing cached identity");
            return Ok(self.cached.as_ref());
        }

        if let Some(mut stale) = self.cached.take() {
            debug!("Credentials changed, releasing identity #{}", stale.id());
            stale.close();
        }

        if force_create || credentials.is_complete() {
            let handle = IdentityHandle::create(&self.context, credentials, &self.options)?;
            debug!("Cached identity #{}", handle.id());
            self.cached = Some(handle);
        }

        Ok(self.cached.as_ref())
    }

    /// The cached identity, without looking at any credentials.
    pub fn current(&self) -> Option<&IdentityHandle<C::Token>> {
        self.cached.as_ref()
    }

    pub fn close(&mut self) {
        if let Some(mut handle) = self.cached.take() {
            handle.close();
        }
    }
}

impl<C: SecurityContext> Drop for IdentityResolver<C> {
    fn drop(&mut self) {
        self.close();
    }
}
