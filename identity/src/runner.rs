use std::{marker::PhantomData, process::abort};

use log::{error, trace};

use crate::{
    error::ContextSwitchError,
    handle::IdentityHandle,
    logon::ImpersonationLevel,
    platform::SecurityContext,
};

/// Runs operations inside an impersonation context and always puts the thread back.
pub struct ImpersonationRunner<C: SecurityContext> {
    context: C,
    self_level: ImpersonationLevel,
}

impl<C: SecurityContext> ImpersonationRunner<C> {
    /// `self_level` is the level used when impersonating the process itself.
    pub fn new(context: C, self_level: ImpersonationLevel) -> Self {
        Self {
            context,
            self_level,
        }
    }

    /// Invokes `operation(state)` as `identity`, or as the process identity if there is none.
    ///
    /// The thread is reverted to its previous context before this returns, whether
    /// `operation` succeeded, returned an error or panicked. Errors and panics from
    /// `operation` reach the caller unchanged. If the context cannot be entered, `operation`
    /// is not called. If it cannot be reverted, that error is returned instead of the
    /// operation's result; during a panic it aborts the process.
    pub fn run<S, T, E, F>(
        &self,
        identity: Option<&IdentityHandle<C::Token>>,
        operation: F,
        state: S,
    ) -> Result<T, E>
    where
        F: FnOnce(S) -> Result<T, E>,
        E: From<ContextSwitchError>,
    {
        let guard = self.enter(identity)?;
        let result = operation(state);
        if let Err(error) = guard.revert() {
            if result.is_err() {
                error!("Operation failed and reverting also failed: {}", error);
            }
            return Err(error.into());
        }
        result
    }

    fn enter(
        &self,
        identity: Option<&IdentityHandle<C::Token>>,
    ) -> Result<ContextGuard<'_, C>, ContextSwitchError> {
        let saved = self.context.capture()?;

        // `saved` is dropped without a restore on failure: nothing was entered.
        match identity {
            Some(identity) => {
                let token = identity.token().ok_or(ContextSwitchError::ClosedIdentity)?;
                trace!("Impersonating identity #{}", identity.id());
                self.context.impersonate(token)?;
            }
            None => {
                trace!("Impersonating self at {}", self.self_level);
                self.context.impersonate_self(self.self_level)?;
            }
        }

        Ok(ContextGuard {
            context: &self.context,
            saved: Some(saved),
            _not_send: PhantomData,
        })
    }
}

/// An entered impersonation context. Reverting is the release action.
#[must_use]
struct ContextGuard<'a, C: SecurityContext> {
    context: &'a C,
    saved: Option<C::Saved>,
    _not_send: PhantomData<*const ()>,
}

impl<C: SecurityContext> ContextGuard<'_, C> {
    fn revert(mut self) -> Result<(), ContextSwitchError> {
        match self.saved.take() {
            Some(saved) => self.context.restore(saved),
            None => Ok(()),
        }
    }
}

impl<C: SecurityContext> Drop for ContextGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            if let Err(error) = self.context.restore(saved) {
                error!("{} while unwinding, aborting", error);
                abort();
            }
        }
    }
}
