use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace, warn};

use crate::{
    error::LogonError,
    fingerprint::PasswordFingerprint,
    logon::{Credentials, LogonOptions},
    platform::{AccessToken, SecurityContext},
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A logged-on principal and the token that represents it.
///
/// The handle remembers which credentials produced it so that a later request for the same
/// credentials can reuse the token instead of logging on again. That comparison is a cache
/// lookup: it does not re-authenticate anything, and a token stays in use even if the account
/// is disabled or its password changed in the directory after the logon.
///
/// The plaintext password is not kept; only a salted digest of it is.
pub struct IdentityHandle<T: AccessToken> {
    id: u64,
    username: String,
    domain: String,
    fingerprint: PasswordFingerprint,
    token: Option<T>,
}

impl<T: AccessToken> IdentityHandle<T> {
    pub fn create<C>(
        context: &C,
        credentials: &Credentials<'_>,
        options: &LogonOptions,
    ) -> Result<Self, LogonError>
    where
        C: SecurityContext<Token = T>,
    {
        debug!(
            "Logging on {}\\{} ({}, {}, {})",
            credentials.domain,
            credentials.username,
            options.logon_type,
            options.logon_provider,
            options.impersonation_level
        );

        let token = context.logon(credentials, options)?;
        let token = Self::at_level(token, options)?;

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Ok(Self {
            id,
            username: credentials.username.to_string(),
            domain: credentials.domain.to_string(),
            fingerprint: PasswordFingerprint::new(id, credentials.password),
            token: Some(token),
        })
    }

    fn at_level(token: T, options: &LogonOptions) -> Result<T, LogonError> {
        if token.impersonation_level() == Some(options.impersonation_level) {
            return Ok(token);
        }

        trace!("Duplicating token at {}", options.impersonation_level);
        let duplicate = token.duplicate(options.impersonation_level);
        if let Err(error) = token.close() {
            warn!("Releasing the intermediate logon token failed with {}", error);
        }
        duplicate
    }

    /// Process-unique serial number of this handle.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Whether this handle was issued for exactly these credentials.
    pub fn is_valid(&self, username: &str, domain: &str, password: &str) -> bool {
        self.username == username && self.domain == domain && self.fingerprint.matches(password)
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_none()
    }

    pub(crate) fn token(&self) -> Option<&T> {
        self.token.as_ref()
    }

    /// Releases the token. Further calls do nothing. A failed release is only logged.
    pub fn close(&mut self) {
        if let Some(token) = self.token.take() {
            trace!("Closing identity #{} ({}\\{})", self.id, self.domain, self.username);
            if let Err(error) = token.close() {
                warn!("Identity #{}: {}", self.id, error);
            }
        }
    }
}

impl<T: AccessToken> Drop for IdentityHandle<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: AccessToken> std::fmt::Debug for IdentityHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityHandle")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
