use std::marker::PhantomData;

use anyhow::{bail, Result};
use log::{debug, trace};
use zeroize::Zeroizing;

use crate::{
    logon::{Credentials, LogonOptions},
    platform::SecurityContext,
    resolver::IdentityResolver,
    runner::ImpersonationRunner,
};

/// Credentials produced for one record. The password buffer is wiped on drop.
#[derive(Clone, Default)]
pub struct RenderedCredentials {
    pub username: String,
    pub domain: String,
    pub password: Zeroizing<String>,
}

impl RenderedCredentials {
    pub fn new(
        username: impl Into<String>,
        domain: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            domain: domain.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn as_credentials(&self) -> Credentials<'_> {
        Credentials::new(&self.username, &self.domain, &self.password)
    }
}

impl std::fmt::Debug for RenderedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.as_credentials(), f)
    }
}

/// Turns a record into the credentials it should be written with.
///
/// `None` stands for the empty record used while initializing.
pub trait CredentialLayout<R> {
    fn render(&self, record: Option<&R>) -> RenderedCredentials;
}

/// The same credentials for every record.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub RenderedCredentials);

impl<R> CredentialLayout<R> for StaticCredentials {
    fn render(&self, _record: Option<&R>) -> RenderedCredentials {
        self.0.clone()
    }
}

impl<R, F> CredentialLayout<R> for F
where
    F: Fn(Option<&R>) -> RenderedCredentials,
{
    fn render(&self, record: Option<&R>) -> RenderedCredentials {
        self(record)
    }
}

/// The sink that actually stores records.
pub trait RecordWriter<R> {
    fn write(&mut self, record: &R) -> Result<()>;

    fn write_batch(&mut self, records: &[R]) -> Result<()> {
        records.iter().try_for_each(|record| self.write(record))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes every record through `inner` while impersonating the identity its credentials name.
///
/// With `revert_to_self` set, the writes run as the process identity instead. When the
/// credentials cannot be logged on, the record is not written at all.
pub struct ImpersonatingWriter<R, L, W, C>
where
    L: CredentialLayout<R>,
    W: RecordWriter<R>,
    C: SecurityContext,
{
    layout: L,
    inner: W,
    resolver: IdentityResolver<C>,
    runner: ImpersonationRunner<C>,
    closing: bool,
    inner_closed: bool,
    _record: PhantomData<fn(&R)>,
}

impl<R, L, W, C> ImpersonatingWriter<R, L, W, C>
where
    L: CredentialLayout<R>,
    W: RecordWriter<R>,
    C: SecurityContext + Clone,
{
    pub fn new(
        context: C,
        layout: L,
        inner: W,
        options: LogonOptions,
        revert_to_self: bool,
    ) -> Self {
        Self {
            layout,
            inner,
            resolver: IdentityResolver::new(context.clone(), options, revert_to_self),
            runner: ImpersonationRunner::new(context, options.impersonation_level),
            closing: false,
            inner_closed: false,
            _record: PhantomData,
        }
    }
}

impl<R, L, W, C> ImpersonatingWriter<R, L, W, C>
where
    L: CredentialLayout<R>,
    W: RecordWriter<R>,
    C: SecurityContext,
{
    /// Logs on ahead of the first write if the credentials are already complete.
    pub fn initialize(&mut self) -> Result<()> {
        self.ensure_open()?;
        let credentials = self.layout.render(None);
        let identity = self.resolver.resolve(&credentials.as_credentials(), false)?;
        match identity {
            Some(identity) => debug!("Initialized with identity #{}", identity.id()),
            None => debug!("Initialized without an identity"),
        }
        Ok(())
    }

    pub fn write(&mut self, record: &R) -> Result<()> {
        self.ensure_open()?;
        let credentials = self.layout.render(Some(record));
        let identity = self.resolver.resolve(&credentials.as_credentials(), true)?;
        self.runner
            .run(identity, |inner: &mut W| inner.write(record), &mut self.inner)
    }

    /// Writes `records` under a single impersonation, using the first record's credentials.
    pub fn write_batch(&mut self, records: &[R]) -> Result<()> {
        self.ensure_open()?;
        let first = match records.first() {
            Some(first) => first,
            None => return Ok(()),
        };

        trace!("Writing a batch of {}", records.len());
        let credentials = self.layout.render(Some(first));
        let identity = self.resolver.resolve(&credentials.as_credentials(), true)?;
        self.runner.run(
            identity,
            |inner: &mut W| inner.write_batch(records),
            &mut self.inner,
        )
    }

    /// Flushes `inner` as the cached identity, without logging on.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.runner.run(
            self.resolver.current(),
            |inner: &mut W| inner.flush(),
            &mut self.inner,
        )
    }

    /// Closes `inner` and releases the cached identity. The identity is released even if
    /// closing `inner` fails. Writes are refused from the first call on; if `inner` could not
    /// be reached, a later call tries again.
    pub fn close(&mut self) -> Result<()> {
        self.closing = true;

        let result = if self.inner_closed {
            Ok(())
        } else {
            let inner_closed = &mut self.inner_closed;
            self.runner.run(
                self.resolver.current(),
                |inner: &mut W| {
                    *inner_closed = true;
                    inner.close()
                },
                &mut self.inner,
            )
        };
        self.resolver.close();
        result
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closing {
            bail!("The writer is closed");
        }
        Ok(())
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    pub fn resolver(&self) -> &IdentityResolver<C> {
        &self.resolver
    }
}
