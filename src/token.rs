use std::{cell::UnsafeCell, ffi::c_void, marker::PhantomData, mem::size_of};

use identity::{
    AccessToken, Credentials, ImpersonationLevel, LogonError, LogonErrorKind, LogonOptions,
    TokenOperation,
};
use log::warn;
use static_assertions::{assert_impl_all, assert_not_impl_all};
use widestring::U16CString;
use windows::{
    core::{Error, Result, PCWSTR},
    Win32::{
        Foundation::{CloseHandle, GetLastError, ERROR_NO_TOKEN, HANDLE},
        Security::{
            DuplicateToken, GetTokenInformation, LogonUserW, TokenImpersonation,
            TokenImpersonationLevel, TokenType, LOGON32_LOGON, LOGON32_PROVIDER,
            SECURITY_IMPERSONATION_LEVEL, TOKEN_ACCESS_MASK, TOKEN_INFORMATION_CLASS, TOKEN_TYPE,
        },
        System::Threading::{GetCurrentThread, OpenThreadToken, SetThreadToken},
    },
};
use zeroize::Zeroizing;

const ERROR_INVALID_PARAMETER: u32 = 87;

/// An owned Win32 access token handle.
#[derive(Debug)]
pub struct Token {
    handle: HANDLE,
    _send_not_sync: PhantomData<UnsafeCell<()>>,
}

assert_impl_all!(Token: Send);
assert_not_impl_all!(Token: Sync);

impl Token {
    fn from_raw(handle: HANDLE) -> Self {
        Self {
            handle,
            _send_not_sync: PhantomData,
        }
    }

    /// Logs the principal on with `LogonUserW`. The result is a primary token.
    pub fn logon(
        credentials: &Credentials<'_>,
        options: &LogonOptions,
    ) -> std::result::Result<Self, LogonError> {
        let invalid = |_| {
            LogonError::new(
                TokenOperation::Logon,
                LogonErrorKind::InvalidParameter,
                ERROR_INVALID_PARAMETER,
            )
        };
        let username = U16CString::from_str(credentials.username).map_err(invalid)?;
        let domain = U16CString::from_str(credentials.domain).map_err(invalid)?;
        let password = Zeroizing::new(
            U16CString::from_str(credentials.password)
                .map_err(invalid)?
                .into_vec_with_nul(),
        );

        let mut handle = HANDLE::default();
        let success = unsafe {
            LogonUserW(
                PCWSTR(username.as_ptr()),
                PCWSTR(domain.as_ptr()),
                PCWSTR(password.as_ptr()),
                LOGON32_LOGON(options.logon_type as u32),
                LOGON32_PROVIDER(options.logon_provider as u32),
                &mut handle,
            )
        };
        if !success.as_bool() {
            return Err(LogonError::from_win32(TokenOperation::Logon, last_error()));
        }

        Ok(Self::from_raw(handle))
    }

    /// The token the calling thread is impersonating, or `None` if it is not impersonating.
    pub fn open_thread_token(
        desired_access: TOKEN_ACCESS_MASK,
        open_as_self: bool,
    ) -> Result<Option<Self>> {
        let mut thread_token = HANDLE::default();
        let success = unsafe {
            OpenThreadToken(
                GetCurrentThread(),
                desired_access,
                open_as_self,
                &mut thread_token,
            )
        };
        if !success.as_bool() {
            if unsafe { GetLastError() } == ERROR_NO_TOKEN {
                return Ok(None);
            }
            return Err(Error::from_win32());
        }
        Ok(Some(Self::from_raw(thread_token)))
    }

    /// Makes the calling thread impersonate this token.
    pub fn impersonate(&self) -> Result<()> {
        unsafe { SetThreadToken(None, self.handle).ok() }
    }

    fn query<T: Default>(&self, class: TOKEN_INFORMATION_CLASS) -> Result<T> {
        let mut value = T::default();
        let mut returned = 0u32;
        unsafe {
            GetTokenInformation(
                self.handle,
                class,
                Some(&mut value as *mut T as *mut c_void),
                size_of::<T>() as u32,
                &mut returned,
            )
            .ok()?;
        }
        Ok(value)
    }
}

impl AccessToken for Token {
    fn impersonation_level(&self) -> Option<ImpersonationLevel> {
        let token_type: TOKEN_TYPE = self.query(TokenType).ok()?;
        if token_type != TokenImpersonation {
            return None;
        }
        let level: SECURITY_IMPERSONATION_LEVEL = self.query(TokenImpersonationLevel).ok()?;
        num_traits::FromPrimitive::from_i32(level.0)
    }

    fn duplicate(&self, level: ImpersonationLevel) -> std::result::Result<Self, LogonError> {
        let mut handle = HANDLE::default();
        let success = unsafe {
            DuplicateToken(
                self.handle,
                SECURITY_IMPERSONATION_LEVEL(level as i32),
                &mut handle,
            )
        };
        if !success.as_bool() {
            return Err(LogonError::new(
                TokenOperation::Duplicate,
                LogonErrorKind::PlatformError,
                last_error(),
            ));
        }
        Ok(Self::from_raw(handle))
    }

    fn close(mut self) -> std::result::Result<(), LogonError> {
        let handle = std::mem::take(&mut self.handle);
        let success = unsafe { CloseHandle(handle) };
        if !success.as_bool() {
            return Err(LogonError::from_win32(TokenOperation::Close, last_error()));
        }
        Ok(())
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        if self.handle.0 != 0 && !unsafe { CloseHandle(self.handle) }.as_bool() {
            warn!("CloseHandle failed with {}", last_error());
        }
    }
}

fn last_error() -> u32 {
    unsafe { GetLastError() }.0
}
