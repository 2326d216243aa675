use std::io;

use identity::{
    ContextSwitchError, Credentials, ImpersonationLevel, LogonError, LogonOptions, SecurityContext,
};
use windows::{
    core::{Error, PWSTR},
    Win32::{
        Security::{
            ImpersonateSelf, RevertToSelf, SECURITY_IMPERSONATION_LEVEL, TOKEN_IMPERSONATE,
            TOKEN_QUERY,
        },
        System::WindowsProgramming::GetUserNameW,
    },
};

use crate::token::Token;

/// The calling thread's security context, switched with `SetThreadToken`/`ImpersonateSelf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Context;

/// The thread token in effect before an impersonation was entered.
#[derive(Debug)]
pub struct SavedThreadToken(Option<Token>);

impl SecurityContext for Win32Context {
    type Token = Token;
    type Saved = SavedThreadToken;

    fn logon(
        &self,
        credentials: &Credentials<'_>,
        options: &LogonOptions,
    ) -> Result<Token, LogonError> {
        Token::logon(credentials, options)
    }

    fn capture(&self) -> Result<SavedThreadToken, ContextSwitchError> {
        Token::open_thread_token(TOKEN_IMPERSONATE | TOKEN_QUERY, true)
            .map(SavedThreadToken)
            .map_err(|error| ContextSwitchError::Capture {
                code: win32_code(&error),
            })
    }

    fn impersonate(&self, token: &Token) -> Result<(), ContextSwitchError> {
        token
            .impersonate()
            .map_err(|error| ContextSwitchError::Enter {
                code: win32_code(&error),
            })
    }

    fn impersonate_self(&self, level: ImpersonationLevel) -> Result<(), ContextSwitchError> {
        unsafe { ImpersonateSelf(SECURITY_IMPERSONATION_LEVEL(level as i32)) }
            .ok()
            .map_err(|error| ContextSwitchError::Enter {
                code: win32_code(&error),
            })
    }

    fn restore(&self, saved: SavedThreadToken) -> Result<(), ContextSwitchError> {
        let result = match &saved.0 {
            Some(previous) => previous.impersonate(),
            None => unsafe { RevertToSelf() }.ok(),
        };
        result.map_err(|error| ContextSwitchError::Revert {
            code: win32_code(&error),
        })
    }
}

/// Name of the user the calling thread runs as, impersonation included.
pub fn current_user_name() -> io::Result<String> {
    // UNLEN + 1
    let mut buffer = [0u16; 257];
    let mut length = buffer.len() as u32;
    unsafe {
        if !GetUserNameW(PWSTR(buffer.as_mut_ptr()), &mut length).as_bool() {
            return Err(io::Error::last_os_error());
        }
    }
    let length = (length as usize).saturating_sub(1);
    Ok(String::from_utf16_lossy(&buffer[..length]))
}

fn win32_code(error: &Error) -> u32 {
    (error.code().0 & 0xFFFF) as u32
}
