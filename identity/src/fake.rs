//! In-memory `SecurityContext` that records every call, for tests.

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{ContextSwitchError, LogonError, LogonErrorKind, TokenOperation},
    logon::{Credentials, ImpersonationLevel, LogonOptions},
    platform::{AccessToken, SecurityContext},
};

pub const PROCESS: &str = "process";

#[derive(Debug, Default)]
pub struct FakeState {
    pub logons: usize,
    pub duplicates: usize,
    pub closes: usize,
    pub enters: usize,
    pub restores: usize,
    pub released_saves: usize,
    /// Principal the "thread" is currently running as; `None` means not impersonating.
    pub ambient: Option<String>,
    pub fail_logon: Option<u32>,
    pub fail_duplicate: Option<u32>,
    pub fail_enter: Option<u32>,
    pub fail_restore: Option<u32>,
    pub fail_close: Option<u32>,
    /// When set, logon hands out tokens that already carry this level.
    pub logon_level: Option<ImpersonationLevel>,
    pub live_tokens: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeContext {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> std::cell::Ref<'_, FakeState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> std::cell::RefMut<'_, FakeState> {
        self.state.borrow_mut()
    }

    pub fn ambient(&self) -> Option<String> {
        self.state().ambient.clone()
    }
}

#[derive(Debug)]
pub struct FakeToken {
    pub principal: String,
    pub level: Option<ImpersonationLevel>,
    state: Rc<RefCell<FakeState>>,
}

impl AccessToken for FakeToken {
    fn impersonation_level(&self) -> Option<ImpersonationLevel> {
        self.level
    }

    fn duplicate(&self, level: ImpersonationLevel) -> Result<Self, LogonError> {
        let mut state = self.state.borrow_mut();
        state.duplicates += 1;
        if let Some(code) = state.fail_duplicate {
            return Err(LogonError::new(
                TokenOperation::Duplicate,
                LogonErrorKind::PlatformError,
                code,
            ));
        }
        state.live_tokens += 1;
        Ok(Self {
            principal: self.principal.clone(),
            level: Some(level),
            state: self.state.clone(),
        })
    }

    fn close(self) -> Result<(), LogonError> {
        let mut state = self.state.borrow_mut();
        state.closes += 1;
        state.live_tokens -= 1;
        match state.fail_close {
            Some(code) => Err(LogonError::from_win32(TokenOperation::Close, code)),
            None => Ok(()),
        }
    }
}

pub struct FakeSaved {
    previous: Option<String>,
    state: Rc<RefCell<FakeState>>,
}

impl Drop for FakeSaved {
    fn drop(&mut self) {
        self.state.borrow_mut().released_saves += 1;
    }
}

impl SecurityContext for FakeContext {
    type Token = FakeToken;
    type Saved = FakeSaved;

    fn logon(
        &self,
        credentials: &Credentials<'_>,
        _options: &LogonOptions,
    ) -> Result<Self::Token, LogonError> {
        let mut state = self.state_mut();
        state.logons += 1;
        if let Some(code) = state.fail_logon {
            return Err(LogonError::from_win32(TokenOperation::Logon, code));
        }
        state.live_tokens += 1;
        Ok(FakeToken {
            principal: format!("{}\\{}", credentials.domain, credentials.username),
            level: state.logon_level,
            state: self.state.clone(),
        })
    }

    fn capture(&self) -> Result<Self::Saved, ContextSwitchError> {
        Ok(FakeSaved {
            previous: self.ambient(),
            state: self.state.clone(),
        })
    }

    fn impersonate(&self, token: &Self::Token) -> Result<(), ContextSwitchError> {
        let mut state = self.state_mut();
        if let Some(code) = state.fail_enter {
            return Err(ContextSwitchError::Enter { code });
        }
        state.enters += 1;
        state.ambient = Some(token.principal.clone());
        Ok(())
    }

    fn impersonate_self(&self, _level: ImpersonationLevel) -> Result<(), ContextSwitchError> {
        let mut state = self.state_mut();
        if let Some(code) = state.fail_enter {
            return Err(ContextSwitchError::Enter { code });
        }
        state.enters += 1;
        state.ambient = Some(PROCESS.to_string());
        Ok(())
    }

    fn restore(&self, mut saved: Self::Saved) -> Result<(), ContextSwitchError> {
        let mut state = self.state_mut();
        if let Some(code) = state.fail_restore {
            return Err(ContextSwitchError::Revert { code });
        }
        state.restores += 1;
        state.ambient = saved.previous.take();
        Ok(())
    }
}
