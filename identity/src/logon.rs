use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use num_derive::{FromPrimitive, ToPrimitive};

/// How the OS should log the principal on. Values are the Win32 `LOGON32_LOGON_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum LogonType {
    Interactive = 2,
    Network = 3,
    Batch = 4,
    Service = 5,
    Unlock = 7,
    NetworkCleartext = 8,
    NewCredentials = 9,
}

/// Win32 `LOGON32_PROVIDER_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum LogonProvider {
    Default = 0,
    WinNT35 = 1,
    WinNT40 = 2,
    WinNT50 = 3,
}

/// Ordered by how far the token's authority reaches. Values match `SECURITY_IMPERSONATION_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
pub enum ImpersonationLevel {
    Anonymous = 0,
    Identification = 1,
    Impersonation = 2,
    Delegation = 3,
}

impl Default for LogonType {
    fn default() -> Self {
        Self::Interactive
    }
}

impl Default for LogonProvider {
    fn default() -> Self {
        Self::Default
    }
}

impl Default for ImpersonationLevel {
    fn default() -> Self {
        Self::Impersonation
    }
}

macro_rules! name_table {
    ($type:ident { $($variant:ident => $name:literal),* $(,)? }) => {
        impl $type {
            pub const VARIANTS: &'static [&'static str] = &[$($name),*];

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }
        }

        impl Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $type {
            type Err = anyhow::Error;

            fn from_str(string: &str) -> Result<Self> {
                $(
                    if string.eq_ignore_ascii_case($name) {
                        return Ok(Self::$variant);
                    }
                )*
                Err(anyhow!(
                    "Unknown {} {:?}, expected one of {:?}",
                    stringify!($type),
                    string,
                    Self::VARIANTS
                ))
            }
        }
    };
}

name_table!(LogonType {
    Interactive => "Interactive",
    Network => "Network",
    Batch => "Batch",
    Service => "Service",
    Unlock => "Unlock",
    NetworkCleartext => "NetworkCleartext",
    NewCredentials => "NewCredentials",
});

name_table!(LogonProvider {
    Default => "Default",
    WinNT35 => "WinNT35",
    WinNT40 => "WinNT40",
    WinNT50 => "WinNT50",
});

name_table!(ImpersonationLevel {
    Anonymous => "Anonymous",
    Identification => "Identification",
    Impersonation => "Impersonation",
    Delegation => "Delegation",
});

/// Logon policy that accompanies every credential tuple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogonOptions {
    pub logon_type: LogonType,
    pub logon_provider: LogonProvider,
    pub impersonation_level: ImpersonationLevel,
}

/// A borrowed, already rendered credential tuple.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub domain: &'a str,
    pub password: &'a str,
}

impl<'a> Credentials<'a> {
    pub fn new(username: &'a str, domain: &'a str, password: &'a str) -> Self {
        Self {
            username,
            domain,
            password,
        }
    }

    /// Enough to attempt a logon without being forced to.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use num_traits::{FromPrimitive, ToPrimitive};

    use super::*;

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(
            "networkcleartext".parse::<LogonType>().unwrap(),
            LogonType::NetworkCleartext
        );
        assert_eq!(
            "WINNT50".parse::<LogonProvider>().unwrap(),
            LogonProvider::WinNT50
        );
        assert_eq!(
            "delegation".parse::<ImpersonationLevel>().unwrap(),
            ImpersonationLevel::Delegation
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let error = "Remote".parse::<LogonType>().unwrap_err();
        assert!(error.to_string().contains("Remote"));
    }

    #[test]
    fn numeric_values_match_win32() {
        assert_eq!(LogonType::from_u32(6), None);
        assert_eq!(LogonType::from_u32(9), Some(LogonType::NewCredentials));
        assert_eq!(LogonType::Unlock.to_u32(), Some(7));
        assert_eq!(LogonProvider::from_u32(2), Some(LogonProvider::WinNT40));
        assert_eq!(
            ImpersonationLevel::from_i32(1),
            Some(ImpersonationLevel::Identification)
        );
    }

    #[test]
    fn levels_are_ordered_by_reach() {
        assert!(ImpersonationLevel::Identification < ImpersonationLevel::Impersonation);
        assert!(ImpersonationLevel::Impersonation < ImpersonationLevel::Delegation);
    }

    #[test]
    fn defaults() {
        let options = LogonOptions::default();
        assert_eq!(options.logon_type, LogonType::Interactive);
        assert_eq!(options.logon_provider, LogonProvider::Default);
        assert_eq!(options.impersonation_level, ImpersonationLevel::Impersonation);
    }

    #[test]
    fn debug_hides_password() {
        let credentials = Credentials::new("svc_user", "CORP", "p@ss1");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("svc_user"));
        assert!(!debug.contains("p@ss1"));
    }

    #[test]
    fn completeness_needs_user_and_password() {
        assert!(Credentials::new("u", "", "p").is_complete());
        assert!(!Credentials::new("u", "D", "").is_complete());
        assert!(!Credentials::new("", "D", "p").is_complete());
    }
}
