use identity::{
    ImpersonationLevel, LogonOptions, LogonProvider, LogonType, RenderedCredentials,
    StaticCredentials,
};
use zeroize::Zeroizing;

#[derive(Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub user_name: String,
    pub domain: String,
    pub password: Zeroizing<String>,
    pub logon_type: LogonType,
    pub logon_provider: LogonProvider,
    pub impersonation_level: ImpersonationLevel,
    pub revert_to_self: bool,
}

impl RuntimeConfig {
    pub fn options(&self) -> LogonOptions {
        LogonOptions {
            logon_type: self.logon_type,
            logon_provider: self.logon_provider,
            impersonation_level: self.impersonation_level,
        }
    }

    pub fn layout(&self) -> StaticCredentials {
        StaticCredentials(RenderedCredentials::new(
            self.user_name.as_str(),
            self.domain.as_str(),
            self.password.as_str(),
        ))
    }
}

#[cfg(windows)]
impl RuntimeConfig {
    pub fn read() -> anyhow::Result<Self> {
        Self::read_from(&Self::root_key(), &Self::registry_path())
    }

    pub fn write(&self) -> anyhow::Result<()> {
        self.write_to(&Self::root_key(), &Self::registry_path())
    }

    /// Missing values keep their defaults.
    pub fn read_from(root: &winreg::RegKey, path: &str) -> anyhow::Result<Self> {
        use anyhow::anyhow;
        use num_traits::FromPrimitive;

        let key = root.open_subkey(path)?;
        let defaults = Self::default();

        let user_name: Option<String> = key.get_value("user_name").ok();
        let domain: Option<String> = key.get_value("domain").ok();
        let password: Option<String> = key.get_value("password").ok();
        let logon_type: Option<u32> = key.get_value("logon_type").ok();
        let logon_provider: Option<u32> = key.get_value("logon_provider").ok();
        let impersonation_level: Option<u32> = key.get_value("impersonation_level").ok();
        let revert_to_self: Option<u32> = key.get_value("revert_to_self").ok();

        Ok(Self {
            user_name: user_name.unwrap_or(defaults.user_name),
            domain: domain.unwrap_or(defaults.domain),
            password: password.map(Zeroizing::new).unwrap_or(defaults.password),
            logon_type: logon_type
                .map(|value| {
                    LogonType::from_u32(value).ok_or_else(|| anyhow!("Bad logon_type {}", value))
                })
                .transpose()?
                .unwrap_or(defaults.logon_type),
            logon_provider: logon_provider
                .map(|value| {
                    LogonProvider::from_u32(value)
                        .ok_or_else(|| anyhow!("Bad logon_provider {}", value))
                })
                .transpose()?
                .unwrap_or(defaults.logon_provider),
            impersonation_level: impersonation_level
                .map(|value| {
                    ImpersonationLevel::from_u32(value)
                        .ok_or_else(|| anyhow!("Bad impersonation_level {}", value))
                })
                .transpose()?
                .unwrap_or(defaults.impersonation_level),
            revert_to_self: revert_to_self
                .map(|value| value != 0)
                .unwrap_or(defaults.revert_to_self),
        })
    }

    pub fn write_to(&self, root: &winreg::RegKey, path: &str) -> anyhow::Result<()> {
        let (key, _) = root.create_subkey(path)?;

        key.set_value("user_name", &self.user_name)?;
        key.set_value("domain", &self.domain)?;

        if self.password.is_empty() {
            if let Err(error) = key.delete_value("password") {
                if error.kind() != std::io::ErrorKind::NotFound {
                    return Err(error.into());
                }
            }
        } else {
            key.set_value("password", &*self.password)?;
        }

        key.set_value("logon_type", &(self.logon_type as u32))?;
        key.set_value("logon_provider", &(self.logon_provider as u32))?;
        key.set_value("impersonation_level", &(self.impersonation_level as u32))?;
        key.set_value(
            "revert_to_self",
            if self.revert_to_self { &1u32 } else { &0u32 },
        )?;

        Ok(())
    }

    fn root_key() -> winreg::RegKey {
        winreg::RegKey::predef(winreg::enums::HKEY_CURRENT_USER)
    }

    fn registry_path() -> String {
        format!(r"Software\{}\Parameters", HardCodedConfig::PRODUCT_NAME)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let options = LogonOptions::default();
        Self {
            user_name: String::new(),
            domain: String::from("."),
            password: Zeroizing::new(String::new()),
            logon_type: options.logon_type,
            logon_provider: options.logon_provider,
            impersonation_level: options.impersonation_level,
            revert_to_self: false,
        }
    }
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("user_name", &self.user_name)
            .field("domain", &self.domain)
            .field("password", &"<redacted>")
            .field("logon_type", &self.logon_type)
            .field("logon_provider", &self.logon_provider)
            .field("impersonation_level", &self.impersonation_level)
            .field("revert_to_self", &self.revert_to_self)
            .finish()
    }
}

pub struct HardCodedConfig;

impl HardCodedConfig {
    pub const PRODUCT_NAME: &'static str = "impersonating_writer";

    pub const PASSWORD_VARIABLE: &'static str = "RUNAS_PASSWORD";
}

#[cfg(test)]
mod tests {
    use identity::CredentialLayout;

    use super::*;

    #[test]
    fn debug_hides_password() {
        let config = RuntimeConfig {
            password: Zeroizing::new("p@ss1".into()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("p@ss1"));
    }

    #[test]
    fn layout_renders_configured_credentials() {
        let config = RuntimeConfig {
            user_name: "svc_user".into(),
            domain: "CORP".into(),
            password: Zeroizing::new("p@ss1".into()),
            ..Default::default()
        };

        let rendered = CredentialLayout::<String>::render(&config.layout(), None);
        let credentials = rendered.as_credentials();
        assert_eq!(credentials.username, "svc_user");
        assert_eq!(credentials.domain, "CORP");
        assert_eq!(credentials.password, "p@ss1");
    }

    #[cfg(windows)]
    mod registry {
        use serial_test::serial;
        use winreg::{enums::HKEY_CURRENT_USER, RegKey};

        use super::super::*;

        const TEST_PATH: &str = r"Software\impersonating_writer\Tests";

        fn cleanup() {
            let _ = RegKey::predef(HKEY_CURRENT_USER).delete_subkey_all(TEST_PATH);
        }

        #[test]
        #[serial]
        fn round_trips_through_registry() {
            cleanup();
            let root = RegKey::predef(HKEY_CURRENT_USER);
            let config = RuntimeConfig {
                user_name: "svc_user".into(),
                domain: "CORP".into(),
                password: Zeroizing::new("p@ss1".into()),
                logon_type: LogonType::Batch,
                logon_provider: LogonProvider::WinNT50,
                impersonation_level: ImpersonationLevel::Delegation,
                revert_to_self: true,
            };

            config.write_to(&root, TEST_PATH).unwrap();
            let read = RuntimeConfig::read_from(&root, TEST_PATH).unwrap();
            cleanup();

            assert_eq!(read, config);
        }

        #[test]
        #[serial]
        fn missing_values_fall_back_to_defaults() {
            cleanup();
            let root = RegKey::predef(HKEY_CURRENT_USER);
            let (key, _) = root.create_subkey(TEST_PATH).unwrap();
            key.set_value("user_name", &"svc_user").unwrap();

            let read = RuntimeConfig::read_from(&root, TEST_PATH).unwrap();
            cleanup();

            assert_eq!(read.user_name, "svc_user");
            assert_eq!(read.domain, ".");
            assert_eq!(read.logon_type, LogonType::Interactive);
            assert!(!read.revert_to_self);
        }

        #[test]
        #[serial]
        fn out_of_range_enum_is_rejected() {
            cleanup();
            let root = RegKey::predef(HKEY_CURRENT_USER);
            let (key, _) = root.create_subkey(TEST_PATH).unwrap();
            key.set_value("logon_type", &6u32).unwrap();

            let result = RuntimeConfig::read_from(&root, TEST_PATH);
            cleanup();

            assert!(result.is_err());
        }

        #[test]
        #[serial]
        fn empty_password_removes_stored_value() {
            cleanup();
            let root = RegKey::predef(HKEY_CURRENT_USER);
            let mut config = RuntimeConfig {
                password: Zeroizing::new("p@ss1".into()),
                ..Default::default()
            };
            config.write_to(&root, TEST_PATH).unwrap();
            config.password = Zeroizing::new(String::new());
            config.write_to(&root, TEST_PATH).unwrap();

            let read = RuntimeConfig::read_from(&root, TEST_PATH).unwrap();
            cleanup();

            assert!(read.password.is_empty());
        }
    }
}
