use log::{LevelFilter, SetLoggerError};

pub static LOGGER: Logger = Logger;

/// Sends records to the debugger (`OutputDebugStringW`), or to stderr off Windows.
pub struct Logger;

impl Logger {
    pub fn install(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }

    fn format(record: &log::Record) -> String {
        format!(
            "[{}] - [{}] - [{}] - [{}] - {}\n",
            record.target(),
            record.file().unwrap_or("<unknown>"),
            record.line().unwrap_or(0),
            record.level(),
            record.args()
        )
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    #[cfg(windows)]
    fn log(&self, record: &log::Record) {
        use widestring::U16CString;
        use windows::{core::PCWSTR, Win32::System::Diagnostics::Debug::OutputDebugStringW};

        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(wide_string) = U16CString::from_str(Self::format(record)) {
            unsafe {
                OutputDebugStringW(PCWSTR(wide_string.as_ptr()));
            }
        }
    }

    #[cfg(not(windows))]
    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprint!("{}", Self::format(record));
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use log::{Level, Log, Record};
    use serial_test::serial;

    use super::*;

    #[test]
    fn format_matches_debug_output_layout() {
        let formatted = Logger::format(
            &Record::builder()
                .args(format_args!("Cached identity #{}", 3))
                .level(Level::Debug)
                .target("identity::resolver")
                .file(Some("resolver.rs"))
                .line(Some(42))
                .build(),
        );

        assert_eq!(
            formatted,
            "[identity::resolver] - [resolver.rs] - [42] - [DEBUG] - Cached identity #3\n"
        );
    }

    #[test]
    #[serial]
    fn install_honours_level_and_only_once() {
        let first = Logger::install(LevelFilter::Info);
        assert!(Logger::install(LevelFilter::Trace).is_err());
        if first.is_ok() {
            assert_eq!(log::max_level(), LevelFilter::Info);
            assert!(!LOGGER.enabled(&log::Metadata::builder().level(Level::Debug).build()));
            assert!(LOGGER.enabled(&log::Metadata::builder().level(Level::Warn).build()));
        }
    }
}
