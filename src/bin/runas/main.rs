use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use zeroize::Zeroizing;

use impersonating_writer::{
    config::{HardCodedConfig, RuntimeConfig},
    identity::{ImpersonationLevel, LogonProvider, LogonType},
    logger::Logger,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Runs operations as another Windows user")]
struct Args {
    /// Start from the settings stored in the registry
    #[arg(long)]
    config: bool,

    /// The user to log on
    #[arg(short, long)]
    user: Option<String>,

    /// The user's domain ("." for the local machine)
    #[arg(short, long)]
    domain: Option<String>,

    /// The user's password
    #[arg(short, long, env = HardCodedConfig::PASSWORD_VARIABLE, hide_env_values = true)]
    password: Option<String>,

    #[arg(long)]
    logon_type: Option<LogonType>,

    #[arg(long)]
    logon_provider: Option<LogonProvider>,

    /// Impersonation level of the logged-on token
    #[arg(long)]
    level: Option<ImpersonationLevel>,

    /// Don't log anyone on; run as the process identity
    #[arg(long)]
    revert_to_self: bool,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints the effective user before, during and after impersonation
    Whoami,
    /// Appends lines to a file as the impersonated user
    Write { file: PathBuf, lines: Vec<String> },
    /// Stores the effective settings in the registry
    SaveConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();
    Logger::install(args.log_level)?;

    let config = effective_config(&args)?;
    log::debug!("{:?}", config);

    run(args.command, config)
}

fn effective_config(args: &Args) -> Result<RuntimeConfig> {
    let mut config = if args.config {
        read_config()?
    } else {
        RuntimeConfig::default()
    };

    if let Some(user) = &args.user {
        config.user_name = user.clone();
    }
    if let Some(domain) = &args.domain {
        config.domain = domain.clone();
    }
    if let Some(password) = &args.password {
        config.password = Zeroizing::new(password.clone());
    }
    if let Some(logon_type) = args.logon_type {
        config.logon_type = logon_type;
    }
    if let Some(logon_provider) = args.logon_provider {
        config.logon_provider = logon_provider;
    }
    if let Some(level) = args.level {
        config.impersonation_level = level;
    }
    config.revert_to_self |= args.revert_to_self;

    Ok(config)
}

#[cfg(windows)]
fn read_config() -> Result<RuntimeConfig> {
    RuntimeConfig::read()
}

#[cfg(windows)]
fn run(command: Command, config: RuntimeConfig) -> Result<()> {
    use impersonating_writer::{
        file_writer::FileWriter,
        identity::{Credentials, IdentityResolver, ImpersonatingWriter, ImpersonationRunner},
        thread_context::{current_user_name, Win32Context},
    };

    match command {
        Command::Whoami => {
            let mut resolver =
                IdentityResolver::new(Win32Context, config.options(), config.revert_to_self);
            let runner = ImpersonationRunner::new(Win32Context, config.impersonation_level);

            println!("before: {}", current_user_name()?);
            let identity = resolver.resolve(
                &Credentials::new(&config.user_name, &config.domain, &config.password),
                true,
            )?;
            let during = runner.run(
                identity,
                |_: ()| current_user_name().map_err(anyhow::Error::from),
                (),
            )?;
            println!("during: {}", during);
            println!("after:  {}", current_user_name()?);

            resolver.close();
        }
        Command::Write { file, lines } => {
            let mut writer = ImpersonatingWriter::new(
                Win32Context,
                config.layout(),
                FileWriter::new(file),
                config.options(),
                config.revert_to_self,
            );
            writer.initialize()?;
            let result = writer.write_batch(&lines).and_then(|()| writer.flush());
            writer.close()?;
            result?;
        }
        Command::SaveConfig => {
            config.write()?;
        }
    }

    Ok(())
}

#[cfg(not(windows))]
fn read_config() -> Result<RuntimeConfig> {
    anyhow::bail!("The registry is only available on Windows")
}

#[cfg(not(windows))]
fn run(_command: Command, _config: RuntimeConfig) -> Result<()> {
    anyhow::bail!("Impersonation is only supported on Windows")
}
