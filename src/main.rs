use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Arg, Command};
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use autorandr::backends::disper::Disper;
use autorandr::backends::xrandr::Xrandr;
use autorandr::lock::RunLock;
use autorandr::profile::VirtualProfile;
use autorandr::settings::{Identity, Settings};
use autorandr::{Autorandr, Error, ProfileState};

fn cli<'a>(name: &'a str, after_help: &'a str) -> Command<'a> {
    Command::new(name)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Detects connected displays and loads the matching saved layout")
        .after_help(after_help)
        .arg(
            Arg::new("change")
                .short('c')
                .long("change")
                .help("Load the detected profile if it differs from the current configuration"),
        )
        .arg(
            Arg::new("save")
                .short('s')
                .long("save")
                .takes_value(true)
                .value_name("PROFILE")
                .help("Save the current setup to PROFILE"),
        )
        .arg(
            Arg::new("load")
                .short('l')
                .long("load")
                .takes_value(true)
                .value_name("PROFILE")
                .help("Load PROFILE, whatever is connected"),
        )
        .arg(
            Arg::new("default")
                .short('d')
                .long("default")
                .takes_value(true)
                .value_name("PROFILE")
                .help("Load PROFILE if no other profile is detected"),
        )
        .arg(
            Arg::new("force")
                .long("force")
                .help("Reload the detected profile even if it is already active"),
        )
        .arg(
            Arg::new("fingerprint")
                .long("fingerprint")
                .help("Print the fingerprint of the connected displays"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Print the current configuration"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Log debug output, same as LOG_LEVEL=debug"),
        )
}

fn virtual_profiles_help() -> String {
    let mut help = String::from("Virtual profiles:\n");
    for profile in VirtualProfile::ALL {
        help.push_str(&format!("  {:<12}{}\n", profile.name(), profile.description()));
    }
    help
}

fn init_logging(debug: bool) -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        _ if debug => TraceLevel::DEBUG,
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    // stdout is reserved for --fingerprint, --config and the profile list.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run() -> Result<ExitCode> {
    let argv0 = std::env::args().next().unwrap_or_default();
    let identity = Identity::from_program_name(&argv0);
    let program = match identity {
        Identity::Autorandr => "autorandr",
        Identity::AutoDisper => "auto-disper",
    };

    let after_help = virtual_profiles_help();
    let matches = match cli(program, &after_help).try_get_matches() {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            e.print()?;
            return Ok(ExitCode::FAILURE);
        }
    };
    init_logging(matches.is_present("debug"))?;

    let home = dirs::home_dir().context("unable to determine home directory")?;
    let settings_file = identity.settings_file(&home);
    let mut settings = Settings::defaults(identity, &home)
        .load(&settings_file)
        .with_context(|| format!("failed to read {}", settings_file.display()))?;
    if let Some(default) = matches.value_of("default") {
        settings.default_profile = Some(default.to_owned());
    }

    let mut app = Autorandr::new(
        &settings,
        Box::new(Xrandr::new(&settings.xrandr)),
        Box::new(Disper::new(&settings.disper)),
    );

    if matches.is_present("fingerprint") {
        match app.fingerprint() {
            Ok(fingerprint) => print!("{}", fingerprint),
            Err(Error::FingerprintUnavailable) => warn!("{}", Error::FingerprintUnavailable),
            Err(e) => return Err(e).context("failed to fingerprint displays"),
        }
        return Ok(ExitCode::SUCCESS);
    }
    if matches.is_present("config") {
        print!("{}", app.current_config().context("failed to read current configuration")?);
        return Ok(ExitCode::SUCCESS);
    }

    let _lock = match RunLock::try_acquire(&settings.profiles)? {
        Some(lock) => lock,
        None => {
            info!("another run holds the lock, skipping");
            return Ok(ExitCode::SUCCESS);
        }
    };

    if let Some(name) = matches.value_of("save") {
        return Ok(match app.save(name) {
            Ok(()) => {
                println!("Saved current configuration as profile '{}'", name);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        });
    }

    if let Some(name) = matches.value_of("load") {
        return Ok(match app.load(name) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        });
    }

    let detection = app.detect(
        matches.is_present("change"),
        matches.is_present("force"),
        settings.default_profile.as_deref(),
    )?;
    for (name, state) in &detection.profiles {
        match state {
            ProfileState::Listed => println!("{}", name),
            ProfileState::Blocked => println!("{} (blocked)", name),
            ProfileState::Detected => println!("{} (detected)", name),
        }
    }
    Ok(if detection.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("autorandr: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
