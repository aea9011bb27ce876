mod logging;
mod ui;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use pwmaker::settings::{
    validate_algorithm, validate_character_set, validate_length, DEFAULT_PROFILE,
};
use pwmaker::{available_algorithms, Settings, SettingsStore};
use std::path::PathBuf;
use tracing::{debug, info};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(
    name = "pwmaker",
    version,
    about = "Deterministic per-site password generator compatible with PasswordMaker"
)]
struct Cli {
    /// Hash algorithm [hmac-] md4/md5/sha1/sha256/rmd160 (default md5)
    #[arg(short = 'a', long = "alg")]
    algorithm: Option<String>,

    /// Master password (default: ask)
    #[arg(short = 'm', long = "mpw")]
    master_password: Option<String>,

    /// URL (default blank)
    #[arg(short = 'r', long)]
    url: Option<String>,

    /// Username (default blank)
    #[arg(short = 'u', long = "user")]
    username: Option<String>,

    /// Password modifier (default blank)
    #[arg(short = 'd', long)]
    modifier: Option<String>,

    /// Password length (default 8)
    #[arg(short = 'g', long)]
    length: Option<u64>,

    /// Characters to use in password (default: 94 printable ASCII characters)
    #[arg(short = 'c', long)]
    charset: Option<String>,

    /// Password prefix (default blank)
    #[arg(short = 'p', long)]
    prefix: Option<String>,

    /// Password suffix (default blank)
    #[arg(short = 's', long)]
    suffix: Option<String>,

    /// Settings profile supplying defaults for the options above
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Directory holding pwm.<profile>.setting files
    #[arg(long, default_value = ".")]
    settings_dir: PathBuf,

    /// Save the effective settings (never the master password) to the profile and exit
    #[arg(long)]
    save: bool,

    /// List the algorithms available in this build
    #[arg(long)]
    list_algorithms: bool,

    /// List saved profiles
    #[arg(long)]
    list_profiles: bool,

    /// Print only the password
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn load_profile(store: &SettingsStore, cli: &Cli) -> Result<Settings> {
    if store.contains(&cli.profile)? {
        return store
            .load(&cli.profile)
            .with_context(|| format!("Failed to load profile '{}'", cli.profile));
    }

    if cli.profile != DEFAULT_PROFILE && !cli.save {
        anyhow::bail!(
            "Profile '{}' not found in {}",
            cli.profile,
            store.dir().display()
        );
    }

    debug!(profile = %cli.profile, "profile not found, using defaults");
    Ok(Settings::default())
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) -> Result<()> {
    if let Some(algorithm) = &cli.algorithm {
        settings.algorithm = validate_algorithm(algorithm)?;
    }
    if let Some(url) = &cli.url {
        settings.url = url.clone();
    }
    if let Some(username) = &cli.username {
        settings.username = username.clone();
    }
    if let Some(modifier) = &cli.modifier {
        settings.modifier = modifier.clone();
    }
    if let Some(length) = cli.length {
        settings.length = validate_length(length)?;
    }
    if let Some(charset) = &cli.charset {
        validate_character_set(charset)?;
        settings.character_set = charset.clone();
    }
    if let Some(prefix) = &cli.prefix {
        settings.prefix = prefix.clone();
    }
    if let Some(suffix) = &cli.suffix {
        settings.suffix = suffix.clone();
    }
    Ok(())
}

// Listings never read a profile, so a missing or broken one cannot block them.
fn handle_listing(store: &SettingsStore, cli: &Cli) -> Result<bool> {
    if cli.list_algorithms {
        ui::display_algorithms(available_algorithms());
        return Ok(true);
    }

    if cli.list_profiles {
        let names = store.list().context("Failed to list profiles")?;
        ui::display_profiles(&names, &cli.profile);
        return Ok(true);
    }

    Ok(false)
}

// An empty --mpw means "ask", as it is the flag's default.
fn master_from_flag(flag: Option<&str>) -> Option<Zeroizing<String>> {
    flag.filter(|password| !password.is_empty())
        .map(|password| Zeroizing::new(password.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_tracing(cli.verbose);

    let store = SettingsStore::new(&cli.settings_dir);

    if handle_listing(&store, &cli)? {
        return Ok(());
    }

    let mut settings = load_profile(&store, &cli)?;
    apply_overrides(&mut settings, &cli)?;

    if cli.save {
        store
            .save(&cli.profile, &settings)
            .with_context(|| format!("Failed to save profile '{}'", cli.profile))?;
        info!(profile = %cli.profile, "profile saved");
        if !cli.quiet {
            println!("Saved profile '{}'", cli.profile);
        }
        return Ok(());
    }

    settings.master_pass = match master_from_flag(cli.master_password.as_deref()) {
        Some(password) => {
            ui::check_master_secret(&password)?;
            password
        }
        None => ui::prompt_master_secret()?,
    };

    let password = settings
        .generate()
        .context("Failed to generate password")?;

    let options = ui::DisplayOptions {
        unicode_support: ui::detect_unicode_support(),
        color_support: ui::detect_color_support(),
        quiet: cli.quiet,
    };
    let info = ui::InputInfo::from_settings(&settings);

    ui::display_output(&password, &settings, &info, &options);

    Ok(())
}
