use anyhow::{Context, Result};
use console::{Style, Term};
use pwmaker::{Algorithm, Settings};
use rpassword::prompt_password;
use std::io;
use zeroize::Zeroizing;

pub const MAX_MASTER_BYTES: usize = 1024 * 1024;

pub struct InputInfo {
    pub master_byte_length: usize,
    pub master_char_count: usize,
    pub context_byte_length: usize,
    pub context_char_count: usize,
}

impl InputInfo {
    pub fn from_settings(settings: &Settings) -> Self {
        let context = settings.context();
        Self {
            master_byte_length: settings.master_pass.len(),
            master_char_count: settings.master_pass.chars().count(),
            context_byte_length: context.len(),
            context_char_count: context.chars().count(),
        }
    }
}

pub struct DisplayOptions {
    pub unicode_support: bool,
    pub color_support: bool,
    pub quiet: bool,
}

pub fn detect_unicode_support() -> bool {
    supports_unicode::on(supports_unicode::Stream::Stdout)
}

pub fn detect_color_support() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

pub fn get_status_symbols(unicode_support: bool) -> (&'static str, &'static str) {
    if unicode_support {
        ("✓", "!")
    } else {
        ("+", "!")
    }
}

fn get_branches(unicode_support: bool) -> (&'static str, &'static str) {
    if unicode_support {
        ("├─", "└─")
    } else {
        ("|-", "`-")
    }
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 { one } else { many }
}

fn control_character_positions(s: &str) -> Vec<usize> {
    s.chars()
        .enumerate()
        .filter(|(_, c)| c.is_control())
        .map(|(pos, _)| pos)
        .collect()
}

fn confirm_control_characters(s: &str, input_name: &str) -> Result<bool> {
    let positions = control_character_positions(s);
    if positions.is_empty() {
        return Ok(true);
    }

    let term = Term::stderr();

    let warning_msg = format!(
        "WARNING: {} contains {} control character(s) at position(s): {}",
        input_name,
        positions.len(),
        positions
            .iter()
            .map(|pos| pos.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    term.write_line(&warning_msg)?;
    term.write_str("Continue anyway? [y/N]: ")?;
    term.flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    let response = response.trim().to_lowercase();

    term.clear_last_lines(2)?;

    Ok(response == "y" || response == "yes")
}

/// Reads the master password without echo, prompting on the terminal rather
/// than stdout. Not trimmed or normalized: the exact bytes typed are hashed.
pub fn prompt_master_secret() -> Result<Zeroizing<String>> {
    let password = Zeroizing::new(
        prompt_password("Master password: ").context("Failed to read master password")?,
    );
    check_master_secret(&password)?;

    Ok(password)
}

pub fn check_master_secret(password: &str) -> Result<()> {
    if password.is_empty() {
        anyhow::bail!("Master password cannot be empty");
    }

    if password.len() > MAX_MASTER_BYTES {
        anyhow::bail!(
            "Master password too long ({} bytes, maximum is {})",
            password.len(),
            MAX_MASTER_BYTES
        );
    }

    if !confirm_control_characters(password, "Master password")? {
        anyhow::bail!("Aborted");
    }

    Ok(())
}

pub fn display_output(
    output: &Zeroizing<String>,
    settings: &Settings,
    input_info: &InputInfo,
    options: &DisplayOptions,
) {
    if options.quiet {
        println!("{}", &**output);
    } else {
        println!("Out[0]:\n{}\n", &**output);
        display_settings(settings, input_info, options);
    }
}

fn display_settings(settings: &Settings, input_info: &InputInfo, options: &DisplayOptions) {
    let (check_ok, check_warn) = get_status_symbols(options.unicode_support);
    let (branch, last) = get_branches(options.unicode_support);

    let hmac = settings.algorithm.is_hmac();
    let context_set = input_info.context_byte_length > 0;

    let style_for = |ok: bool| {
        if !options.color_support {
            Style::new()
        } else if ok {
            Style::new().green()
        } else {
            Style::new().yellow()
        }
    };

    let alg_style = style_for(hmac);
    let context_style = style_for(context_set);

    println!("Settings:");

    println!(
        "  {} Algorithm  {} {} ({})",
        branch,
        alg_style.apply_to(format!("[{}]", if hmac { check_ok } else { check_warn })),
        alg_style.apply_to(settings.algorithm),
        if hmac { "keyed" } else { "plain" }
    );

    println!(
        "  {} Master     {} {} ({} {})",
        branch,
        input_info.master_byte_length,
        plural(input_info.master_byte_length, "byte", "bytes"),
        input_info.master_char_count,
        plural(input_info.master_char_count, "char", "chars")
    );

    println!(
        "  {} Context    {} {} {} ({} {})",
        branch,
        context_style.apply_to(format!(
            "[{}]",
            if context_set { check_ok } else { check_warn }
        )),
        context_style.apply_to(input_info.context_byte_length),
        plural(input_info.context_byte_length, "byte", "bytes"),
        context_style.apply_to(input_info.context_char_count),
        plural(input_info.context_char_count, "char", "chars")
    );

    let charset_size = settings.character_set.chars().count();
    println!("  {} Charset    {} chars", branch, charset_size);

    if !settings.prefix.is_empty() {
        println!("  {} Prefix     {:?}", branch, settings.prefix);
    }
    if !settings.suffix.is_empty() {
        println!("  {} Suffix     {:?}", branch, settings.suffix);
    }

    println!(
        "  {} Output     {} {}",
        last,
        settings.length,
        plural(settings.length, "char", "chars")
    );
}

fn algorithm_line(alg: Algorithm, default: Algorithm) -> String {
    if alg == default {
        format!("{} (default)", alg)
    } else {
        alg.to_string()
    }
}

pub fn display_algorithms(algorithms: &[Algorithm]) {
    let default = Settings::default().algorithm;
    for alg in algorithms {
        println!("{}", algorithm_line(*alg, default));
    }
}

pub fn display_profiles(names: &[String], current: &str) {
    if names.is_empty() {
        println!("No saved profiles");
        return;
    }
    for name in names {
        let marker = if name == current { "*" } else { " " };
        println!("{} {}", marker, name);
    }
}
