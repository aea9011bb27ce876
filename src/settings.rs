use crate::error::{PwmError, Result};
use crate::generator::{generate_password, DerivationRequest, FULL_CHARSET};
use crate::hash::Algorithm;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_LENGTH: usize = 8;

const FILE_PREFIX: &str = "pwm.";
const FILE_SUFFIX: &str = ".setting";

/// One set of inputs for password generation.
///
/// `master_pass` is never serialized: saving drops it and loading leaves the
/// in-memory value untouched.
#[derive(Clone, PartialEq, Serialize)]
pub struct Settings {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Modifier")]
    pub modifier: String,
    #[serde(skip)]
    pub master_pass: Zeroizing<String>,
    #[serde(rename = "Algorithm")]
    pub algorithm: Algorithm,
    #[serde(rename = "Length")]
    pub length: usize,
    #[serde(rename = "CharacterSet")]
    pub character_set: String,
    #[serde(rename = "Prefix")]
    pub prefix: String,
    #[serde(rename = "Suffix")]
    pub suffix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            modifier: String::new(),
            master_pass: Zeroizing::new(String::new()),
            algorithm: Algorithm::Md5,
            length: DEFAULT_LENGTH,
            character_set: FULL_CHARSET.to_string(),
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("modifier", &self.modifier)
            .field("master_pass", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("length", &self.length)
            .field("character_set", &self.character_set)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .finish()
    }
}

#[derive(Deserialize)]
struct SettingsFile {
    #[serde(rename = "URL", default, deserialize_with = "present")]
    url: Option<String>,
    #[serde(rename = "Username", default, deserialize_with = "present")]
    username: Option<String>,
    #[serde(rename = "Modifier", default, deserialize_with = "present")]
    modifier: Option<String>,
    #[serde(rename = "Algorithm", default, deserialize_with = "present")]
    algorithm: Option<String>,
    #[serde(rename = "Length", default, deserialize_with = "present")]
    length: Option<u64>,
    #[serde(rename = "CharacterSet", default, deserialize_with = "present")]
    character_set: Option<String>,
    #[serde(rename = "Prefix", default, deserialize_with = "present")]
    prefix: Option<String>,
    #[serde(rename = "Suffix", default, deserialize_with = "present")]
    suffix: Option<String>,
}

// A missing key keeps the current value; an explicit null is a type error.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub fn validate_algorithm(name: &str) -> Result<Algorithm> {
    name.parse()
}

pub fn validate_length(length: u64) -> Result<usize> {
    if length == 0 {
        return Err(PwmError::validation("Length must be at least 1"));
    }
    usize::try_from(length)
        .map_err(|_| PwmError::validation(format!("Length {} is out of range", length)))
}

pub fn validate_character_set(charset: &str) -> Result<()> {
    if charset.chars().count() < 2 {
        return Err(PwmError::validation(format!(
            "The charset {:?} contains less than 2 characters.",
            charset
        )));
    }
    Ok(())
}

impl SettingsFile {
    fn apply(self, target: &mut Settings) -> Result<()> {
        if let Some(url) = self.url {
            target.url = url;
        }
        if let Some(username) = self.username {
            target.username = username;
        }
        if let Some(modifier) = self.modifier {
            target.modifier = modifier;
        }
        if let Some(algorithm) = self.algorithm {
            target.algorithm = validate_algorithm(&algorithm)?;
        }
        if let Some(length) = self.length {
            target.length = validate_length(length)?;
        }
        if let Some(charset) = self.character_set {
            validate_character_set(&charset)?;
            target.character_set = charset;
        }
        if let Some(prefix) = self.prefix {
            target.prefix = prefix;
        }
        if let Some(suffix) = self.suffix {
            target.suffix = suffix;
        }
        Ok(())
    }
}

impl Settings {
    pub fn context(&self) -> String {
        format!("{}{}{}", self.url, self.username, self.modifier)
    }

    pub fn to_request(&self) -> DerivationRequest {
        DerivationRequest {
            algorithm: self.algorithm,
            master_secret: self.master_pass.clone(),
            context: self.context(),
            length: self.length,
            alphabet: self.character_set.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
        }
    }

    pub fn generate(&self) -> Result<Zeroizing<String>> {
        generate_password(&self.to_request())
    }

    pub fn to_json(&self) -> Result<String> {
        // Value objects keep keys sorted
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), "saved settings");
        Ok(())
    }

    /// Overlays the fields found in `path` onto `self`. Either every field
    /// applies or none does.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        self.load_json(&contents).map_err(|e| match e {
            PwmError::Validation(msg) => {
                PwmError::Validation(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        info!(path = %path.display(), "loaded settings");
        Ok(())
    }

    pub fn load_json(&mut self, contents: &str) -> Result<()> {
        let value: serde_json::Value = serde_json::from_str(contents)?;
        let file = SettingsFile::deserialize(value)
            .map_err(|e| PwmError::validation(format!("invalid settings field: {}", e)))?;

        let mut next = self.clone();
        file.apply(&mut next)?;
        *self = next;
        Ok(())
    }
}

pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_profile_name(name)?;
        Ok(self
            .dir
            .join(format!("{}{}{}", FILE_PREFIX, name, FILE_SUFFIX)))
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
                .filter(|name| validate_profile_name(name).is_ok())
            {
                names.push(name.to_string());
            }
        }

        names.sort();
        if let Some(pos) = names.iter().position(|n| n == DEFAULT_PROFILE) {
            let default = names.remove(pos);
            names.insert(0, default);
        }

        debug!(dir = %self.dir.display(), count = names.len(), "listed profiles");
        Ok(names)
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.is_file())
    }

    pub fn load(&self, name: &str) -> Result<Settings> {
        let mut settings = Settings::default();
        settings.load(&self.path_for(name)?)?;
        Ok(settings)
    }

    pub fn save(&self, name: &str, settings: &Settings) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;
        settings.save(&path)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        fs::remove_file(&path)?;
        info!(path = %path.display(), "removed profile");
        Ok(())
    }
}

fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PwmError::validation("Profile name cannot be empty"));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(PwmError::validation(format!(
            "Invalid profile name: {:?}",
            name
        )));
    }
    Ok(())
}
