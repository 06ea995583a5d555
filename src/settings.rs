//! Settings
//!
//! The settings file is a list of `KEY=value` assignments. It is read as data,
//! nothing in it is expanded or executed.
//!
//! ```text
//! # ~/.autorandr.conf
//! XRANDR=/usr/local/bin/xrandr
//! FP_METHODS="setup_fp_xrandr_edid setup_fp_sys_method"
//! DEFAULT_PROFILE=mobile
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::value::{Error as ValueError, MapDeserializer};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{Error, Result};

/// Ways of identifying the connected displays, tried in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FingerprintMethod {
    /// Hash `edid` of every connector whose `status` is `connected` in sysfs.
    ConnectorStatusEdid,
    /// Hash the EDID blocks of the query tool's verbose report.
    QueryToolEdid,
    /// Use the alternate tool's display listing.
    AlternateToolListing,
}

impl FromStr for FingerprintMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "setup_fp_sys_method" | "sysfs" => Ok(Self::ConnectorStatusEdid),
            "setup_fp_xrandr_edid" | "xrandr" => Ok(Self::QueryToolEdid),
            "setup_fp_disper" | "disper" => Ok(Self::AlternateToolListing),
            other => Err(format!("unknown fingerprint method '{}'", other)),
        }
    }
}

/// Which tool reads the live configuration and applies stored ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ToolMethod {
    Xrandr,
    Disper,
}

impl FromStr for ToolMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "current_cfg_xrandr" | "load_cfg_xrandr" | "xrandr" => Ok(Self::Xrandr),
            "current_cfg_disper" | "load_cfg_disper" | "disper" => Ok(Self::Disper),
            other => Err(format!("unknown method '{}'", other)),
        }
    }
}

/// The name the program was started under picks the defaults.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Autorandr,
    AutoDisper,
}

impl Identity {
    pub fn from_program_name(argv0: &str) -> Self {
        match Path::new(argv0).file_name().and_then(|n| n.to_str()) {
            Some("auto-disper") => Self::AutoDisper,
            _ => Self::Autorandr,
        }
    }

    pub fn settings_file(&self, home: &Path) -> PathBuf {
        match self {
            Self::Autorandr => home.join(".autorandr.conf"),
            Self::AutoDisper => home.join(".auto-disper.conf"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub xrandr: PathBuf,
    pub disper: PathBuf,
    pub sysfs: PathBuf,
    pub profiles: PathBuf,
    pub fingerprint_methods: Vec<FingerprintMethod>,
    pub config_method: ToolMethod,
    pub load_method: ToolMethod,
    pub default_profile: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct RawSettings {
    #[serde(rename = "XRANDR", deserialize_with = "assigned")]
    xrandr: Option<String>,
    #[serde(rename = "DISPER", deserialize_with = "assigned")]
    disper: Option<String>,
    #[serde(rename = "SYSFS", deserialize_with = "assigned")]
    sysfs: Option<String>,
    #[serde(rename = "PROFILES", deserialize_with = "assigned")]
    profiles: Option<String>,
    #[serde(rename = "FP_METHODS", deserialize_with = "assigned")]
    fp_methods: Option<String>,
    #[serde(rename = "CURRENT_CFG_METHOD", deserialize_with = "assigned")]
    current_cfg_method: Option<String>,
    #[serde(rename = "LOAD_METHOD", deserialize_with = "assigned")]
    load_method: Option<String>,
    #[serde(rename = "DEFAULT_PROFILE", deserialize_with = "assigned")]
    default_profile: Option<String>,
}

// Assignments arrive as bare strings; absent keys fall back to `None`.
fn assigned<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

impl Settings {
    pub fn defaults(identity: Identity, home: &Path) -> Self {
        let base = Settings {
            xrandr: PathBuf::from("xrandr"),
            disper: PathBuf::from("disper"),
            sysfs: PathBuf::from("/sys/class/drm"),
            profiles: home.join(".autorandr"),
            fingerprint_methods: vec![
                FingerprintMethod::ConnectorStatusEdid,
                FingerprintMethod::QueryToolEdid,
            ],
            config_method: ToolMethod::Xrandr,
            load_method: ToolMethod::Xrandr,
            default_profile: None,
        };
        match identity {
            Identity::Autorandr => base,
            Identity::AutoDisper => Settings {
                profiles: home.join(".auto-disper"),
                fingerprint_methods: vec![FingerprintMethod::AlternateToolListing],
                config_method: ToolMethod::Disper,
                load_method: ToolMethod::Disper,
                ..base
            },
        }
    }

    /// Read overrides from `path` on top of `self`. A missing file changes nothing.
    pub fn load(self, path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                debug!("reading settings from {}", path.display());
                self.merge(&text)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    pub fn merge(mut self, text: &str) -> Result<Self> {
        let pairs = parse_assignments(text)?;
        let raw = RawSettings::deserialize(MapDeserializer::<_, ValueError>::new(pairs.into_iter()))
            .map_err(|e| Error::SettingsValue(e.to_string()))?;

        if let Some(xrandr) = raw.xrandr {
            self.xrandr = xrandr.into();
        }
        if let Some(disper) = raw.disper {
            self.disper = disper.into();
        }
        if let Some(sysfs) = raw.sysfs {
            self.sysfs = sysfs.into();
        }
        if let Some(profiles) = raw.profiles {
            self.profiles = profiles.into();
        }
        if let Some(methods) = raw.fp_methods {
            let methods = methods
                .split_whitespace()
                .map(str::parse)
                .collect::<std::result::Result<Vec<FingerprintMethod>, _>>()
                .map_err(Error::SettingsValue)?;
            if methods.is_empty() {
                return Err(Error::SettingsValue("FP_METHODS is empty".into()));
            }
            self.fingerprint_methods = methods;
        }
        if let Some(method) = raw.current_cfg_method {
            self.config_method = method.parse().map_err(Error::SettingsValue)?;
        }
        if let Some(method) = raw.load_method {
            self.load_method = method.parse().map_err(Error::SettingsValue)?;
        }
        if let Some(profile) = raw.default_profile.filter(|p| !p.is_empty()) {
            self.default_profile = Some(profile);
        }
        Ok(self)
    }
}

/// Split settings text into assignments. Later assignments win.
fn parse_assignments(text: &str) -> Result<BTreeMap<String, String>> {
    let mut pairs = BTreeMap::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let err = |message: &str| Error::Settings {
            line: idx + 1,
            message: message.to_owned(),
        };
        let (key, value) = line.split_once('=').ok_or_else(|| err("expected KEY=value"))?;
        let valid_key = key.starts_with(|c: char| c.is_ascii_uppercase() || c == '_')
            && key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !valid_key {
            return Err(err("invalid key"));
        }
        let value = unquote(value).ok_or_else(|| err("unterminated or unsupported quoting"))?;
        if value.contains('$') || value.contains('`') {
            return Err(err("shell expansion is not supported"));
        }
        pairs.insert(key.to_owned(), value.to_owned());
    }
    Ok(pairs)
}

fn unquote(value: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            let inner = rest.strip_suffix(quote)?;
            return (!inner.contains(quote)).then_some(inner);
        }
    }
    if value.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == ';') {
        return None;
    }
    Some(value)
}
