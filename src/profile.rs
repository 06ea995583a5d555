//! Profiles
//!
//! A profile is a directory under the profiles root:
//!
//! ```text
//! <root>/<name>/setup        fingerprint at save time
//! <root>/<name>/config       directives to apply
//! <root>/<name>/block        optional hook scripts
//! <root>/<name>/preswitch
//! <root>/<name>/postswitch
//! ```
//!
//! `common`, `horizontal` and `vertical` exist without a directory, their
//! layout is computed from the live mode lists when they are loaded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VirtualProfile {
    Common,
    Horizontal,
    Vertical,
}

impl VirtualProfile {
    pub const ALL: [VirtualProfile; 3] = [Self::Common, Self::Horizontal, Self::Vertical];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Common => "Clone all connected outputs at the largest common resolution",
            Self::Horizontal => "Stack all connected outputs horizontally at their largest resolution",
            Self::Vertical => "Stack all connected outputs vertically at their largest resolution",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileConfig {
    /// Directive text exactly as saved.
    Stored(String),
    Virtual(VirtualProfile),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    /// Absent for virtual profiles and for hand-made ones without a setup file.
    pub setup: Option<Fingerprint>,
    pub config: ProfileConfig,
}

pub struct ProfileStore {
    root: PathBuf,
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains('/') {
        return Err(Error::InvalidProfileName(name.to_owned()));
    }
    Ok(())
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProfileStore { root: root.into() }
    }

    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Stored profiles, sorted by name.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if check_name(&name).is_ok() && entry.path().join("config").is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<Profile> {
        check_name(name).map_err(|_| Error::ProfileNotFound(name.to_owned()))?;
        let dir = self.profile_dir(name);
        let virtual_profile = VirtualProfile::from_name(name);

        let config = match (read_optional(&dir.join("config"))?, virtual_profile) {
            (Some(text), virtual_profile) => {
                if virtual_profile.is_some() {
                    warn!("profile '{}' overrides the virtual profile with the same name", name);
                }
                ProfileConfig::Stored(text)
            }
            (None, Some(virtual_profile)) => ProfileConfig::Virtual(virtual_profile),
            (None, None) => return Err(Error::ProfileNotFound(name.to_owned())),
        };
        let setup = read_optional(&dir.join("setup"))?.map(|text| Fingerprint::parse(&text));

        Ok(Profile {
            name: name.to_owned(),
            setup,
            config,
        })
    }

    pub fn save(&self, name: &str, fingerprint: &Fingerprint, config: &str) -> Result<()> {
        if VirtualProfile::from_name(name).is_some() {
            return Err(Error::ReservedName(name.to_owned()));
        }
        check_name(name)?;

        let dir = self.profile_dir(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("setup"), fingerprint.to_string())?;
        fs::write(dir.join("config"), config)?;
        info!("saved current configuration as profile '{}'", name);
        Ok(())
    }
}
