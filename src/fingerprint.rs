//! Fingerprints
//!
//! A fingerprint is the set of connected displays, one
//! `connector identity` pair per line, sorted by connector. The same
//! hardware always yields the same text no matter what order the
//! kernel or the tools enumerate it in.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::backends::{AlternateTool, DisplayTool};
use crate::error::{Error, Result};
use crate::query::parse_report;
use crate::settings::FingerprintMethod;

lazy_static! {
    static ref CARD_PREFIX: Regex = Regex::new(r"^card\d+-").unwrap();
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fingerprint {
    displays: BTreeMap<String, String>,
}

impl Fingerprint {
    /// Read a stored setup. Blank lines are skipped, order does not matter.
    pub fn parse(text: &str) -> Self {
        text.lines()
            .filter_map(|line| {
                let line = line.trim();
                let (connector, identity) = line.split_once(char::is_whitespace)?;
                Some((connector.to_owned(), identity.trim().to_owned()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    /// Set equality, except that nothing matches an empty fingerprint.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        !self.is_empty() && self == other
    }
}

impl FromIterator<(String, String)> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Fingerprint {
            displays: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (connector, identity) in &self.displays {
            writeln!(f, "{} {}", connector, identity)?;
        }
        Ok(())
    }
}

fn identity_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub struct FingerprintEngine {
    methods: Vec<FingerprintMethod>,
    sysfs: PathBuf,
}

impl FingerprintEngine {
    pub fn new(methods: Vec<FingerprintMethod>, sysfs: impl Into<PathBuf>) -> Self {
        FingerprintEngine {
            methods,
            sysfs: sysfs.into(),
        }
    }

    /// First non-empty result of the configured methods.
    pub fn fingerprint(
        &self,
        display: &mut dyn DisplayTool,
        alternate: &mut dyn AlternateTool,
    ) -> Result<Fingerprint> {
        for method in &self.methods {
            let result = match method {
                FingerprintMethod::ConnectorStatusEdid => from_sysfs(&self.sysfs),
                FingerprintMethod::QueryToolEdid => display.query().and_then(|r| from_report(&r)),
                FingerprintMethod::AlternateToolListing => alternate.list().map(|l| from_listing(&l)),
            };
            match result {
                Ok(fingerprint) if !fingerprint.is_empty() => {
                    debug!("fingerprint from {:?}", method);
                    return Ok(fingerprint);
                }
                Ok(_) => debug!("{:?} found no connected displays", method),
                Err(e) => warn!("{:?} failed: {}", method, e),
            }
        }
        Err(Error::FingerprintUnavailable)
    }
}

/// Connectors whose `status` reads `connected`, keyed without the `cardN-` prefix.
fn from_sysfs(root: &Path) -> Result<Fingerprint> {
    let pattern = format!("{}/card*-*", Pattern::escape(&root.to_string_lossy()));
    let mut displays = BTreeMap::new();

    for entry in glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!("skipping connector: {}", e);
                continue;
            }
        };
        let status = match fs::read_to_string(path.join("status")) {
            Ok(status) => status,
            Err(_) => continue,
        };
        if status.trim() != "connected" {
            continue;
        }
        let edid = match fs::read(path.join("edid")) {
            Ok(edid) => edid,
            Err(e) => {
                debug!("no EDID for {}: {}", path.display(), e);
                continue;
            }
        };
        let dir_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let connector = CARD_PREFIX.replace(&dir_name, "").into_owned();
        displays.insert(connector, identity_hash(&edid));
    }

    Ok(Fingerprint { displays })
}

fn from_report(report: &str) -> Result<Fingerprint> {
    Ok(parse_report(report)?
        .into_iter()
        .filter(|c| c.is_connected())
        .filter_map(|c| {
            let identity = identity_hash(c.edid.as_ref()?);
            Some((c.name, identity))
        })
        .collect())
}

/// `display <id>: <description>` lines of the alternate tool's listing.
fn from_listing(listing: &str) -> Fingerprint {
    listing
        .lines()
        .filter_map(|line| line.strip_prefix("display "))
        .filter_map(|rest| rest.split_once(':'))
        .map(|(id, description)| (id.trim().to_owned(), identity_hash(description.trim().as_bytes())))
        .collect()
}
