//! Stored versus live configuration.
//!
//! Only decides whether a detected profile needs to be applied again.
//! Fingerprints are never compared here.

fn canonical(config: &str) -> impl Iterator<Item = &str> {
    config.lines().map(str::trim_end).filter(|line| !line.is_empty())
}

/// Both sides are in the format the live configuration is rendered in,
/// so anything beyond line endings and trailing blanks is a real difference.
pub fn config_equal(stored: &str, live: &str) -> bool {
    canonical(stored).eq(canonical(live))
}
