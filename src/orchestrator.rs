//! Save, detect and load.
//!
//! A detect run fingerprints the connected displays, walks the stored
//! profiles in name order and stops at the first one that is not blocked
//! and whose setup matches. Switching to a profile always runs the
//! preswitch hooks, applies, then runs the postswitch hooks.

use tracing::{error, info, warn};

use crate::apply;
use crate::backends::{AlternateTool, DisplayTool};
use crate::equality::config_equal;
use crate::error::{Error, Result};
use crate::fingerprint::{Fingerprint, FingerprintEngine};
use crate::hooks::HookRunner;
use crate::output::{parse_directives, render_directives};
use crate::profile::{Profile, ProfileConfig, ProfileStore, VirtualProfile};
use crate::query::{live_config, parse_report};
use crate::settings::{Settings, ToolMethod};
use crate::synth::synthesize;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProfileState {
    /// Looked at, setup differs.
    Listed,
    Blocked,
    Detected,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Switch {
    NotRequested,
    /// The live configuration already equals the stored one.
    AlreadyActive,
    Applied { invocations: usize },
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detection {
    pub profiles: Vec<(String, ProfileState)>,
    pub detected: Option<String>,
    pub default_loaded: Option<String>,
    pub switch: Switch,
}

impl Detection {
    /// A run succeeds when a profile was detected or a default could be loaded.
    pub fn success(&self) -> bool {
        self.detected.is_some() || self.default_loaded.is_some()
    }
}

pub struct Autorandr {
    config_method: ToolMethod,
    load_method: ToolMethod,
    store: ProfileStore,
    hooks: HookRunner,
    engine: FingerprintEngine,
    display: Box<dyn DisplayTool>,
    alternate: Box<dyn AlternateTool>,
}

impl Autorandr {
    pub fn new(
        settings: &Settings,
        display: Box<dyn DisplayTool>,
        alternate: Box<dyn AlternateTool>,
    ) -> Self {
        Autorandr {
            config_method: settings.config_method,
            load_method: settings.load_method,
            store: ProfileStore::new(&settings.profiles),
            hooks: HookRunner::new(&settings.profiles),
            engine: FingerprintEngine::new(settings.fingerprint_methods.clone(), &settings.sysfs),
            display,
            alternate,
        }
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn fingerprint(&mut self) -> Result<Fingerprint> {
        self.engine
            .fingerprint(self.display.as_mut(), self.alternate.as_mut())
    }

    /// Unknown hardware is an empty fingerprint, which matches no profile.
    fn fingerprint_or_empty(&mut self) -> Result<Fingerprint> {
        match self.fingerprint() {
            Err(Error::FingerprintUnavailable) => {
                warn!("{}, no profile can match", Error::FingerprintUnavailable);
                Ok(Fingerprint::default())
            }
            other => other,
        }
    }

    pub fn current_config(&mut self) -> Result<String> {
        match self.config_method {
            ToolMethod::Xrandr => {
                let connectors = parse_report(&self.display.query()?)?;
                Ok(render_directives(&live_config(&connectors)))
            }
            ToolMethod::Disper => self.alternate.print(),
        }
    }

    pub fn save(&mut self, name: &str) -> Result<()> {
        if VirtualProfile::from_name(name).is_some() {
            return Err(Error::ReservedName(name.to_owned()));
        }
        let fingerprint = self.fingerprint_or_empty()?;
        let config = self.current_config()?;
        self.store.save(name, &fingerprint, &config)
    }

    /// Explicit load: always applied, whatever the live state.
    pub fn load(&mut self, name: &str) -> Result<usize> {
        let profile = self.store.load(name)?;
        self.switch_to(&profile)
    }

    pub fn detect(&mut self, change: bool, force: bool, default: Option<&str>) -> Result<Detection> {
        let current = self.fingerprint_or_empty()?;
        let mut detection = Detection {
            profiles: Vec::new(),
            detected: None,
            default_loaded: None,
            switch: Switch::NotRequested,
        };

        for name in self.store.list()? {
            if self.hooks.blocked(&name) {
                detection.profiles.push((name, ProfileState::Blocked));
                continue;
            }
            let profile = match self.store.load(&name) {
                Ok(profile) => profile,
                Err(e) => {
                    warn!("skipping profile '{}': {}", name, e);
                    continue;
                }
            };
            if !profile.setup.as_ref().map_or(false, |setup| current.matches(setup)) {
                detection.profiles.push((name, ProfileState::Listed));
                continue;
            }

            detection.profiles.push((name.clone(), ProfileState::Detected));
            detection.detected = Some(name);
            if change {
                detection.switch = self.change_to(&profile, force);
            }
            return Ok(detection);
        }

        if let Some(default) = default {
            match self.store.load(default) {
                Ok(profile) => {
                    info!("no profile detected, falling back to '{}'", default);
                    detection.switch = self.change_to(&profile, true);
                    detection.default_loaded = Some(default.to_owned());
                }
                Err(e) => error!("default profile unusable: {}", e),
            }
        }
        Ok(detection)
    }

    fn change_to(&mut self, profile: &Profile, force: bool) -> Switch {
        if !force {
            if let ProfileConfig::Stored(stored) = &profile.config {
                match self.current_config() {
                    Ok(live) if config_equal(stored, &live) => {
                        info!("profile '{}' is already active", profile.name);
                        return Switch::AlreadyActive;
                    }
                    Ok(_) => {}
                    Err(e) => warn!("unable to read live configuration: {}", e),
                }
            }
        }
        match self.switch_to(profile) {
            Ok(invocations) => Switch::Applied { invocations },
            Err(e) => {
                error!("failed to load profile '{}': {}", profile.name, e);
                Switch::Failed
            }
        }
    }

    /// Hooks around the apply step. Postswitch hooks run even if applying failed.
    fn switch_to(&mut self, profile: &Profile) -> Result<usize> {
        self.hooks.run_pre(&profile.name);
        let result = self.apply_profile(profile);
        self.hooks.run_post(&profile.name);
        result
    }

    fn apply_profile(&mut self, profile: &Profile) -> Result<usize> {
        match &profile.config {
            ProfileConfig::Stored(text) => {
                info!("loading profile '{}'", profile.name);
                match self.load_method {
                    ToolMethod::Xrandr => {
                        let directives = parse_directives(text)?;
                        apply::apply(self.display.as_mut(), &directives)
                    }
                    ToolMethod::Disper => {
                        self.alternate.import(text)?;
                        Ok(1)
                    }
                }
            }
            ProfileConfig::Virtual(virtual_profile) => {
                info!("loading virtual profile '{}': {}", virtual_profile.name(), virtual_profile.description());
                let connectors = parse_report(&self.display.query()?)?;
                let directives = synthesize(*virtual_profile, &connectors);
                apply::apply(self.display.as_mut(), &directives)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::backends::dummy::{DummyAlternate, DummyDisplay};
    use crate::settings::{FingerprintMethod, Identity};
    use crate::test_support::{exec_guard, logging_script, write_script};

    const DOCKED: &str = "\
Screen 0: minimum 8 x 8, current 3200 x 1080, maximum 32767 x 32767
eDP1 connected primary 1920x1080+0+0 (0x46) normal (normal left inverted right x axis y axis) 344mm x 193mm
\tEDID:
\t\t00ffffffffffff0030aef06100000000
  1920x1080 (0x46) 138.700MHz +HSync -VSync *current +preferred
  1280x720 (0x48) 74.500MHz -HSync +VSync
HDMI1 connected 1280x1024+1920+0 (0x50) normal (normal left inverted right x axis y axis) 376mm x 301mm
\tEDID:
\t\t00ffffffffffff0010ac1c4053325a30
  1280x1024 (0x50) 108.000MHz +HSync +VSync *current +preferred
  1280x720 (0x51) 74.250MHz +HSync +VSync
DP1 disconnected (normal left inverted right x axis y axis)
";

    const MOBILE: &str = "\
eDP1 connected primary 1920x1080+0+0 (0x46) normal (normal left inverted right x axis y axis) 344mm x 193mm
\tEDID:
\t\t00ffffffffffff0030aef06100000000
  1920x1080 (0x46) 138.700MHz +HSync -VSync *current +preferred
HDMI1 disconnected (normal left inverted right x axis y axis)
DP1 disconnected (normal left inverted right x axis y axis)
";

    fn split(line: &str) -> Vec<String> {
        line.split(' ').map(String::from).collect()
    }

    fn autorandr(root: &Path, display: &DummyDisplay) -> Autorandr {
        let mut settings = Settings::defaults(Identity::Autorandr, root);
        settings.profiles = root.join("profiles");
        settings.fingerprint_methods = vec![FingerprintMethod::QueryToolEdid];
        Autorandr::new(
            &settings,
            Box::new(display.clone()),
            Box::new(DummyAlternate::default()),
        )
    }

    fn hand_made(root: &Path, name: &str, setup: &str) -> std::io::Result<()> {
        let dir = root.join("profiles").join(name);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("setup"), setup)?;
        fs::write(dir.join("config"), "output eDP1\noff\n")
    }

    #[test]
    fn saved_profile_is_detected() -> Result<()> {
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);
        app.save("docked")?;

        let detection = app.detect(false, false, None)?;
        assert_eq!(detection.detected.as_deref(), Some("docked"));
        assert_eq!(
            detection.profiles,
            [("docked".to_owned(), ProfileState::Detected)]
        );
        assert_eq!(detection.switch, Switch::NotRequested);
        assert!(detection.success());
        assert!(display.applied().is_empty());
        Ok(())
    }

    #[test]
    fn first_matching_profile_wins() -> Result<()> {
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(MOBILE);
        let mut app = autorandr(root.path(), &display);
        app.save("p2")?;
        app.save("p3")?;
        hand_made(root.path(), "p1", "eDP1 somethingelse\n")?;

        let detection = app.detect(false, false, None)?;
        assert_eq!(detection.detected.as_deref(), Some("p2"));
        // p3 matches too, but is never looked at.
        assert_eq!(
            detection.profiles,
            [
                ("p1".to_owned(), ProfileState::Listed),
                ("p2".to_owned(), ProfileState::Detected),
            ]
        );
        Ok(())
    }

    #[test]
    fn unchanged_layout_is_not_reapplied() -> Result<()> {
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);
        app.save("docked")?;

        let detection = app.detect(true, false, None)?;
        assert_eq!(detection.switch, Switch::AlreadyActive);
        assert!(display.applied().is_empty());

        let forced = app.detect(true, true, None)?;
        assert_eq!(forced.switch, Switch::Applied { invocations: 2 });
        assert_eq!(
            display.applied(),
            [
                split("--output DP1 --off"),
                split("--output eDP1 --mode 1920x1080 --pos 0x0 --rotate normal --primary --output HDMI1 --mode 1280x1024 --pos 1920x0 --rotate normal"),
            ]
        );
        Ok(())
    }

    #[test]
    fn changed_layout_is_applied() -> Result<()> {
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);
        app.save("docked")?;

        // Same monitors, HDMI1 moved to the left.
        display.set_report(&DOCKED.replace("1280x1024+1920+0", "1280x1024+0+0").replace("1920x1080+0+0", "1920x1080+1280+0"));
        let detection = app.detect(true, false, None)?;
        assert_eq!(detection.switch, Switch::Applied { invocations: 2 });
        Ok(())
    }

    #[test]
    fn blocked_profile_is_skipped() -> Result<()> {
        let _guard = exec_guard();
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);
        app.save("docked")?;
        write_script(&root.path().join("profiles/docked/block"), "exit 0")?;

        let detection = app.detect(true, true, None)?;
        assert_eq!(detection.detected, None);
        assert_eq!(
            detection.profiles,
            [("docked".to_owned(), ProfileState::Blocked)]
        );
        assert!(!detection.success());
        assert!(display.applied().is_empty());
        Ok(())
    }

    #[test]
    fn no_match_without_default_fails_quietly() -> Result<()> {
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);
        hand_made(root.path(), "office", "DP1 aaa\n")?;

        let detection = app.detect(true, false, None)?;
        assert!(!detection.success());
        assert_eq!(detection.switch, Switch::NotRequested);
        assert!(display.applied().is_empty());

        let unusable = app.detect(true, false, Some("nowhere"))?;
        assert!(!unusable.success());
        assert!(display.applied().is_empty());
        Ok(())
    }

    #[test]
    fn default_profile_runs_one_cycle_with_hooks() -> Result<()> {
        let _guard = exec_guard();
        let root = tempfile::tempdir()?;
        let profiles = root.path().join("profiles");
        let log = root.path().join("hooks.log");
        logging_script(&profiles.join("preswitch"), &log, "global-pre")?;
        logging_script(&profiles.join("postswitch"), &log, "global-post")?;
        logging_script(&profiles.join("horizontal/preswitch"), &log, "profile-pre")?;
        logging_script(&profiles.join("horizontal/postswitch"), &log, "profile-post")?;

        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);
        let detection = app.detect(false, false, Some("horizontal"))?;

        assert!(detection.success());
        assert_eq!(detection.default_loaded.as_deref(), Some("horizontal"));
        assert_eq!(detection.switch, Switch::Applied { invocations: 2 });
        assert_eq!(
            display.applied(),
            [
                split("--output DP1 --off"),
                split("--output eDP1 --mode 1920x1080 --pos 0x0 --output HDMI1 --mode 1280x1024 --pos 1920x0"),
            ]
        );
        assert_eq!(
            fs::read_to_string(&log)?,
            "global-pre horizontal\nprofile-pre horizontal\nglobal-post horizontal\nprofile-post horizontal\n"
        );
        Ok(())
    }

    #[test]
    fn failed_apply_still_runs_post_hooks() -> Result<()> {
        let _guard = exec_guard();
        let root = tempfile::tempdir()?;
        let log = root.path().join("hooks.log");
        logging_script(&root.path().join("profiles/postswitch"), &log, "post")?;

        let display = DummyDisplay::new(DOCKED);
        display.set_failing(true);
        let mut app = autorandr(root.path(), &display);
        assert!(matches!(app.load("common"), Err(Error::ToolFailed { .. })));
        assert_eq!(fs::read_to_string(&log)?, "post common\n");

        // A default counts as loaded even when the tool rejects it.
        let detection = app.detect(true, false, Some("vertical"))?;
        assert!(detection.success());
        assert_eq!(detection.switch, Switch::Failed);
        Ok(())
    }

    #[test]
    fn explicit_load() -> Result<()> {
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);

        assert!(matches!(
            app.load("nowhere"),
            Err(Error::ProfileNotFound(_))
        ));
        assert!(display.applied().is_empty());

        // Connector names sort uppercase first, so HDMI1 leads the clone.
        assert_eq!(app.load("common")?, 2);
        assert_eq!(
            display.applied(),
            [
                split("--output DP1 --off"),
                split("--output HDMI1 --mode 1280x720 --pos 0x0 --output eDP1 --mode 1280x720 --pos 0x0 --same-as HDMI1"),
            ]
        );

        // Loading an identical stored layout is still applied.
        app.save("docked")?;
        assert_eq!(app.load("docked")?, 2);
        assert_eq!(display.applied().len(), 4);
        Ok(())
    }

    #[test]
    fn reserved_names_are_not_saved() -> Result<()> {
        let root = tempfile::tempdir()?;
        let display = DummyDisplay::new(DOCKED);
        let mut app = autorandr(root.path(), &display);
        assert!(matches!(
            app.save("vertical"),
            Err(Error::ReservedName(_))
        ));
        assert!(app.store().list()?.is_empty());
        Ok(())
    }

    #[test]
    fn unknown_hardware_matches_nothing() -> Result<()> {
        let root = tempfile::tempdir()?;
        // No EDID anywhere in the report.
        let display = DummyDisplay::new("eDP1 connected primary 1920x1080+0+0 (normal)\n   1920x1080 60.00*+\n");
        let mut app = autorandr(root.path(), &display);
        assert!(matches!(app.fingerprint(), Err(Error::FingerprintUnavailable)));

        app.save("blank")?;
        assert_eq!(fs::read_to_string(root.path().join("profiles/blank/setup"))?, "");
        let detection = app.detect(true, true, None)?;
        assert_eq!(detection.detected, None);
        assert!(display.applied().is_empty());
        Ok(())
    }

    #[test]
    fn disper_load_method_imports_stored_text() -> Result<()> {
        let root = tempfile::tempdir()?;
        let mut settings = Settings::defaults(Identity::AutoDisper, root.path());
        settings.profiles = root.path().join("profiles");
        let alternate = DummyAlternate::new("display DFP-0: Dell U2410\n", "metamodes: DFP-0: 1920x1200\n");
        let display = DummyDisplay::default();
        let mut app = Autorandr::new(&settings, Box::new(display.clone()), Box::new(alternate.clone()));

        app.save("desk")?;
        assert_eq!(app.load("desk")?, 1);
        assert_eq!(alternate.imported(), ["metamodes: DFP-0: 1920x1200\n"]);
        assert_eq!(app.detect(false, false, None)?.detected.as_deref(), Some("desk"));
        assert!(display.applied().is_empty());
        Ok(())
    }
}
