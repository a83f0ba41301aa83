use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::Deserialize;
use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::library::PoseLibrary;
use crate::pose::{PoseDefinition, PoseEntry};
use crate::sim::{Reinit, Storage};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Timing {
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

/// Upper bounds keep every frame time representable.
const MAX_DWELL_MS: u64 = 60_000;
const MAX_FRAME_MS: u64 = 1_000;

fn default_dwell_ms() -> u64 {
    800
}

fn default_frame_ms() -> u64 {
    10
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            dwell_ms: default_dwell_ms(),
            frame_ms: default_frame_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSpec {
    pub name: String,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub reinit: Reinit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoseSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub preview: Option<PathBuf>,
    pub hand_shape: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub detectors: Vec<DetectorSpec>,
    #[serde(default)]
    pub poses: Vec<PoseSpec>,
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.timing.dwell_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.timing.frame_ms)
    }

    /// Build the pose library. Every call makes fresh definitions.
    pub fn library(&self) -> PoseLibrary {
        self.poses
            .iter()
            .map(|p| {
                let mut entry = PoseEntry::new(
                    p.name.clone(),
                    PoseDefinition::new(p.name.clone(), p.hand_shape.clone()),
                )
                .with_description(p.description.clone());
                if let Some(preview) = &p.preview {
                    entry = entry.with_preview(preview.clone());
                }
                entry
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

/// `~/.config/signpose`
pub fn default_config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("can't determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("signpose"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ConfigState {
    /// Load the active profile from `config_dir`, installing the bundled
    /// default profile and active pointer on first use.
    pub fn load_or_install_default(config_dir: &Path) -> Result<Self> {
        let profdir = config_dir.join("profiles");
        fs::create_dir_all(&profdir)
            .map_err(|e| anyhow!("failed to create {}: {e}", profdir.display()))?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = config_dir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: config_dir.to_path_buf(),
            profiles_dir: profdir,
            active_ptr,
        })
    }

    /// Use `name` for this process only; the active pointer is left alone.
    pub fn with_profile(mut self, name: &str) -> Result<Self> {
        self.profile = load_profile(&self.profiles_dir, name)?;
        self.active_name = name.to_string();
        Ok(self)
    }

    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        // parse before moving the pointer so a broken profile never becomes active
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        serde_json::json!({
            "config_dir": self.config_dir,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "profile_name": self.profile.meta.name,
            "profiles": self.list_profiles(),
            "dwell_ms": self.profile.timing.dwell_ms,
            "frame_ms": self.profile.timing.frame_ms,
            "poses": self.profile.poses.len(),
        })
    }
}

fn load_profile(profiles_dir: &Path, name: &str) -> Result<Profile> {
    let path = profiles_dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}

fn validate_profile(p: &Profile) -> Result<()> {
    if p.timing.dwell_ms == 0 || p.timing.frame_ms == 0 {
        return Err(anyhow!("timing.dwell_ms and timing.frame_ms must be positive"));
    }
    if p.timing.dwell_ms > MAX_DWELL_MS {
        return Err(anyhow!(
            "timing.dwell_ms = {} exceeds {MAX_DWELL_MS}",
            p.timing.dwell_ms
        ));
    }
    if p.timing.frame_ms > MAX_FRAME_MS {
        return Err(anyhow!(
            "timing.frame_ms = {} exceeds {MAX_FRAME_MS}",
            p.timing.frame_ms
        ));
    }

    let mut seen = HashSet::new();
    for d in &p.detectors {
        if d.name.trim().is_empty() {
            return Err(anyhow!("detector with empty name"));
        }
        if !seen.insert(d.name.as_str()) {
            return Err(anyhow!("duplicate detector '{}'", d.name));
        }
    }

    for (i, pose) in p.poses.iter().enumerate() {
        if pose.name.trim().is_empty() {
            return Err(anyhow!("poses[{i}] has an empty name"));
        }
        if pose.hand_shape.trim().is_empty() {
            return Err(anyhow!("pose '{}' has an empty hand_shape", pose.name));
        }
    }
    Ok(())
}
