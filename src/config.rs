/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

use crate::sim::event::SoundId;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub turns: TurnConfig,
    pub sound: SoundConfig,
    pub zones_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TurnConfig {
    pub turn_length_ms: u64,
    pub reset_again_delay_secs: u32, // wait between two block reset attempts
}

#[derive(Clone, Debug)]
pub struct SoundConfig {
    pub enabled: bool,
    pub push_sounds: Vec<SoundId>,   // candidates for blocks placed by the zone loader
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    turns: TomlTurns,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTurns {
    #[serde(default = "default_turn_length")]
    turn_length_ms: u64,
    #[serde(default = "default_reset_delay")]
    reset_again_delay_secs: u32,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_sound_enabled")]
    enabled: bool,
    #[serde(default = "default_push_sounds")]
    push_sounds: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_zones_dir")]
    zones_dir: String,
}

// ── Defaults ──

fn default_turn_length() -> u64 { 300 }
fn default_reset_delay() -> u32 { 10 }   // ~33 turns at 300ms
fn default_sound_enabled() -> bool { true }
fn default_push_sounds() -> Vec<String> { vec!["scrape".into(), "scrape-low".into()] }
fn default_zones_dir() -> String { "zones".into() }

impl Default for TomlTurns {
    fn default() -> Self {
        TomlTurns {
            turn_length_ms: default_turn_length(),
            reset_again_delay_secs: default_reset_delay(),
        }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound {
            enabled: default_sound_enabled(),
            push_sounds: default_push_sounds(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            zones_dir: default_zones_dir(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) ~/.local/share/pushblock.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve zones directory
        let zones_dir_str = &toml_cfg.general.zones_dir;
        let zones_dir = if PathBuf::from(zones_dir_str).is_absolute() {
            PathBuf::from(zones_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(zones_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(zones_dir_str))
        };

        GameConfig {
            turns: TurnConfig {
                turn_length_ms: toml_cfg.turns.turn_length_ms.max(1),
                reset_again_delay_secs: toml_cfg.turns.reset_again_delay_secs,
            },
            sound: SoundConfig {
                enabled: toml_cfg.sound.enabled,
                push_sounds: toml_cfg.sound.push_sounds.iter().map(|s| SoundId::new(s)).collect(),
            },
            zones_dir,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/pushblock)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/pushblock");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        tracing::info!("loaded {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    tracing::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
