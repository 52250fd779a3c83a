// OpenSoul Gate - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single source of truth for where OpenSoul keeps state, config and
// OAuth credentials. Pure: environment, profile, home directory, working
// directory and filesystem existence are all passed in. Never creates
// anything on disk.
//
// State dir:   OPENSOUL_STATE_DIR > ~/.opensoul-<profile> > ~/.opensoul (if present) > ~/.moldbot
// Config:      OPENSOUL_CONFIG_PATH > <state override>/opensoul.json
//              > <profile state dir>/opensoul.json > first existing default candidate
// OAuth dir:   OPENSOUL_OAUTH_DIR > <state dir>/credentials
// Layout:      <state dir>/workspace, logs, gateway.pid, gateway.port, gateway.token
//
// The .moldbot / moldbot.json names are the pre-rename layout. They stay
// readable as fallbacks; nothing new is ever created under them by choice.

use crate::env::{EnvSnapshot, CONFIG_PATH_ENV, HOME_ENV, OAUTH_DIR_ENV, PROFILE_ENV, STATE_DIR_ENV};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

pub const STATE_DIRNAME: &str = ".opensoul";
pub const LEGACY_STATE_DIRNAME: &str = ".moldbot";
pub const CONFIG_FILENAME: &str = "opensoul.json";
pub const LEGACY_CONFIG_FILENAME: &str = "moldbot.json";
pub const OAUTH_DIRNAME: &str = "credentials";
pub const OAUTH_FILENAME: &str = "oauth.json";
pub const WORKSPACE_DIRNAME: &str = "workspace";
pub const LOGS_DIRNAME: &str = "logs";
pub const GATEWAY_PID_FILENAME: &str = "gateway.pid";
pub const GATEWAY_PORT_FILENAME: &str = "gateway.port";
pub const GATEWAY_TOKEN_FILENAME: &str = "gateway.token";

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("cannot determine home directory: HOME and USERPROFILE are unset")]
    HomeUnavailable,
}

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Filesystem existence probe. Any error while probing means "does not exist".
pub trait FsProbe {
    fn dir_exists(&self, path: &Path) -> bool;
    fn file_exists(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl FsProbe for HostFs {
    fn dir_exists(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    fn file_exists(&self, path: &Path) -> bool {
        std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
    }
}

/// Home directory of the current user, as the OS reports it
pub fn system_home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Everything path resolution reads from the outside world.
pub struct PathInputs<'a> {
    pub env: &'a EnvSnapshot,
    /// Explicit profile; falls back to OPENSOUL_PROFILE when `None`
    pub profile: Option<&'a str>,
    pub home: &'a dyn Fn() -> Option<PathBuf>,
    /// Base for relative overrides
    pub cwd: &'a Path,
    pub fs: &'a dyn FsProbe,
}

impl<'a> PathInputs<'a> {
    pub fn new(
        env: &'a EnvSnapshot,
        home: &'a dyn Fn() -> Option<PathBuf>,
        cwd: &'a Path,
        fs: &'a dyn FsProbe,
    ) -> Self {
        Self { env, profile: None, home, cwd, fs }
    }

    pub fn with_profile(mut self, profile: Option<&'a str>) -> Self {
        self.profile = profile;
        self
    }

    /// Effective home, `None` when nothing can be determined
    pub fn home_dir(&self) -> Option<PathBuf> {
        effective_home(self.env, self.home, self.cwd)
    }

    /// Effective home, or the working directory when there is none
    fn required_home(&self) -> PathBuf {
        self.home_dir().unwrap_or_else(|| normalize_lexically(self.cwd))
    }

    /// Active non-default profile name
    pub fn profile_name(&self) -> Option<&str> {
        let raw = self.profile.or_else(|| self.env.get(PROFILE_ENV));
        profile_suffix(raw)
    }

    /// Expand a leading `~` and make absolute. Windows absolute paths are kept as given.
    pub fn resolve_user_path(&self, input: &str) -> PathBuf {
        let trimmed = input.trim();
        if trimmed.starts_with('~') {
            let expanded = expand_tilde(trimmed, &self.required_home());
            return absolutize(&expanded, self.cwd);
        }
        absolutize(trimmed, self.cwd)
    }
}

/// All resolved locations for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPaths {
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub oauth_dir: PathBuf,
    pub oauth_path: PathBuf,
    pub workspace_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub gateway_pid_path: PathBuf,
    pub gateway_port_path: PathBuf,
    pub gateway_token_path: PathBuf,
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve the state directory.
///
/// An explicit OPENSOUL_STATE_DIR wins completely; profile suffixing does not
/// apply on top of it.
pub fn resolve_state_dir(inputs: &PathInputs) -> PathBuf {
    if let Some(over) = inputs.env.get(STATE_DIR_ENV) {
        return inputs.resolve_user_path(over);
    }

    let home = inputs.required_home();
    if let Some(profile) = inputs.profile_name() {
        return home.join(format!("{}-{}", STATE_DIRNAME, profile));
    }

    let current = home.join(STATE_DIRNAME);
    if inputs.fs.dir_exists(&current) {
        return current;
    }
    log::debug!("{:?} not found, using legacy state dir", current);
    home.join(LEGACY_STATE_DIRNAME)
}

/// Ordered, de-duplicated list of config files to search when no override applies
pub fn resolve_default_config_candidates(inputs: &PathInputs) -> Vec<PathBuf> {
    if let Some(explicit) = explicit_config_path(inputs) {
        return vec![explicit];
    }

    let mut dirs = Vec::new();
    if let Some(over) = inputs.env.get(STATE_DIR_ENV) {
        dirs.push(inputs.resolve_user_path(over));
    }
    let home = inputs.required_home();
    dirs.push(home.join(STATE_DIRNAME));
    dirs.push(home.join(LEGACY_STATE_DIRNAME));

    let mut candidates: Vec<PathBuf> = Vec::new();
    for dir in &dirs {
        for name in [CONFIG_FILENAME, LEGACY_CONFIG_FILENAME] {
            let candidate = dir.join(name);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

/// Resolve the config file path.
///
/// OPENSOUL_CONFIG_PATH is used as given apart from `~` expansion. A state
/// override or profile derives `<state dir>/opensoul.json` without searching.
/// Otherwise the first existing default candidate wins, and when none exist the
/// highest-priority candidate is returned as the creation target.
pub fn resolve_config_path(inputs: &PathInputs) -> PathBuf {
    if let Some(explicit) = explicit_config_path(inputs) {
        return explicit;
    }

    if inputs.env.is_set(STATE_DIR_ENV) || inputs.profile_name().is_some() {
        return resolve_state_dir(inputs).join(CONFIG_FILENAME);
    }

    let candidates = resolve_default_config_candidates(inputs);
    if let Some(existing) = candidates.iter().find(|c| inputs.fs.file_exists(c)) {
        return existing.clone();
    }
    candidates
        .into_iter()
        .next()
        .unwrap_or_else(|| inputs.required_home().join(STATE_DIRNAME).join(CONFIG_FILENAME))
}

/// OPENSOUL_CONFIG_PATH as given, with only `~` expanded
fn explicit_config_path(inputs: &PathInputs) -> Option<PathBuf> {
    let over = inputs.env.get(CONFIG_PATH_ENV)?;
    if over.starts_with('~') {
        return Some(PathBuf::from(expand_tilde(over, &inputs.required_home())));
    }
    Some(PathBuf::from(over))
}

/// OPENSOUL_OAUTH_DIR, independent of any state override, else `<state>/credentials`
pub fn resolve_oauth_dir(inputs: &PathInputs) -> PathBuf {
    match inputs.env.get(OAUTH_DIR_ENV) {
        Some(over) => inputs.resolve_user_path(over),
        None => resolve_state_dir(inputs).join(OAUTH_DIRNAME),
    }
}

pub fn resolve_oauth_path(inputs: &PathInputs) -> PathBuf {
    resolve_oauth_dir(inputs).join(OAUTH_FILENAME)
}

pub fn resolve_paths(inputs: &PathInputs) -> ResolvedPaths {
    let state_dir = resolve_state_dir(inputs);
    let oauth_dir = resolve_oauth_dir(inputs);
    ResolvedPaths {
        config_path: resolve_config_path(inputs),
        oauth_path: oauth_dir.join(OAUTH_FILENAME),
        oauth_dir,
        workspace_dir: state_dir.join(WORKSPACE_DIRNAME),
        logs_dir: state_dir.join(LOGS_DIRNAME),
        gateway_pid_path: state_dir.join(GATEWAY_PID_FILENAME),
        gateway_port_path: state_dir.join(GATEWAY_PORT_FILENAME),
        gateway_token_path: state_dir.join(GATEWAY_TOKEN_FILENAME),
        state_dir,
    }
}

/// Daemon-side state dir: environment only, no filesystem probe, no legacy fallback.
pub fn resolve_gateway_state_dir(env: &EnvSnapshot, cwd: &Path) -> Result<PathBuf, PathError> {
    if let Some(over) = env.get(STATE_DIR_ENV) {
        if over.starts_with('~') {
            let home = env_home(env).ok_or(PathError::HomeUnavailable)?;
            return Ok(absolutize(&expand_tilde(over, &home), cwd));
        }
        return Ok(absolutize(over, cwd));
    }

    let home = env_home(env).ok_or(PathError::HomeUnavailable)?;
    let dirname = match profile_suffix(env.get(PROFILE_ENV)) {
        Some(profile) => format!("{}-{}", STATE_DIRNAME, profile),
        None => STATE_DIRNAME.to_string(),
    };
    Ok(home.join(dirname))
}

// ============================================================================
// HELPERS
// ============================================================================

/// OPENSOUL_HOME > HOME > USERPROFILE > provider
pub fn effective_home(
    env: &EnvSnapshot,
    provider: &dyn Fn() -> Option<PathBuf>,
    cwd: &Path,
) -> Option<PathBuf> {
    let os_home = || env_home(env).or_else(provider);

    if let Some(explicit) = env.get(HOME_ENV) {
        if explicit.starts_with('~') {
            let base = os_home()?;
            return Some(absolutize(&expand_tilde(explicit, &base), cwd));
        }
        return Some(absolutize(explicit, cwd));
    }
    os_home().map(|home| {
        let raw = home.to_string_lossy();
        absolutize(&raw, cwd)
    })
}

fn env_home(env: &EnvSnapshot) -> Option<PathBuf> {
    env.get("HOME")
        .or_else(|| env.get("USERPROFILE"))
        .map(PathBuf::from)
}

/// Trimmed profile, `None` for unset, blank or "default" (any case)
fn profile_suffix(raw: Option<&str>) -> Option<&str> {
    let profile = raw?.trim();
    if profile.is_empty() || profile.eq_ignore_ascii_case("default") {
        return None;
    }
    Some(profile)
}

/// `~`, `~/x` -> home-relative. Other inputs are returned unchanged.
fn expand_tilde(input: &str, home: &Path) -> String {
    let home = home.to_string_lossy().into_owned();
    if let Some(rest) = input.strip_prefix("~\\") {
        return format!("{}\\{}", home, rest);
    }
    shellexpand::tilde_with_context(input, || Some(home.clone())).into_owned()
}

/// `C:\x`, `C:/x` or `\\server\share`
pub fn is_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        return true;
    }
    path.starts_with("\\\\")
}

/// Join onto `cwd` when relative and collapse `.` / `..`.
/// Windows absolute paths pass through untouched so drive letters survive on any host.
fn absolutize(path: &str, cwd: &Path) -> PathBuf {
    if is_windows_absolute(path) {
        return PathBuf::from(path);
    }
    normalize_lexically(&cwd.join(path))
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
