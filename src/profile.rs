// OpenSoul Gate - Profiles
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Named profiles keep isolated state side by side (~/.opensoul-dev, ...).
// Profile flags are stripped from argv before subcommand parsing, then
// folded into the environment snapshot so path resolution sees them as
// ordinary overrides. Explicit environment values are never overwritten.

use crate::env::{EnvSnapshot, CONFIG_PATH_ENV, GATEWAY_PORT_ENV, PROFILE_ENV, STATE_DIR_ENV};
use crate::paths::{self, CONFIG_FILENAME, STATE_DIRNAME};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Gateway port the dev profile listens on unless told otherwise
pub const DEV_GATEWAY_PORT: u16 = 19001;

static PROFILE_NAME_RE: OnceLock<Regex> = OnceLock::new();
static CLI_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
static PROFILE_FLAG_RE: OnceLock<Regex> = OnceLock::new();
static DEV_FLAG_RE: OnceLock<Regex> = OnceLock::new();

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static profile pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("Cannot combine --dev with --profile")]
    DevWithProfile,
    #[error("--profile requires a value")]
    MissingValue,
    #[error("Invalid --profile '{0}' (use letters, numbers, \"_\", \"-\" only)")]
    InvalidName(String),
}

/// argv with profile flags removed, plus the profile they selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileArgs {
    pub profile: Option<String>,
    pub argv: Vec<String>,
}

pub fn is_valid_profile_name(name: &str) -> bool {
    cached(&PROFILE_NAME_RE, r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").is_match(name)
}

/// Trimmed profile name, `None` for blank, "default" (any case) or invalid names
pub fn normalize_profile_name(raw: Option<&str>) -> Option<String> {
    let profile = raw?.trim();
    if profile.is_empty() || profile.eq_ignore_ascii_case("default") {
        return None;
    }
    if !is_valid_profile_name(profile) {
        return None;
    }
    Some(profile.to_string())
}

/// Strip global `--dev` / `--profile <name>` flags appearing before the first
/// subcommand or `--`. Anything after that point is left alone.
///
/// `argv[0]` is the program name.
pub fn parse_profile_args(argv: Vec<String>) -> Result<ProfileArgs, ProfileError> {
    let mut args = argv.into_iter();
    let mut out: Vec<String> = args.next().into_iter().collect();
    let mut profile: Option<String> = None;
    let mut saw_dev = false;
    let mut saw_command = false;

    while let Some(arg) = args.next() {
        if saw_command {
            out.push(arg);
            continue;
        }

        if arg == "--" {
            saw_command = true;
            out.push(arg);
            continue;
        }

        if arg == "--dev" {
            if profile.as_deref().is_some_and(|p| p != "dev") {
                return Err(ProfileError::DevWithProfile);
            }
            saw_dev = true;
            profile = Some("dev".to_string());
            continue;
        }

        if arg == "--profile" || arg.starts_with("--profile=") {
            if saw_dev {
                return Err(ProfileError::DevWithProfile);
            }
            let value = match arg.split_once('=') {
                Some((_, inline)) => inline.trim().to_string(),
                None => args.next().map(|v| v.trim().to_string()).unwrap_or_default(),
            };
            if value.is_empty() {
                return Err(ProfileError::MissingValue);
            }
            if !is_valid_profile_name(&value) {
                return Err(ProfileError::InvalidName(value));
            }
            profile = Some(value);
            continue;
        }

        if !arg.starts_with('-') {
            saw_command = true;
        }
        out.push(arg);
    }

    Ok(ProfileArgs { profile, argv: out })
}

/// Fold a selected profile into the environment.
///
/// Sets OPENSOUL_PROFILE, then fills OPENSOUL_STATE_DIR, OPENSOUL_CONFIG_PATH
/// and (for `dev`) OPENSOUL_GATEWAY_PORT when they are not already set.
pub fn apply_profile_env(
    profile: &str,
    env: &mut EnvSnapshot,
    home: &dyn Fn() -> Option<PathBuf>,
    cwd: &Path,
) {
    let profile = profile.trim();
    if profile.is_empty() {
        return;
    }
    env.set(PROFILE_ENV, profile);

    let state_dir = match env.get(STATE_DIR_ENV) {
        Some(existing) => PathBuf::from(existing),
        None => {
            let home = paths::effective_home(env, home, cwd).unwrap_or_else(|| cwd.to_path_buf());
            let dirname = if profile.eq_ignore_ascii_case("default") {
                STATE_DIRNAME.to_string()
            } else {
                format!("{}-{}", STATE_DIRNAME, profile)
            };
            let dir = home.join(dirname);
            env.set(STATE_DIR_ENV, dir.to_string_lossy());
            dir
        }
    };

    env.set_default(CONFIG_PATH_ENV, state_dir.join(CONFIG_FILENAME).to_string_lossy());

    if profile == "dev" {
        env.set_default(GATEWAY_PORT_ENV, DEV_GATEWAY_PORT.to_string());
    }
    log::debug!("profile '{}' applied: state dir {:?}", profile, state_dir);
}

/// Insert `--profile <name>` into an `opensoul ...` command line so hints shown
/// to the user keep pointing at the active profile.
pub fn format_cli_command(command: &str, env: &EnvSnapshot) -> String {
    let profile = match normalize_profile_name(env.get(PROFILE_ENV)) {
        Some(p) => p,
        None => return command.to_string(),
    };
    let prefix = cached(&CLI_PREFIX_RE, r"^((?:(?:pnpm|npm|bunx|npx)\s+)?opensoul)(\s|$)");
    if !prefix.is_match(command) {
        return command.to_string();
    }
    if cached(&PROFILE_FLAG_RE, r"(?:^|\s)--profile(?:\s|=|$)").is_match(command)
        || cached(&DEV_FLAG_RE, r"(?:^|\s)--dev(?:\s|$)").is_match(command)
    {
        return command.to_string();
    }
    prefix
        .replace(command, |caps: &regex::Captures| {
            format!("{} --profile {}{}", &caps[1], profile, &caps[2])
        })
        .into_owned()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn env_of(pairs: &[(&str, &str)]) -> EnvSnapshot {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn home_peter() -> Option<PathBuf> {
        Some(PathBuf::from("/home/peter"))
    }

    // === ARGV ===

    #[test]
    fn leaves_subcommand_dev_flag_alone() {
        let res = parse_profile_args(argv(&["opensoul", "gateway", "--dev", "--allow-unconfigured"])).unwrap();
        assert_eq!(res.profile, None);
        assert_eq!(res.argv, argv(&["opensoul", "gateway", "--dev", "--allow-unconfigured"]));
    }

    #[test]
    fn stops_at_double_dash() {
        let res = parse_profile_args(argv(&["opensoul-gate", "--", "--dev"])).unwrap();
        assert_eq!(res.profile, None);
        assert_eq!(res.argv, argv(&["opensoul-gate", "--", "--dev"]));

        let res = parse_profile_args(argv(&["opensoul-gate", "--profile", "work", "--", "--profile", "x"])).unwrap();
        assert_eq!(res.profile.as_deref(), Some("work"));
        assert_eq!(res.argv, argv(&["opensoul-gate", "--", "--profile", "x"]));
    }

    #[test]
    fn accepts_global_dev_before_subcommand() {
        let res = parse_profile_args(argv(&["opensoul", "--dev", "gateway"])).unwrap();
        assert_eq!(res.profile.as_deref(), Some("dev"));
        assert_eq!(res.argv, argv(&["opensoul", "gateway"]));
    }

    #[test]
    fn parses_and_strips_profile_value() {
        let res = parse_profile_args(argv(&["opensoul", "--profile", "work", "status"])).unwrap();
        assert_eq!(res.profile.as_deref(), Some("work"));
        assert_eq!(res.argv, argv(&["opensoul", "status"]));

        let res = parse_profile_args(argv(&["opensoul", "--profile=work", "status"])).unwrap();
        assert_eq!(res.profile.as_deref(), Some("work"));
    }

    #[test]
    fn rejects_missing_or_invalid_profile_value() {
        assert_eq!(
            parse_profile_args(argv(&["opensoul", "--profile"])),
            Err(ProfileError::MissingValue)
        );
        assert_eq!(
            parse_profile_args(argv(&["opensoul", "--profile", "bad profile"])),
            Err(ProfileError::InvalidName("bad profile".to_string()))
        );
    }

    #[test]
    fn rejects_dev_combined_with_profile() {
        assert_eq!(
            parse_profile_args(argv(&["opensoul", "--dev", "--profile", "work", "status"])),
            Err(ProfileError::DevWithProfile)
        );
        assert_eq!(
            parse_profile_args(argv(&["opensoul", "--profile", "work", "--dev", "status"])),
            Err(ProfileError::DevWithProfile)
        );
    }

    // === ENV ===

    #[test]
    fn fills_env_defaults_for_dev_profile() {
        let mut env = EnvSnapshot::new();
        apply_profile_env("dev", &mut env, &home_peter, Path::new("/"));

        let state_dir = PathBuf::from("/home/peter").join(".opensoul-dev");
        assert_eq!(env.get(PROFILE_ENV), Some("dev"));
        assert_eq!(env.get(STATE_DIR_ENV).map(PathBuf::from), Some(state_dir.clone()));
        assert_eq!(env.get(CONFIG_PATH_ENV).map(PathBuf::from), Some(state_dir.join("opensoul.json")));
        assert_eq!(env.get(GATEWAY_PORT_ENV), Some("19001"));
    }

    #[test]
    fn does_not_override_explicit_env_values() {
        let mut env = env_of(&[(STATE_DIR_ENV, "/custom"), (GATEWAY_PORT_ENV, "19099")]);
        apply_profile_env("dev", &mut env, &home_peter, Path::new("/"));

        assert_eq!(env.get(STATE_DIR_ENV), Some("/custom"));
        assert_eq!(env.get(GATEWAY_PORT_ENV), Some("19099"));
        assert_eq!(
            env.get(CONFIG_PATH_ENV).map(PathBuf::from),
            Some(PathBuf::from("/custom").join("opensoul.json"))
        );
    }

    #[test]
    fn non_dev_profile_leaves_port_unset() {
        let mut env = EnvSnapshot::new();
        apply_profile_env("work", &mut env, &home_peter, Path::new("/"));
        assert_eq!(env.get(GATEWAY_PORT_ENV), None);
        assert_eq!(
            env.get(STATE_DIR_ENV).map(PathBuf::from),
            Some(PathBuf::from("/home/peter").join(".opensoul-work"))
        );
    }

    // === COMMAND FORMATTING ===

    #[test]
    fn command_unchanged_without_usable_profile() {
        let cmd = "opensoul doctor --fix";
        assert_eq!(format_cli_command(cmd, &EnvSnapshot::new()), cmd);
        assert_eq!(format_cli_command(cmd, &env_of(&[(PROFILE_ENV, "default")])), cmd);
        assert_eq!(format_cli_command(cmd, &env_of(&[(PROFILE_ENV, "Default")])), cmd);
        assert_eq!(format_cli_command(cmd, &env_of(&[(PROFILE_ENV, "bad profile")])), cmd);
    }

    #[test]
    fn command_unchanged_when_flag_present() {
        let env = env_of(&[(PROFILE_ENV, "work")]);
        assert_eq!(
            format_cli_command("opensoul --profile work doctor --fix", &env),
            "opensoul --profile work doctor --fix"
        );
        let env = env_of(&[(PROFILE_ENV, "dev")]);
        assert_eq!(format_cli_command("opensoul --dev doctor", &env), "opensoul --dev doctor");
    }

    #[test]
    fn inserts_profile_flag() {
        let env = env_of(&[(PROFILE_ENV, "work")]);
        assert_eq!(
            format_cli_command("opensoul doctor --fix", &env),
            "opensoul --profile work doctor --fix"
        );
        assert_eq!(
            format_cli_command("pnpm opensoul doctor", &env),
            "pnpm opensoul --profile work doctor"
        );
        assert_eq!(
            format_cli_command("opensoul", &env_of(&[(PROFILE_ENV, "test")])),
            "opensoul --profile test"
        );
        assert_eq!(
            format_cli_command("opensoul doctor --fix", &env_of(&[(PROFILE_ENV, "  jbopensoul  ")])),
            "opensoul --profile jbopensoul doctor --fix"
        );
    }

    #[test]
    fn ignores_other_programs() {
        let env = env_of(&[(PROFILE_ENV, "work")]);
        assert_eq!(format_cli_command("git status", &env), "git status");
        assert_eq!(format_cli_command("opensoulx run", &env), "opensoulx run");
        assert_eq!(format_cli_command("opensoul-gate status", &env), "opensoul-gate status");
        assert_eq!(format_cli_command("npx opensoul-gate paths", &env), "npx opensoul-gate paths");
    }

    #[test]
    fn profile_name_validation() {
        assert!(is_valid_profile_name("dev"));
        assert!(is_valid_profile_name("Work_2-b"));
        assert!(!is_valid_profile_name("-dev"));
        assert!(!is_valid_profile_name("bad profile"));
        assert!(!is_valid_profile_name(&"a".repeat(65)));
        assert_eq!(normalize_profile_name(Some("  work ")), Some("work".to_string()));
        assert_eq!(normalize_profile_name(Some("DEFAULT")), None);
    }
}
