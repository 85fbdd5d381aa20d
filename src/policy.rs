//! Extension and filename-pattern security policies.
//!
//! Policies are allow/deny lists evaluated per item: the extension policy
//! applies to files only, the pattern policy to files and directories.
//! An unrecognized policy mode denies everything — fail closed, never open.

use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::path;

/// Whether membership in the restriction list grants or denies access.
///
/// Unknown strings deserialize to `Other`, which denies unconditionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyMode {
    AllowList,
    DisallowList,
    #[serde(other)]
    Other,
}

/// One policy: mode, case handling, and the restriction list
/// (extensions without dots, or glob patterns, depending on use).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConfig {
    pub policy: PolicyMode,
    pub ignore_case: bool,
    pub restrictions: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            policy: PolicyMode::DisallowList,
            ignore_case: true,
            restrictions: Vec::new(),
        }
    }
}

fn list_contains(policy: &PolicyConfig, value: &str) -> bool {
    if policy.ignore_case {
        let folded = value.to_lowercase();
        policy
            .restrictions
            .iter()
            .any(|entry| entry.to_lowercase() == folded)
    } else {
        policy.restrictions.iter().any(|entry| entry == value)
    }
}

fn pattern_matches(pattern: &str, name: &str, ignore_case: bool) -> bool {
    let options = MatchOptions {
        case_sensitive: !ignore_case,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    match Pattern::new(pattern) {
        Ok(compiled) => compiled.matches_with(name, options),
        Err(err) => {
            log::debug!("ignoring malformed pattern {pattern:?}: {err}");
            false
        }
    }
}

/// Extension policy check. Files without an extension have nothing to
/// match: denied under an allow list, permitted under a deny list.
pub fn is_allowed_extension(relative_path: &str, policy: &PolicyConfig) -> bool {
    let ext = path::extension(relative_path);
    match policy.policy {
        PolicyMode::AllowList => ext.is_some_and(|e| list_contains(policy, e)),
        PolicyMode::DisallowList => !ext.is_some_and(|e| list_contains(policy, e)),
        PolicyMode::Other => false,
    }
}

/// Pattern policy check against the path's basename. Any single pattern
/// match decides membership; list order does not matter.
pub fn is_allowed_pattern(relative_path: &str, policy: &PolicyConfig) -> bool {
    let name = path::basename(relative_path);
    let matched = policy
        .restrictions
        .iter()
        .any(|p| pattern_matches(p, name, policy.ignore_case));
    match policy.policy {
        PolicyMode::AllowList => matched,
        PolicyMode::DisallowList => !matched,
        PolicyMode::Other => false,
    }
}

/// Combined visibility rule: files must pass both policies, directories
/// only the pattern policy (extensions are meaningless for them).
pub fn is_unrestricted(
    relative_path: &str,
    is_directory: bool,
    extensions: &PolicyConfig,
    patterns: &PolicyConfig,
) -> bool {
    if !is_allowed_pattern(relative_path, patterns) {
        return false;
    }
    is_directory || is_allowed_extension(relative_path, extensions)
}

// ── External authorization guards ────────────────────────────────────────────

/// Caller-registered authorization callback, consulted with the absolute
/// path in addition to inferred permission bits.
pub type AccessGuard = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Optional read/write guards. Unset guards allow everything; a guard
/// returning `false` denies even when the permission bits say yes.
#[derive(Default)]
pub struct AccessGuards {
    read: Option<AccessGuard>,
    write: Option<AccessGuard>,
}

impl AccessGuards {
    pub fn set_read(&mut self, guard: AccessGuard) {
        self.read = Some(guard);
    }

    pub fn set_write(&mut self, guard: AccessGuard) {
        self.write = Some(guard);
    }

    pub fn allows_read(&self, absolute_path: &str) -> bool {
        self.read.as_ref().map_or(true, |g| g(absolute_path))
    }

    pub fn allows_write(&self, absolute_path: &str) -> bool {
        self.write.as_ref().map_or(true, |g| g(absolute_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(mode: PolicyMode, ignore_case: bool, list: &[&str]) -> PolicyConfig {
        PolicyConfig {
            policy: mode,
            ignore_case,
            restrictions: list.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn disallow_list_blocks_listed_extension_case_folded() {
        let p = policy(PolicyMode::DisallowList, true, &["exe", "bat"]);
        assert!(!is_allowed_extension("/dir/Setup.EXE", &p));
        assert!(is_allowed_extension("/dir/readme.txt", &p));
    }

    #[test]
    fn allow_list_requires_membership() {
        let p = policy(PolicyMode::AllowList, false, &["txt", "md"]);
        assert!(is_allowed_extension("/a/notes.txt", &p));
        assert!(!is_allowed_extension("/a/notes.TXT", &p));
        assert!(!is_allowed_extension("/a/binary.exe", &p));
        assert!(!is_allowed_extension("/a/no_extension", &p));
    }

    #[test]
    fn extensionless_file_passes_a_deny_list() {
        let p = policy(PolicyMode::DisallowList, true, &["exe"]);
        assert!(is_allowed_extension("/a/Makefile", &p));
    }

    #[test]
    fn unknown_mode_denies_everything() {
        let parsed: PolicyConfig = serde_json::from_str(
            r#"{"policy": "SOMETHING_NEW", "ignoreCase": true, "restrictions": []}"#,
        )
        .unwrap();
        assert_eq!(parsed.policy, PolicyMode::Other);
        assert!(!is_allowed_extension("/a/file.txt", &parsed));
        assert!(!is_allowed_pattern("/a/file.txt", &parsed));
    }

    #[test]
    fn pattern_deny_list_hides_dotfiles() {
        let p = policy(PolicyMode::DisallowList, false, &[".*"]);
        assert!(!is_allowed_pattern("/conf/.htaccess", &p));
        assert!(is_allowed_pattern("/conf/site.conf", &p));
    }

    #[test]
    fn pattern_match_folds_case_when_asked() {
        let p = policy(PolicyMode::DisallowList, true, &["*.BAK"]);
        assert!(!is_allowed_pattern("/x/data.bak", &p));
        let strict = policy(PolicyMode::DisallowList, false, &["*.BAK"]);
        assert!(is_allowed_pattern("/x/data.bak", &strict));
    }

    #[test]
    fn malformed_pattern_never_matches() {
        let p = policy(PolicyMode::AllowList, false, &["[unclosed"]);
        assert!(!is_allowed_pattern("/x/anything", &p));
    }

    #[test]
    fn unrestricted_combines_both_policies() {
        let ext = policy(PolicyMode::DisallowList, true, &["exe"]);
        let pat = policy(PolicyMode::DisallowList, false, &[".*"]);
        assert!(is_unrestricted("/docs/report.txt", false, &ext, &pat));
        assert!(!is_unrestricted("/docs/setup.exe", false, &ext, &pat));
        assert!(!is_unrestricted("/docs/.hidden", false, &ext, &pat));
        // Directories skip the extension policy entirely.
        assert!(is_unrestricted("/docs/setup.exe", true, &ext, &pat));
        assert!(!is_unrestricted("/docs/.git", true, &ext, &pat));
    }

    #[test]
    fn guards_default_open_and_deny_when_registered() {
        let mut guards = AccessGuards::default();
        assert!(guards.allows_read("/srv/x"));
        assert!(guards.allows_write("/srv/x"));
        guards.set_write(Box::new(|path| !path.ends_with(".lock")));
        assert!(guards.allows_write("/srv/x"));
        assert!(!guards.allows_write("/srv/x.lock"));
        assert!(guards.allows_read("/srv/x.lock"));
    }
}
