// src/checker/noreply.rs
// =============================================================================
// This module decides whether a commit email is a GitHub noreply address
// that belongs to a given user.
//
// GitHub synthesizes two formats:
// - <login>@users.noreply.github.com            (older accounts)
// - <numeric id>+<login>@users.noreply.github.com (current format)
//
// Either one binds the address to exactly one account, which is what makes
// it safe to print as a Co-authored-by trailer. Anything else (a personal
// address, a company address, someone else's noreply) is rejected.
//
// Rust concepts:
// - Lazy statics: compile the regex once, on first use
// - Named capture groups: pull the login and domain out of the match
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

// local part: optional "<digits>+" prefix, then the login
static NOREPLY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+\+)?(?P<login>[^@+\s]+)@(?P<domain>[^@\s]+)$")
        .expect("noreply pattern is a valid regex")
});

// Checks that `email` is the noreply address of `login` under `domain`
//
// Parameters:
//   email: the author email found on the commit
//   login: the account the commit was looked up for
//   domain: the noreply domain (users.noreply.github.com in production)
//
// Logins and domains are compared case-insensitively, like GitHub does.
pub fn is_noreply_for(email: &str, login: &str, domain: &str) -> bool {
    let Some(captures) = NOREPLY_PATTERN.captures(email.trim()) else {
        return false;
    };

    captures["login"].eq_ignore_ascii_case(login) && captures["domain"].eq_ignore_ascii_case(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "users.noreply.github.com";

    #[test]
    fn test_accepts_id_plus_login() {
        assert!(is_noreply_for("12345+octocat@users.noreply.github.com", "octocat", DOMAIN));
    }

    #[test]
    fn test_accepts_legacy_login_only() {
        assert!(is_noreply_for("octocat@users.noreply.github.com", "octocat", DOMAIN));
    }

    #[test]
    fn test_login_comparison_ignores_case() {
        assert!(is_noreply_for("1+OctoCat@Users.Noreply.GitHub.com", "octocat", DOMAIN));
    }

    #[test]
    fn test_rejects_personal_address() {
        assert!(!is_noreply_for("octocat@gmail.com", "octocat", DOMAIN));
    }

    #[test]
    fn test_rejects_someone_elses_noreply() {
        assert!(!is_noreply_for("1+hubot@users.noreply.github.com", "octocat", DOMAIN));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(!is_noreply_for("", "octocat", DOMAIN));
        assert!(!is_noreply_for("octocat", "octocat", DOMAIN));
        assert!(!is_noreply_for("abc+octocat@users.noreply.github.com", "octocat", DOMAIN));
    }
}
