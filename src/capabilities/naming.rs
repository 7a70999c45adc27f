//! Name normalization and namespaced identifiers.
//!
//! `normalize` follows the same recipe as the tool-name sanitizer used for
//! LLM providers (split camelCase, lowercase, replace disallowed runs, trim),
//! but with `-` as the separator since MCP tool names are kebab-case.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static CAMEL_LOWER_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static CAMEL_UPPER_LOWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());
static DISALLOWED_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Separator used by [`namespaced_name`].
pub const NAMESPACE_SEPARATOR: char = '.';

/// Errors raised when building or validating identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// The identifier is empty.
    #[error("identifier must not be empty")]
    Empty,

    /// The identifier contains the namespace separator, which would make
    /// `prefix.agent.capability` ambiguous to split.
    #[error("identifier '{0}' must not contain '.'")]
    DottedIdentifier(String),
}

/// Normalize a human-readable name into a protocol-safe identifier.
///
/// Lowercases, splits camelCase, turns every run of characters outside
/// `[a-z0-9]` into a single `-`, and trims leading/trailing separators.
/// `normalize(normalize(x)) == normalize(x)` for every `x`: the output
/// has no uppercase letters, so the camelCase split never fires twice.
///
/// ```
/// use ossa_bridge::capabilities::normalize;
/// assert_eq!(normalize("Test Capability With Spaces"), "test-capability-with-spaces");
/// assert_eq!(normalize("fetchUserData"), "fetch-user-data");
/// assert_eq!(normalize("__web  search__"), "web-search");
/// ```
pub fn normalize(name: &str) -> String {
    let split = CAMEL_UPPER_LOWER.replace_all(name, "${1}-${2}");
    let split = CAMEL_LOWER_UPPER.replace_all(&split, "${1}-${2}");
    let lowered = split.to_lowercase();
    let replaced = DISALLOWED_RUN.replace_all(&lowered, "-");
    replaced.trim_matches('-').to_string()
}

/// Check that an identifier can take part in a namespaced name.
pub fn validate_identifier(id: &str) -> Result<(), NamingError> {
    if id.is_empty() {
        return Err(NamingError::Empty);
    }
    if id.contains(NAMESPACE_SEPARATOR) {
        return Err(NamingError::DottedIdentifier(id.to_string()));
    }
    Ok(())
}

/// Build `"<prefix>.<agent_id>.<capability_id>"`.
///
/// Dots are forbidden in both identifiers so the result can always be
/// split back by [`split_namespaced`].
pub fn namespaced_name(
    prefix: &str,
    agent_id: &str,
    capability_id: &str,
) -> Result<String, NamingError> {
    validate_identifier(agent_id)?;
    validate_identifier(capability_id)?;
    Ok(format!("{prefix}{NAMESPACE_SEPARATOR}{agent_id}{NAMESPACE_SEPARATOR}{capability_id}"))
}

/// Recover `(agent_id, capability_id)` from a namespaced name.
///
/// Returns `None` when the name does not start with `prefix.` or does not
/// have exactly two dot-free segments after it.
pub fn split_namespaced<'a>(prefix: &str, name: &'a str) -> Option<(&'a str, &'a str)> {
    let rest = name.strip_prefix(prefix)?.strip_prefix(NAMESPACE_SEPARATOR)?;
    let (agent, capability) = rest.split_once(NAMESPACE_SEPARATOR)?;
    if agent.is_empty() || capability.is_empty() || capability.contains(NAMESPACE_SEPARATOR) {
        return None;
    }
    Some((agent, capability))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize("Test Capability With Spaces"), "test-capability-with-spaces");
        assert_eq!(normalize("web_search"), "web-search");
        assert_eq!(normalize("  Already--kebab  "), "already-kebab");
        assert_eq!(normalize("HTTPRequest"), "http-request");
        assert_eq!(normalize("getHTTPResponse2xx"), "get-http-response2xx");
        assert_eq!(normalize("résumé parser"), "r-sum-parser");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Test Capability With Spaces",
            "fetchUserData",
            "ABCDef",
            "a__b--c  d",
            "-leading and trailing-",
            "MixedCASE_with.dots/and\\slashes",
            "日本語 tool",
            "x",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_namespaced_round_trip() {
        let name = namespaced_name("ossa", "research-agent", "web-search").unwrap();
        assert_eq!(name, "ossa.research-agent.web-search");
        assert_eq!(split_namespaced("ossa", &name), Some(("research-agent", "web-search")));
    }

    #[test]
    fn test_namespaced_rejects_dots() {
        assert_eq!(
            namespaced_name("ossa", "agent.v2", "search"),
            Err(NamingError::DottedIdentifier("agent.v2".to_string()))
        );
        assert_eq!(namespaced_name("ossa", "agent", ""), Err(NamingError::Empty));
    }

    #[test]
    fn test_split_namespaced_rejects_foreign_names() {
        assert_eq!(split_namespaced("ossa", "mcp.agent.tool"), None);
        assert_eq!(split_namespaced("ossa", "ossa.agent"), None);
        assert_eq!(split_namespaced("ossa", "ossa.a.b.c"), None);
        assert_eq!(split_namespaced("ossa", "ossaa.a.b"), None);
    }
}
