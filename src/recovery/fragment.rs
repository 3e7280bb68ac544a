//! Strict parsing of recovery-link URL fragments.
//!
//! Recovery links use a hash-in-hash shape forced by the portal's fragment
//! router:
//!
//! ```text
//! <origin>/#/alterar-senha#access_token=...&refresh_token=...&type=recovery
//! ```
//!
//! Classification is strict: the token part is parsed as a query string and
//! `type` must equal `recovery` with a non-empty `access_token`. Anything
//! that mentions recovery but fails strict parsing is still classified as a
//! malformed recovery attempt, never rendered as a normal page.

use std::collections::HashMap;

pub const RECOVERY_TYPE: &str = "recovery";

/// Result of classifying a URL fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentShape {
    /// No recovery marker at all; normal navigation.
    NotRecovery,
    /// Mentions recovery but is not a well-formed token fragment. Routed
    /// through validation so it resolves to an invalid-link notice.
    Malformed,
    /// Well-formed recovery token pair.
    Tokens {
        access_token: String,
        refresh_token: String,
    },
}

/// Classify a raw fragment (with or without the leading `#`).
#[must_use]
pub fn classify(fragment: &str) -> FragmentShape {
    let fragment = fragment.trim_start_matches('#');

    if !fragment.contains(RECOVERY_TYPE) {
        return FragmentShape::NotRecovery;
    }

    let pairs = parse_pairs(token_part(fragment));

    if pairs.get("type").map(String::as_str) != Some(RECOVERY_TYPE) {
        return FragmentShape::Malformed;
    }

    let access_token = pairs.get("access_token").cloned().unwrap_or_default();
    let refresh_token = pairs.get("refresh_token").cloned().unwrap_or_default();
    if access_token.is_empty() || refresh_token.is_empty() {
        return FragmentShape::Malformed;
    }

    FragmentShape::Tokens {
        access_token,
        refresh_token,
    }
}

/// The token portion of a possibly hash-in-hash fragment.
///
/// `/alterar-senha#access_token=...` arrives as one window fragment when the
/// router path itself lives in the hash; the tokens are everything after the
/// last inner `#`.
#[must_use]
pub fn token_part(fragment: &str) -> &str {
    fragment
        .rsplit_once('#')
        .map_or(fragment, |(_, tokens)| tokens)
}

fn parse_pairs(tokens: &str) -> HashMap<String, String> {
    tokens
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fragment_with_both_tokens_is_valid() {
        let shape = classify("#access_token=abc&refresh_token=def&type=recovery");
        assert_eq!(
            shape,
            FragmentShape::Tokens {
                access_token: "abc".to_string(),
                refresh_token: "def".to_string(),
            }
        );
    }

    #[test]
    fn hash_in_hash_fragment_is_valid() {
        let shape = classify("/alterar-senha#access_token=abc&refresh_token=def&type=recovery");
        assert_eq!(
            shape,
            FragmentShape::Tokens {
                access_token: "abc".to_string(),
                refresh_token: "def".to_string(),
            }
        );
    }

    #[test]
    fn fragment_without_recovery_marker_is_not_recovery() {
        assert_eq!(classify("#/dashboard"), FragmentShape::NotRecovery);
        assert_eq!(classify(""), FragmentShape::NotRecovery);
        assert_eq!(
            classify("#access_token=abc&refresh_token=def"),
            FragmentShape::NotRecovery
        );
    }

    #[test]
    fn recovery_substring_without_token_shape_is_malformed() {
        // Conservative bias: anything mentioning recovery goes through
        // validation instead of rendering as a normal page.
        assert_eq!(classify("#/curso/recovery-basics"), FragmentShape::Malformed);
        assert_eq!(classify("#type=recovery"), FragmentShape::Malformed);
    }

    #[test]
    fn missing_refresh_token_is_malformed() {
        assert_eq!(
            classify("#access_token=abc&type=recovery"),
            FragmentShape::Malformed
        );
    }

    #[test]
    fn empty_access_token_is_malformed() {
        assert_eq!(
            classify("#access_token=&refresh_token=def&type=recovery"),
            FragmentShape::Malformed
        );
    }

    #[test]
    fn wrong_type_value_is_malformed() {
        assert_eq!(
            classify("#access_token=abc&refresh_token=def&type=recovery2"),
            FragmentShape::Malformed
        );
    }

    #[test]
    fn token_part_takes_innermost_hash() {
        assert_eq!(
            token_part("/alterar-senha#access_token=a&type=recovery"),
            "access_token=a&type=recovery"
        );
        assert_eq!(token_part("access_token=a"), "access_token=a");
    }
}
