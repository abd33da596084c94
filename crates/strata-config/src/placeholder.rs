//! Environment placeholder substitution for bound values.

use crate::ConfigError;
use std::borrow::Cow;
use std::env;

/// Resolve a `${NAME}` placeholder against the process environment.
///
/// A value of the exact form `${NAME}` is replaced by the value of the
/// environment variable `NAME`; an unset variable is a hard error. Any other
/// string is returned unchanged. Intended to be called from a property
/// group's post-binding hook, once concrete values are available.
pub fn resolve_placeholder(value: &str) -> Result<Cow<'_, str>, ConfigError> {
    let Some(name) = value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Ok(Cow::Borrowed(value));
    };
    if name.is_empty() {
        return Err(ConfigError::InvalidPlaceholder {
            value: value.to_string(),
        });
    }
    match env::var(name) {
        Ok(resolved) => Ok(Cow::Owned(resolved)),
        Err(_) => Err(ConfigError::PlaceholderUnresolved {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_env::with_env;

    #[test]
    fn plain_strings_pass_through() {
        assert_eq!(resolve_placeholder("plain").unwrap(), "plain");
        assert_eq!(resolve_placeholder("${open").unwrap(), "${open");
        assert_eq!(resolve_placeholder("close}").unwrap(), "close}");
    }

    #[test]
    fn resolves_from_environment() {
        with_env(&[("STRATA_PLACEHOLDER_SECRET", "abc123")], || {
            let resolved = resolve_placeholder("${STRATA_PLACEHOLDER_SECRET}").unwrap();
            assert_eq!(resolved, "abc123");
        });
    }

    #[test]
    fn unset_variable_is_an_error() {
        let err = resolve_placeholder("${STRATA_PLACEHOLDER_UNSET}").unwrap_err();
        assert!(matches!(err, ConfigError::PlaceholderUnresolved { name } if name == "STRATA_PLACEHOLDER_UNSET"));
    }

    #[test]
    fn empty_name_is_invalid() {
        let err = resolve_placeholder("${}").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPlaceholder { .. }));
    }
}
