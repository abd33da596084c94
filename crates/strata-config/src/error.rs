//! Error types for config loading and binding.

use thiserror::Error;

/// Boxed error reported by a property group's own lifecycle hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned while loading configuration or binding property groups.
///
/// Every variant is fatal to the enclosing load; nothing is retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Deriving the default document for a property group failed.
    #[error("failed to apply defaults for properties [{group}]: {source}")]
    DefaultApplication {
        group: String,
        source: serde_json::Error,
    },
    /// Reading or parsing an active profile failed. A missing profile file
    /// is not an error and never produces this variant.
    #[error("failed to load profile [{profile}] in paths [{paths}]: {source}")]
    ProfileLoad {
        profile: String,
        paths: String,
        source: HookError,
    },
    /// Decoding a group's subtree into its typed shape failed.
    #[error("failed to bind config prefix [{prefix}] to [{group}] at key [{key}]: {message}")]
    BindDecode {
        group: String,
        prefix: String,
        key: String,
        message: String,
    },
    /// A group's pre-binding hook failed.
    #[error("pre-binding failed for properties [{group}]: {source}")]
    PreBind { group: String, source: HookError },
    /// A group's post-binding hook failed.
    #[error("post-binding failed for properties [{group}]: {source}")]
    PostBind { group: String, source: HookError },
    /// A `${NAME}` placeholder referenced an environment variable that is not set.
    #[error("mandatory environment variable [{name}] is not set")]
    PlaceholderUnresolved { name: String },
    /// A placeholder had the `${}` form with an empty name.
    #[error("invalid config placeholder, expected ${{NAME}}, got [{value}]")]
    InvalidPlaceholder { value: String },
}

impl ConfigError {
    /// Unwrap hook errors that already are `ConfigError`, wrapping the rest.
    pub(crate) fn from_hook(err: HookError, wrap: impl FnOnce(HookError) -> Self) -> Self {
        match err.downcast::<ConfigError>() {
            Ok(config_err) => *config_err,
            Err(err) => wrap(err),
        }
    }
}
