//! Layered configuration loading and property group binding.
//!
//! One load operation runs strictly in sequence: synthesize every registered
//! group's default document into the settings tree, merge each active profile
//! found on the search paths, compute per-group subtrees (deep search plus
//! list reconciliation), then bind each group in registration order. The tree
//! is build-once, read-many; bound groups are immutable afterwards.

mod decode;
mod merge;
mod normalize;
mod profiles;
mod tree;


pub use profiles::ConfigFormat;

pub(crate) use decode::decode_subtree;
pub(crate) use merge::nested_document;

use crate::error::ConfigError;
use crate::props::{BoundProperties, Registration};
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use tree::SettingsTree;

/// Options the loader is constructed with.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Profile names merged in order; later profiles win.
    pub active_profiles: Vec<String>,
    /// Filesystem search paths probed in order for each profile.
    pub config_paths: Vec<PathBuf>,
    /// File format of profile documents.
    pub config_format: ConfigFormat,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            active_profiles: vec!["default".to_string()],
            config_paths: vec![PathBuf::from("config")],
            config_format: ConfigFormat::Yaml,
        }
    }
}

/// One-shot configuration loader.
///
/// Construction merges every source into the settings tree and resolves each
/// registered group's subtree; [`Loader::bind`] then consumes the loader and
/// produces the bound groups. Loading is single-threaded and fail-fast, with
/// no retry of filesystem reads.
#[derive(Debug)]
pub struct Loader {
    registrations: Vec<Registration>,
    subtrees: HashMap<&'static str, Value>,
}

impl Loader {
    /// Build the settings tree and resolve per-group subtrees.
    ///
    /// Merges, in increasing priority: each registration's default document,
    /// then each active profile in listed order. Environment variables apply
    /// lazily during subtree reconciliation and need no merge step.
    pub fn new(
        options: LoaderOptions,
        registrations: Vec<Registration>,
    ) -> Result<Self, ConfigError> {
        info!(
            "loading active profiles [{}] in paths [{}] with format {:?}",
            options.active_profiles.join(", "),
            profiles::display_paths(&options.config_paths),
            options.config_format,
        );

        let mut tree = SettingsTree::new();

        for registration in &registrations {
            let document =
                (registration.default_document)().map_err(|source| ConfigError::DefaultApplication {
                    group: registration.group.to_string(),
                    source,
                })?;
            tree.merge(document);
            debug!(
                "default values discovered for properties [{}]",
                registration.group
            );
        }

        for profile in &options.active_profiles {
            if let Some(document) =
                profiles::load_profile(profile, &options.config_paths, options.config_format)?
            {
                tree.merge(document);
                debug!("active profile [{profile}] merged");
            }
        }

        let mut subtrees = HashMap::new();
        for registration in &registrations {
            let raw = tree.deep_search(registration.prefix);
            let (corrected, changed) = normalize::reconcile(&tree, registration.prefix, &raw);
            subtrees.insert(registration.prefix, if changed { corrected } else { raw });
        }

        Ok(Self {
            registrations,
            subtrees,
        })
    }

    /// Bind every registered group in registration order, fail-fast.
    ///
    /// The first failing group aborts the call; groups after it are never
    /// bound. On success every group is decoded, its lifecycle hooks have
    /// run, and the returned collection is immutable.
    pub fn bind(self) -> Result<BoundProperties, ConfigError> {
        let mut bound = BoundProperties::default();
        for registration in &self.registrations {
            let empty = Value::Object(Map::new());
            let subtree = self.subtrees.get(registration.prefix).unwrap_or(&empty);
            let value = (registration.bind)(subtree)?;
            bound.insert(registration.type_id, value);
            debug!(
                "properties [{}] bound with prefix [{}]",
                registration.group, registration.prefix
            );
        }
        Ok(bound)
    }
}
