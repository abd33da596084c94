//! Property group traits and registration descriptors.

use crate::error::{ConfigError, HookError};
use crate::loader::{decode_subtree, nested_document};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

/// A named, strongly-typed configuration unit bound from a subtree of the
/// settings tree.
///
/// The `Default` impl declares the group's per-field defaults; they seed the
/// lowest-priority layer of the settings tree, so every default key is
/// discoverable and overridable by profiles and environment variables.
///
/// `pre_binding` and `post_binding` form the optional lifecycle capability
/// set. Both default to no-ops; a group overrides them to participate. The
/// post-binding hook is the usual place to resolve `${NAME}` placeholders via
/// [`crate::resolve_placeholder`] once concrete values are available.
pub trait Properties: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Dot-delimited namespace of this group's subtree, e.g. `"app.datasource"`.
    fn prefix() -> &'static str;

    /// Invoked immediately before decode. Failure aborts the whole load.
    ///
    /// Runs on a freshly defaulted instance that decode then replaces: field
    /// state written here does not survive into the bound value. The hook is
    /// for validation and environment preparation, not for seeding fields;
    /// declare field values through `Default` instead.
    fn pre_binding(&mut self) -> Result<(), HookError> {
        Ok(())
    }

    /// Invoked on the decoded value. Failure aborts the whole load.
    fn post_binding(&mut self) -> Result<(), HookError> {
        Ok(())
    }
}

/// Type-erased descriptor for one registered property group.
///
/// Captures everything the loader needs without holding an instance: the
/// prefix, a constructor for the group's default document, and a bind
/// function running the full lifecycle. All of it is monomorphized at
/// registration, so the loader itself never inspects types.
pub struct Registration {
    pub(crate) prefix: &'static str,
    pub(crate) group: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) default_document: fn() -> Result<Value, serde_json::Error>,
    pub(crate) bind: fn(&Value) -> Result<Arc<dyn Any + Send + Sync>, ConfigError>,
}

impl Registration {
    /// Describe a property group type for registration with the loader.
    pub fn of<T: Properties>() -> Self {
        Self {
            prefix: T::prefix(),
            group: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            default_document: default_document::<T>,
            bind: bind_group::<T>,
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("prefix", &self.prefix)
            .field("group", &self.group)
            .finish()
    }
}

/// Serialize the group's declared defaults and nest them under its prefix.
fn default_document<T: Properties>() -> Result<Value, serde_json::Error> {
    let defaults = serde_json::to_value(T::default())?;
    Ok(nested_document(T::prefix(), defaults))
}

/// Run one group's bind lifecycle: pre-binding, weak-typed decode, post-binding.
fn bind_group<T: Properties>(subtree: &Value) -> Result<Arc<dyn Any + Send + Sync>, ConfigError> {
    let group = type_name::<T>();

    let mut defaulted = T::default();
    defaulted.pre_binding().map_err(|err| {
        ConfigError::from_hook(err, |source| ConfigError::PreBind {
            group: group.to_string(),
            source,
        })
    })?;

    let mut props: T = decode_subtree(subtree).map_err(|err| ConfigError::BindDecode {
        group: group.to_string(),
        prefix: T::prefix().to_string(),
        key: err.key.unwrap_or_default(),
        message: err.message,
    })?;

    props.post_binding().map_err(|err| {
        ConfigError::from_hook(err, |source| ConfigError::PostBind {
            group: group.to_string(),
            source,
        })
    })?;

    Ok(Arc::new(props))
}

/// Immutable, type-indexed collection of bound property groups.
///
/// Produced once per load; values are read-only and may be shared freely
/// across concurrent consumers.
#[derive(Default, Clone)]
pub struct BoundProperties {
    groups: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for BoundProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundProperties")
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl BoundProperties {
    pub(crate) fn insert(&mut self, type_id: TypeId, value: Arc<dyn Any + Send + Sync>) {
        self.groups.insert(type_id, value);
    }

    /// Retrieve a bound group by its type.
    pub fn get<T: Properties>(&self) -> Option<Arc<T>> {
        self.groups
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|group| group.downcast::<T>().ok())
    }

    /// Number of bound groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether any group is bound.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
