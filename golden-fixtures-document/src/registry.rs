//! Custom tag registry applied when golden documents are loaded and edited.
//!
//! A [`TypeRegistry`] is a plain value that can be handed to
//! [`GoldenDocument::load`](crate::GoldenDocument::load). The process-wide
//! instance behind [`global_registry`] is what fixtures use by default;
//! registering into it affects every document opened afterwards.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{DocumentError, DocumentResult};

/// Turns the content of a `!tag` node into the value tests see.
pub type Constructor = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// Builds a value for any tag starting with a registered prefix. Gets the
/// rest of the tag after the prefix and the node content.
pub type MultiConstructor = dyn Fn(&str, Value) -> Result<Value, String> + Send + Sync;

/// Returns `Some(repr)` if a value should be written as `!tag repr`.
pub type Representer = dyn Fn(&Value) -> Option<Value> + Send + Sync;

/// Registered constructors, representers and class tags.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: HashMap<String, Arc<Constructor>>,
    multi_constructors: Vec<(String, Arc<MultiConstructor>)>,
    representers: Vec<(String, Arc<Representer>)>,
    classes: HashMap<String, String>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut constructors: Vec<_> = self.constructors.keys().collect();
        constructors.sort();
        f.debug_struct("TypeRegistry")
            .field("constructors", &constructors)
            .field(
                "multi_constructors",
                &self.multi_constructors.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .field(
                "representers",
                &self.representers.iter().map(|(t, _)| t).collect::<Vec<_>>(),
            )
            .field("classes", &self.classes)
            .finish()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `!tag` nodes. Replaces any earlier one.
    pub fn add_constructor<F>(&mut self, tag: &str, constructor: F) -> DocumentResult<()>
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let tag = checked_tag(tag)?;
        self.constructors.insert(tag, Arc::new(constructor));
        Ok(())
    }

    /// Register a constructor for every tag starting with `prefix`.
    ///
    /// Exact constructors take precedence; among prefixes the longest
    /// match wins. An empty prefix matches every tag.
    pub fn add_multi_constructor<F>(&mut self, prefix: &str, constructor: F)
    where
        F: Fn(&str, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let prefix = normalize_tag(prefix).to_string();
        let constructor: Arc<MultiConstructor> = Arc::new(constructor);
        match self.multi_constructors.iter_mut().find(|(p, _)| *p == prefix) {
            Some(slot) => slot.1 = constructor,
            None => self.multi_constructors.push((prefix, constructor)),
        }
    }

    /// Register a representer emitting `!tag` nodes. Replaces any earlier one
    /// for the same tag but keeps its position.
    pub fn add_representer<F>(&mut self, tag: &str, representer: F) -> DocumentResult<()>
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        let tag = checked_tag(tag)?;
        let representer: Arc<Representer> = Arc::new(representer);
        match self.representers.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = representer,
            None => self.representers.push((tag, representer)),
        }
        Ok(())
    }

    /// Bind a Rust type to a tag.
    ///
    /// `!tag` nodes load as their untagged content, so they deserialize into
    /// `T` through serde. Values of type `T` recorded as golden outputs are
    /// written back as `!tag` nodes.
    pub fn register_class<T: ?Sized>(&mut self, tag: &str) -> DocumentResult<()> {
        let tag = checked_tag(tag)?;
        self.classes
            .insert(type_key(std::any::type_name::<T>()).to_string(), tag.clone());
        self.constructors
            .insert(tag, Arc::new(|value: Value| Ok::<Value, String>(value)));
        Ok(())
    }

    /// Tag registered for the Rust type named `type_name`, if any.
    pub fn class_tag(&self, type_name: &str) -> Option<&str> {
        self.classes.get(type_key(type_name)).map(String::as_str)
    }

    /// Wrap `value` in the class tag of `T`, if `T` was registered.
    pub fn tag_as<T: ?Sized>(&self, value: Value) -> Value {
        match self.class_tag(std::any::type_name::<T>()) {
            Some(tag) => Value::Tagged(Box::new(TaggedValue {
                tag: Tag::new(tag),
                value,
            })),
            None => value,
        }
    }

    /// Apply constructors to every tagged node of `value`, innermost first.
    ///
    /// Tags without a registered constructor are kept as they are.
    pub fn construct(&self, value: Value) -> DocumentResult<Value> {
        match value {
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                let inner = self.construct(value)?;
                let name = tag_name(&tag);
                if let Some(constructor) = self.constructors.get(&name) {
                    return constructor(inner)
                        .map_err(|message| DocumentError::Construct { tag: name, message });
                }
                let multi = self
                    .multi_constructors
                    .iter()
                    .filter(|(prefix, _)| name.starts_with(prefix.as_str()))
                    .max_by_key(|(prefix, _)| prefix.len());
                match multi {
                    Some((prefix, constructor)) => constructor(&name[prefix.len()..], inner)
                        .map_err(|message| DocumentError::Construct { tag: name.clone(), message }),
                    None => Ok(Value::Tagged(Box::new(TaggedValue { tag, value: inner }))),
                }
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.construct(item))
                .collect::<DocumentResult<Vec<_>>>()
                .map(Value::Sequence),
            Value::Mapping(map) => {
                let mut out = Mapping::new();
                for (key, item) in map {
                    out.insert(key, self.construct(item)?);
                }
                Ok(Value::Mapping(out))
            }
            other => Ok(other),
        }
    }

    /// Apply representers to `value`. The first matching representer wins
    /// and its output is not visited again.
    pub fn represent(&self, value: &Value) -> Value {
        for (tag, representer) in &self.representers {
            if let Some(repr) = representer(value) {
                return Value::Tagged(Box::new(TaggedValue {
                    tag: Tag::new(tag),
                    value: repr,
                }));
            }
        }
        match value {
            Value::Sequence(items) => {
                Value::Sequence(items.iter().map(|item| self.represent(item)).collect())
            }
            Value::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.represent(item)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
            && self.multi_constructors.is_empty()
            && self.representers.is_empty()
            && self.classes.is_empty()
    }
}

static GLOBAL: Lazy<RwLock<TypeRegistry>> = Lazy::new(|| RwLock::new(TypeRegistry::new()));

/// Snapshot of the process-wide registry.
pub fn global_registry() -> TypeRegistry {
    GLOBAL.read().clone()
}

/// Register a constructor in the process-wide registry.
pub fn add_constructor<F>(tag: &str, constructor: F) -> DocumentResult<()>
where
    F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
{
    GLOBAL.write().add_constructor(tag, constructor)
}

/// Register a prefix constructor in the process-wide registry.
pub fn add_multi_constructor<F>(prefix: &str, constructor: F)
where
    F: Fn(&str, Value) -> Result<Value, String> + Send + Sync + 'static,
{
    GLOBAL.write().add_multi_constructor(prefix, constructor);
}

/// Register a representer in the process-wide registry.
pub fn add_representer<F>(tag: &str, representer: F) -> DocumentResult<()>
where
    F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
{
    GLOBAL.write().add_representer(tag, representer)
}

/// Bind a Rust type to a tag in the process-wide registry.
pub fn register_class<T: ?Sized>(tag: &str) -> DocumentResult<()> {
    GLOBAL.write().register_class::<T>(tag)
}

fn normalize_tag(tag: &str) -> &str {
    tag.trim_start_matches('!')
}

fn checked_tag(tag: &str) -> DocumentResult<String> {
    match normalize_tag(tag) {
        "" => Err(DocumentError::EmptyTag {
            tag: tag.to_string(),
        }),
        name => Ok(name.to_string()),
    }
}

fn tag_name(tag: &Tag) -> String {
    normalize_tag(&tag.to_string()).to_string()
}

/// `&Point` and `Point` share a class.
fn type_key(type_name: &str) -> &str {
    type_name.trim_start_matches('&').trim_start_matches("mut ")
}
