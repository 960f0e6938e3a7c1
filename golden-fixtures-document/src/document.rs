//! Format-preserving golden documents.
//!
//! A golden file is a YAML mapping. [`GoldenDocument`] keeps the source
//! text of every top-level entry next to its parsed value, so serializing
//! after a few edits only changes the text of the edited entries. Key
//! order, comments and the formatting of everything else survive.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{DocumentError, DocumentResult};
use crate::persist::write_atomic;
use crate::registry::TypeRegistry;
use crate::segment::{self, Layout};

/// How a document should be loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// A missing file loads as an empty document instead of failing.
    pub allow_missing: bool,
    /// Constructors and representers to apply.
    pub registry: TypeRegistry,
}

impl LoadOptions {
    pub fn new(allow_missing: bool, registry: TypeRegistry) -> Self {
        Self {
            allow_missing,
            registry,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    /// Value as seen by callers, after constructors ran.
    value: Value,
    /// Value as it should be written.
    repr: Value,
    /// Source text of the entry, `None` once the value was replaced.
    text: Option<String>,
    /// Blank lines and comments that follow the entry.
    trailer: String,
}

/// An ordered top-level mapping loaded from one golden file.
#[derive(Debug, Clone)]
pub struct GoldenDocument {
    path: PathBuf,
    source: String,
    preamble: String,
    entries: Vec<Entry>,
    /// False when the source could not be partitioned per key.
    preserved: bool,
    modified: bool,
    registry: TypeRegistry,
}

impl GoldenDocument {
    /// Load the golden file at `path`.
    pub fn load(path: impl Into<PathBuf>, options: &LoadOptions) -> DocumentResult<Self> {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(path, &text, options.registry.clone()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if options.allow_missing {
                    debug!(path = %path.display(), "Golden file missing, starting empty");
                    Ok(Self::empty(path, options.registry.clone()))
                } else {
                    Err(DocumentError::NotFound { path })
                }
            }
            Err(source) => Err(DocumentError::Read { path, source }),
        }
    }

    /// An empty document bound to `path`, which need not exist yet.
    pub fn empty(path: impl Into<PathBuf>, registry: TypeRegistry) -> Self {
        Self {
            path: path.into(),
            source: String::new(),
            preamble: String::new(),
            entries: Vec::new(),
            preserved: true,
            modified: false,
            registry,
        }
    }

    /// Parse `text` as the content of the golden file at `path`.
    pub fn parse(
        path: impl Into<PathBuf>,
        text: &str,
        registry: TypeRegistry,
    ) -> DocumentResult<Self> {
        let path = path.into();

        let mapping = if text.lines().all(segment::is_trivia) {
            Mapping::new()
        } else {
            let parsed: Value = serde_yaml::from_str(text).map_err(|source| {
                DocumentError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;
            match parsed {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => return Err(DocumentError::NotAMapping { path }),
            }
        };

        let mut values = Vec::with_capacity(mapping.len());
        for (key, repr) in mapping {
            let key = match key_string(&key) {
                Some(key) => key,
                None => {
                    return Err(DocumentError::InvalidKey {
                        path,
                        key: format!("{:?}", key),
                    })
                }
            };
            let value = registry.construct(repr.clone())?;
            values.push((key, value, repr));
        }

        let layout = segment::scan(text).filter(|layout| matches_layout(text, layout, &values));
        let preserved = layout.is_some();

        let mut preamble = String::new();
        let entries = match layout {
            Some(layout) => {
                preamble = text[layout.preamble.clone()].to_string();
                values
                    .into_iter()
                    .zip(layout.entries)
                    .map(|((key, value, repr), span)| Entry {
                        key,
                        value,
                        repr,
                        text: Some(text[span.body].to_string()),
                        trailer: text[span.trailer].to_string(),
                    })
                    .collect()
            }
            None => {
                debug!(
                    path = %path.display(),
                    "Golden layout not preserved, edits will re-render the whole file"
                );
                values
                    .into_iter()
                    .map(|(key, value, repr)| Entry {
                        key,
                        value,
                        repr,
                        text: None,
                        trailer: String::new(),
                    })
                    .collect()
            }
        };

        Ok(Self {
            path,
            source: text.to_string(),
            preamble,
            entries,
            preserved,
            modified: false,
            registry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> DocumentResult<&Value> {
        self.try_get(key).ok_or_else(|| DocumentError::KeyMissing {
            path: self.path.clone(),
            key: key.to_string(),
        })
    }

    /// Value stored under `key`, if any.
    pub fn try_get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Top-level keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once `set` or `delete` changed the document.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// True if edits keep the formatting of untouched entries.
    pub fn is_layout_preserved(&self) -> bool {
        self.preserved
    }

    /// Set `key` to `value` in memory. New keys go to the end.
    pub fn set(&mut self, key: &str, value: Value) {
        let repr = self.registry.represent(&value);
        self.modified = true;
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.value = value;
                entry.repr = repr;
                entry.text = None;
            }
            None => self.entries.push(Entry {
                key: key.to_string(),
                value,
                repr,
                text: None,
                trailer: String::new(),
            }),
        }
    }

    /// Remove `key` in memory, returning its value.
    ///
    /// Comments and blank lines that followed the entry are kept.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|e| e.key == key)?;
        let entry = self.entries.remove(idx);
        self.modified = true;
        match idx.checked_sub(1) {
            Some(prev) => self.entries[prev].trailer.push_str(&entry.trailer),
            None => self.preamble.push_str(&entry.trailer),
        }
        Some(entry.value)
    }

    /// Render the document.
    ///
    /// An unmodified document renders to exactly the text it was loaded from.
    pub fn serialize(&self) -> DocumentResult<String> {
        if !self.modified {
            return Ok(self.source.clone());
        }
        if !self.preserved {
            return self.render_mapping();
        }

        let mut out = self.preamble.clone();
        for entry in &self.entries {
            match &entry.text {
                Some(text) => out.push_str(text),
                None => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&render_entry(&entry.key, &entry.repr)?);
                }
            }
            out.push_str(&entry.trailer);
        }

        // Kept entries may alias an anchor defined in an edited one.
        if self.source.contains('*') && !self.reparses_to_entries(&out) {
            debug!(
                path = %self.path.display(),
                "Edited golden file breaks an alias, re-rendering the whole file"
            );
            return self.render_mapping();
        }
        Ok(out)
    }

    /// Render every entry from its value, without any source text.
    fn render_mapping(&self) -> DocumentResult<String> {
        let mapping: Mapping = self
            .entries
            .iter()
            .map(|e| (Value::String(e.key.clone()), e.repr.clone()))
            .collect();
        serde_yaml::to_string(&mapping).map_err(|source| DocumentError::Serialize {
            key: String::new(),
            source,
        })
    }

    /// True if `text` parses back to exactly the current entries.
    fn reparses_to_entries(&self, text: &str) -> bool {
        let mapping = match serde_yaml::from_str::<Value>(text) {
            Ok(Value::Mapping(mapping)) => mapping,
            Ok(Value::Null) => Mapping::new(),
            _ => return false,
        };
        mapping.len() == self.entries.len()
            && mapping.iter().zip(&self.entries).all(|((key, repr), entry)| {
                key_string(key).as_deref() == Some(entry.key.as_str()) && *repr == entry.repr
            })
    }

    /// Serialize and atomically replace the file at [`path`](Self::path).
    pub fn save(&self) -> DocumentResult<()> {
        let text = self.serialize()?;
        write_atomic(&self.path, text.as_bytes()).map_err(|source| DocumentError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn render_entry(key: &str, repr: &Value) -> DocumentResult<String> {
    let mut single = Mapping::new();
    single.insert(Value::String(key.to_string()), repr.clone());
    serde_yaml::to_string(&single).map_err(|source| DocumentError::Serialize {
        key: key.to_string(),
        source,
    })
}

/// Scalar keys are addressed by their string form.
fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        _ => None,
    }
}

/// The scanned layout is only usable if it found exactly the parsed keys, in
/// order, and the preamble holds nothing but trivia and markers.
fn matches_layout(text: &str, layout: &Layout, values: &[(String, Value, Value)]) -> bool {
    let preamble_ok = text[layout.preamble.clone()].lines().all(|line| {
        segment::is_trivia(line) || line.starts_with("---") || line.starts_with('%')
    });
    if !preamble_ok || layout.entries.len() != values.len() {
        return false;
    }
    layout
        .entries
        .iter()
        .zip(values)
        .all(|(span, (key, _, _))| {
            serde_yaml::from_str::<Value>(&span.key)
                .ok()
                .as_ref()
                .and_then(key_string)
                .map_or(false, |scanned| scanned == *key)
        })
}
