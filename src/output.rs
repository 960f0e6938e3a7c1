//! Golden output values and the update-mode comparison proxy.
//!
//! In normal mode a [`GoldenOutput`] is just the stored value. In update
//! mode it stands in for the stored value, and comparing it with `==` does
//! two things: it answers the comparison against the *old* stored value,
//! so the assertion still shows the diff, and it records the compared
//! value as what the golden file should contain after the test.

use golden_fixtures_document::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::{GoldenError, GoldenResult};
use crate::fixture::{GoldenFixture, PendingAction};

/// Comparison target meaning "this output should not exist".
///
/// Matches only a missing key. In update mode, comparing any output with
/// `Absent` removes the key from the golden file. Comparing with `None`
/// does the same for [`GoldenFixture::get_output`], but stores a null for
/// [`GoldenFixture::output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Absent;

fn is_absent<T: ?Sized>() -> bool {
    std::any::type_name::<T>().trim_start_matches('&') == std::any::type_name::<Absent>()
}

/// A golden output, either a plain stored value or a pending write.
pub enum GoldenOutput<'a> {
    /// Normal mode: the stored value, `None` if absent.
    Literal {
        path: PathBuf,
        key: String,
        value: Option<Value>,
    },
    /// Update mode: comparisons are recorded on the fixture.
    Pending {
        fixture: &'a GoldenFixture,
        key: String,
        current: Option<Value>,
        optional: bool,
    },
}

impl<'a> GoldenOutput<'a> {
    pub(crate) fn literal(path: &Path, key: &str, value: Option<Value>) -> Self {
        GoldenOutput::Literal {
            path: path.to_path_buf(),
            key: key.to_string(),
            value,
        }
    }

    pub(crate) fn pending(
        fixture: &'a GoldenFixture,
        key: &str,
        current: Option<Value>,
        optional: bool,
    ) -> Self {
        GoldenOutput::Pending {
            fixture,
            key: key.to_string(),
            current,
            optional,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            GoldenOutput::Literal { key, .. } | GoldenOutput::Pending { key, .. } => key,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, GoldenOutput::Pending { .. })
    }

    /// Deserialize the stored value. An absent value decodes from null.
    ///
    /// Pending outputs only support `==`; this fails with
    /// [`GoldenError::UnsupportedProxyOperation`] for them.
    pub fn value<T: DeserializeOwned>(&self) -> GoldenResult<T> {
        match self {
            GoldenOutput::Literal { path, key, value } => {
                serde_yaml::from_value(value.clone().unwrap_or(Value::Null)).map_err(|source| {
                    GoldenError::Decode {
                        path: path.clone(),
                        key: key.clone(),
                        source,
                    }
                })
            }
            GoldenOutput::Pending { key, .. } => Err(GoldenError::UnsupportedProxyOperation {
                key: key.clone(),
                operation: "value",
            }),
        }
    }

    /// Compare with `expected`, recording it as the new content in update mode.
    pub fn matches<T: Serialize + ?Sized>(&self, expected: &T) -> bool {
        if is_absent::<T>() {
            return self.matches_absent();
        }
        let expected = match serde_yaml::to_value(expected) {
            Ok(value) => value,
            Err(e) => panic!("cannot compare golden output {:?}: {}", self.key(), e),
        };

        match self {
            GoldenOutput::Literal { value, .. } => same(value.as_ref(), &expected),
            GoldenOutput::Pending {
                fixture,
                key,
                current,
                optional,
            } => {
                let action = if *optional && expected.is_null() {
                    PendingAction::Delete
                } else {
                    PendingAction::Set(fixture.registry().tag_as::<T>(expected.clone()))
                };
                fixture.record(key, action);
                same(current.as_ref(), &expected)
            }
        }
    }

    /// Compare with [`Absent`], recording a deletion in update mode.
    fn matches_absent(&self) -> bool {
        match self {
            GoldenOutput::Literal { value, .. } => value.is_none(),
            GoldenOutput::Pending {
                fixture,
                key,
                current,
                ..
            } => {
                fixture.record(key, PendingAction::Delete);
                current.is_none()
            }
        }
    }
}

fn same(current: Option<&Value>, expected: &Value) -> bool {
    match current {
        Some(value) => value == expected,
        None => expected.is_null(),
    }
}

impl<T: Serialize + ?Sized> PartialEq<T> for GoldenOutput<'_> {
    fn eq(&self, other: &T) -> bool {
        self.matches(other)
    }

    #[allow(clippy::partialeq_ne_impl)]
    fn ne(&self, other: &T) -> bool {
        if self.is_pending() {
            warn!(key = self.key(), "Only `==` should be used on a golden output");
        }
        !self.matches(other)
    }
}

macro_rules! impl_reverse_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<'a> PartialEq<GoldenOutput<'a>> for $ty {
                fn eq(&self, other: &GoldenOutput<'a>) -> bool {
                    other.matches(self)
                }
            }
        )*
    };
}

impl_reverse_eq!(
    String, str, &str, bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64,
    Value, Absent,
);

impl<'a, T: Serialize> PartialEq<GoldenOutput<'a>> for Vec<T> {
    fn eq(&self, other: &GoldenOutput<'a>) -> bool {
        other.matches(self)
    }
}

impl<'a, T: Serialize> PartialEq<GoldenOutput<'a>> for Option<T> {
    fn eq(&self, other: &GoldenOutput<'a>) -> bool {
        other.matches(self)
    }
}

impl fmt::Debug for GoldenOutput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoldenOutput::Literal { value, .. } => write_value(f, value.as_ref()),
            GoldenOutput::Pending { key, current, .. } => {
                write!(f, "golden.out[{:?}] = ", key)?;
                write_value(f, current.as_ref())
            }
        }
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: Option<&Value>) -> fmt::Result {
    match value {
        None => f.write_str("<absent>"),
        Some(value) => match serde_yaml::to_string(value) {
            Ok(text) => f.write_str(text.trim_end()),
            Err(_) => write!(f, "{:?}", value),
        },
    }
}
