//! Job and trigger identity
//!
//! A key is a (name, group) pair. Group is optional at the call site but
//! never optional once stored: a missing group resolves to [`DEFAULT_GROUP`].
//! Keys are immutable and are the only thing the store, the engine, and
//! listeners ever hold onto across a transaction boundary — never a
//! reference into a stored [`super::Job`] or [`super::Trigger`].

use std::fmt;

/// Sentinel group name applied when a caller supplies only a name.
pub const DEFAULT_GROUP: &str = "DEFAULT";

/// Identity of a job: unique within the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct JobKey {
    pub name: String,
    pub group: String,
}

/// Identity of a trigger: unique within the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct TriggerKey {
    pub name: String,
    pub group: String,
}

macro_rules! impl_key {
    ($ty:ident) => {
        impl $ty {
            /// Creates a key in the default group.
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    name: name.into(),
                    group: DEFAULT_GROUP.to_string(),
                }
            }

            /// Creates a key in an explicit group.
            ///
            /// An empty group string is treated as [`DEFAULT_GROUP`].
            pub fn with_group(name: impl Into<String>, group: impl Into<String>) -> Self {
                let group = group.into();
                Self {
                    name: name.into(),
                    group: if group.is_empty() { DEFAULT_GROUP.to_string() } else { group },
                }
            }

            pub fn is_default_group(&self) -> bool {
                self.group == DEFAULT_GROUP
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}", self.group, self.name)
            }
        }
    };
}

impl_key!(JobKey);
impl_key!(TriggerKey);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_group_applied_when_omitted() {
        let k = JobKey::new("nightly-rollup");
        assert_eq!(k.group, DEFAULT_GROUP);
    }

    #[test]
    fn empty_group_falls_back_to_default() {
        let k = TriggerKey::with_group("t1", "");
        assert_eq!(k.group, DEFAULT_GROUP);
    }

    #[test]
    fn equality_and_hash_derive_from_both_fields() {
        let a = JobKey::with_group("j", "g1");
        let b = JobKey::with_group("j", "g2");
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_group_dot_name() {
        let k = JobKey::with_group("rollup", "batch");
        assert_eq!(k.to_string(), "batch.rollup");
    }
}
