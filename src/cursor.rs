//! Per-(source, identity) marker of what has already been pushed.
//!
//! A cursor lives as long as the process and is owned by exactly one poll
//! loop, so it needs no locking. Nothing is persisted: a restart starts
//! every cursor unset.

use crate::ingest::types::SourceKind;

/// Boundary between delivered and not-yet-seen items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorValue {
    /// Wall-clock unix seconds of the last push.
    Timestamp(i64),
    /// Key of the newest item already pushed.
    Key(String),
}

#[derive(Debug)]
pub struct Cursor {
    source: SourceKind,
    identity: String,
    value: Option<CursorValue>,
}

impl Cursor {
    pub fn new(source: SourceKind, identity: impl Into<String>) -> Self {
        Self {
            source,
            identity: identity.into(),
            value: None,
        }
    }

    pub fn get(&self) -> Option<&CursorValue> {
        self.value.as_ref()
    }

    /// Overwrites unconditionally.
    pub fn set(&mut self, value: CursorValue) {
        tracing::trace!(source = %self.source, identity = %self.identity, ?value, "cursor set");
        self.value = Some(value);
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unset_and_overwrites() {
        let mut c = Cursor::new(SourceKind::Youku, "u1");
        assert!(c.get().is_none());
        c.set(CursorValue::Key("a".into()));
        c.set(CursorValue::Key("b".into()));
        assert_eq!(c.get(), Some(&CursorValue::Key("b".into())));
        assert_eq!(c.identity(), "u1");
    }
}
