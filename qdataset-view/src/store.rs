//! Mutable named property map with sealing and indexed entries.

use std::collections::HashMap;

use qdataset_traits::names;
use qdataset_traits::{DataSetError, PropertyValue, Result};

/// Outcome of looking a name up in a [`PropertyStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// No entry; the owner may fall through to its source.
    Absent,
    /// Explicitly cleared; the owner reports `None` without falling through.
    Masked,
    Present(&'a PropertyValue),
}

/// Property map owned by one dataset.
///
/// Global entries distinguish "absent" from "masked" so that views can
/// clear an inherited name. Indexed entries are keyed by `(name, index)`.
/// Once sealed with [`PropertyStore::make_immutable`] every write fails.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    global: HashMap<String, Option<PropertyValue>>,
    indexed: HashMap<(String, usize), PropertyValue>,
    immutable: bool,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        match self.global.get(name) {
            None => Lookup::Absent,
            Some(None) => Lookup::Masked,
            Some(Some(v)) => Lookup::Present(v),
        }
    }

    /// The stored value of `name`, or the result of `fallback` when there is
    /// no entry at all. Masked names resolve to `None`.
    pub fn resolve(
        &self,
        name: &str,
        fallback: impl FnOnce() -> Option<PropertyValue>,
    ) -> Option<PropertyValue> {
        match self.lookup(name) {
            Lookup::Absent => fallback(),
            Lookup::Masked => None,
            Lookup::Present(v) => Some(v.clone()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        match self.lookup(name) {
            Lookup::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        !matches!(self.lookup(name), Lookup::Absent)
    }

    /// Store `value` under `name`.
    ///
    /// A value of the wrong kind for a known name is logged and stored
    /// anyway. Setting `DEPEND_0` masks `JOIN_0`, including a value the
    /// owner would otherwise inherit from its source.
    pub fn put(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        self.check_immutable(name)?;
        check_kind(name, &value);
        if name == names::DEPEND_0 {
            tracing::trace!("DEPEND_0 set, clearing JOIN_0");
            self.global.insert(names::JOIN_0.to_string(), None);
        }
        self.global.insert(name.to_string(), Some(value));
        Ok(())
    }

    /// Store `value` if it is `Some`, otherwise leave `name` untouched.
    pub fn put_opt(&mut self, name: &str, value: Option<PropertyValue>) -> Result<()> {
        match value {
            Some(v) => self.put(name, v),
            None => Ok(()),
        }
    }

    /// Explicitly clear `name` so that owners stop falling through to
    /// their source.
    pub fn mask(&mut self, name: &str) -> Result<()> {
        self.check_immutable(name)?;
        self.global.insert(name.to_string(), None);
        Ok(())
    }

    /// Forget any entry for `name`, masked or not.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.check_immutable(name)?;
        self.global.remove(name);
        Ok(())
    }

    pub fn put_at(&mut self, name: &str, index: usize, value: PropertyValue) -> Result<()> {
        self.check_immutable(name)?;
        check_kind(name, &value);
        self.indexed.insert((name.to_string(), index), value);
        Ok(())
    }

    pub fn get_at(&self, name: &str, index: usize) -> Option<&PropertyValue> {
        if self.indexed.is_empty() {
            return None;
        }
        self.indexed.get(&(name.to_string(), index))
    }

    /// Whether any indexed entry exists; owners skip indexed lookups
    /// entirely when this is false.
    pub fn has_indexed(&self) -> bool {
        !self.indexed.is_empty()
    }

    /// Whether any indexed entry exists for element `index`.
    pub fn has_indexed_for(&self, index: usize) -> bool {
        self.indexed.keys().any(|(_, i)| *i == index)
    }

    /// Indexed entries for element `index`.
    pub fn indexed_for(&self, index: usize) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.indexed
            .iter()
            .filter(move |((_, i), _)| *i == index)
            .map(|((name, _), v)| (name.as_str(), v))
    }

    /// Present global entries (masked names are skipped).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.global
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn make_immutable(&mut self) {
        self.immutable = true;
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// A writable copy of every entry, masks included.
    pub fn unsealed(&self) -> Self {
        Self {
            global: self.global.clone(),
            indexed: self.indexed.clone(),
            immutable: false,
        }
    }

    pub fn check_immutable(&self, what: &str) -> Result<()> {
        if self.immutable {
            return Err(DataSetError::Immutable(format!(
                "cannot write `{what}` to a sealed dataset"
            )));
        }
        Ok(())
    }
}

fn check_kind(name: &str, value: &PropertyValue) {
    if let Some(expected) = names::expected_kind(name) {
        let found = value.kind();
        if found != expected {
            tracing::warn!(
                property = name,
                %expected,
                %found,
                "property value has unexpected type"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdataset_traits::Units;
    use tracing_test::traced_test;

    #[test]
    fn test_absent_masked_present() {
        let mut p = PropertyStore::new();
        assert_eq!(p.lookup(names::LABEL), Lookup::Absent);
        p.put(names::LABEL, "Bx".into()).unwrap();
        assert_eq!(p.get(names::LABEL).and_then(|v| v.as_str()), Some("Bx"));
        p.mask(names::LABEL).unwrap();
        assert_eq!(p.lookup(names::LABEL), Lookup::Masked);
        assert_eq!(p.resolve(names::LABEL, || Some("fallback".into())), None);
        p.remove(names::LABEL).unwrap();
        assert_eq!(
            p.resolve(names::LABEL, || Some("fallback".into())),
            Some("fallback".into())
        );
    }

    #[test]
    fn test_depend_0_clears_join_0() {
        let mut p = PropertyStore::new();
        p.put(names::JOIN_0, true.into()).unwrap();
        let dep0: qdataset_traits::DataSetRef =
            std::sync::Arc::new(crate::IndexGenDataSet::new(3));
        p.put(names::DEPEND_0, dep0.into()).unwrap();
        assert_eq!(p.lookup(names::JOIN_0), Lookup::Masked);
    }

    #[test]
    fn test_depend_0_masks_inherited_join_0() {
        let mut p = PropertyStore::new();
        let dep0: qdataset_traits::DataSetRef =
            std::sync::Arc::new(crate::IndexGenDataSet::new(3));
        p.put(names::DEPEND_0, dep0.into()).unwrap();
        assert_eq!(p.resolve(names::JOIN_0, || Some(true.into())), None);
    }

    #[test]
    fn test_indexed_entries() {
        let mut p = PropertyStore::new();
        assert!(!p.has_indexed());
        p.put_at(names::UNITS, 1, Units::new("km").into()).unwrap();
        assert!(p.has_indexed());
        assert!(p.has_indexed_for(1));
        assert!(!p.has_indexed_for(0));
        assert_eq!(
            p.get_at(names::UNITS, 1),
            Some(&PropertyValue::Units(Units::new("km")))
        );
        assert_eq!(p.get_at(names::UNITS, 0), None);
        assert_eq!(p.indexed_for(1).count(), 1);
    }

    #[test]
    fn test_sealed_store_rejects_writes() {
        let mut p = PropertyStore::new();
        p.put(names::TITLE, "before".into()).unwrap();
        p.make_immutable();
        assert!(matches!(
            p.put(names::TITLE, "after".into()),
            Err(DataSetError::Immutable(_))
        ));
        assert!(p.mask(names::TITLE).is_err());
        assert!(p.put_at(names::TITLE, 0, "x".into()).is_err());
        assert_eq!(p.get(names::TITLE).and_then(|v| v.as_str()), Some("before"));
    }

    #[traced_test]
    #[test]
    fn test_wrong_kind_is_logged_and_stored() {
        let mut p = PropertyStore::new();
        p.put(names::UNITS, "nT".into()).unwrap();
        assert_eq!(p.get(names::UNITS).and_then(|v| v.as_str()), Some("nT"));
        assert!(logs_contain("property value has unexpected type"));
    }
}
