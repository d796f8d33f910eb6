#![forbid(unsafe_code)]

//! Key-scoped change detection.
//!
//! A [`KeyFilter`] restricts a listener to changes in a set of top-level
//! keys. Whether a key changed is decided by the value's [`Record`] impl,
//! which compares exactly one level deep: the field under `key` in the
//! previous value against the field under `key` in the next value.
//!
//! Values without keyed structure (numbers, strings, lists) use the default
//! `Record` behavior: any change counts as a change of every key.
//!
//! # Invariants
//!
//! 1. An empty filter matches every change.
//! 2. A non-empty filter matches iff at least one listed key changed.
//! 3. Key order is preserved; duplicates are dropped at construction.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

/// Shallow, one-level keyed comparison.
pub trait Record: PartialEq {
    /// Whether the field named `key` differs between `self` and `next`.
    ///
    /// A field present on one side and absent on the other counts as
    /// changed. The default treats the value as opaque and reports any
    /// inequality.
    fn field_changed(&self, next: &Self, key: &str) -> bool {
        let _ = key;
        self != next
    }
}

macro_rules! opaque_record {
    ($($ty:ty),* $(,)?) => {
        $(impl Record for $ty {})*
    };
}

opaque_record!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

impl<T: PartialEq> Record for Vec<T> {}

impl<T: PartialEq> Record for [T] {}

impl<T: Record> Record for Option<T> {
    fn field_changed(&self, next: &Self, key: &str) -> bool {
        match (self, next) {
            (Some(prev), Some(next)) => prev.field_changed(next, key),
            (None, None) => false,
            _ => true,
        }
    }
}

impl<T: Record + ?Sized> Record for Box<T> {
    fn field_changed(&self, next: &Self, key: &str) -> bool {
        (**self).field_changed(next, key)
    }
}

impl<T: Record + ?Sized> Record for Rc<T> {
    fn field_changed(&self, next: &Self, key: &str) -> bool {
        (**self).field_changed(next, key)
    }
}

impl<K, V> Record for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: PartialEq,
{
    fn field_changed(&self, next: &Self, key: &str) -> bool {
        self.get(key) != next.get(key)
    }
}

impl<K, V, S> Record for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn field_changed(&self, next: &Self, key: &str) -> bool {
        self.get(key) != next.get(key)
    }
}

#[cfg(feature = "json")]
impl Record for serde_json::Value {
    fn field_changed(&self, next: &Self, key: &str) -> bool {
        match (self, next) {
            (Self::Object(prev), Self::Object(next)) => prev.get(key) != next.get(key),
            _ => self != next,
        }
    }
}

/// An ordered, duplicate-free set of top-level key names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    keys: Vec<String>,
}

impl KeyFilter {
    /// Build a filter from key names. Duplicates are dropped, first
    /// occurrence wins.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into();
            if !out.contains(&key) {
                out.push(key);
            }
        }
        Self { keys: out }
    }

    /// Iterate key names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Whether `key` is listed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether a listener scoped to this filter must see the change from
    /// `prev` to `next`.
    pub fn should_notify<R: Record + ?Sized>(&self, prev: &R, next: &R) -> bool {
        if self.keys.is_empty() {
            return true;
        }
        self.keys.iter().any(|key| prev.field_changed(next, key))
    }
}

impl<K: Into<String>> FromIterator<K> for KeyFilter {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dedupes_and_keeps_order() {
        let filter = KeyFilter::new(["b", "a", "b", "c", "a"]);
        assert_eq!(filter.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(filter.len(), 3);
        assert!(filter.contains("c"));
        assert!(!filter.contains("d"));
    }

    #[test]
    fn collects_from_iterator() {
        let filter: KeyFilter = vec!["x".to_string(), "y".to_string()].into_iter().collect();
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn json_object_compares_listed_keys_only() {
        let filter = KeyFilter::new(["b"]);
        let prev = json!({"a": "a", "b": "b"});
        let b_changed = json!({"a": "a", "b": "c"});
        let a_changed = json!({"a": "z", "b": "c"});

        assert!(filter.should_notify(&prev, &b_changed));
        assert!(!filter.should_notify(&b_changed, &a_changed));
    }

    #[test]
    fn json_key_added_or_removed_counts() {
        let filter = KeyFilter::new(["b"]);
        assert!(filter.should_notify(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(filter.should_notify(&json!({"b": 2}), &json!({})));
        assert!(!filter.should_notify(&json!({"a": 1}), &json!({"a": 2})));
    }

    #[test]
    fn json_nested_change_under_key_is_field_inequality() {
        let filter = KeyFilter::new(["user"]);
        let prev = json!({"user": {"name": "ann", "age": 3}});
        let next = json!({"user": {"name": "ann", "age": 4}});
        assert!(filter.should_notify(&prev, &next));
    }

    #[test]
    fn json_non_object_falls_back_to_whole_value() {
        let filter = KeyFilter::new(["a"]);
        assert!(filter.should_notify(&json!(1), &json!(2)));
        assert!(!filter.should_notify(&json!([1, 2]), &json!([1, 2])));
        assert!(filter.should_notify(&json!({"a": 1}), &json!(null)));
    }

    #[test]
    fn scalar_ignores_key_names() {
        let filter = KeyFilter::new(["anything"]);
        assert!(filter.should_notify(&1_i32, &2_i32));
        assert!(!filter.should_notify(&1_i32, &1_i32));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = KeyFilter::default();
        assert!(filter.should_notify(&json!({"a": 1}), &json!({"a": 1})));
    }

    #[test]
    fn option_of_record() {
        let filter = KeyFilter::new(["id"]);
        let none: Option<serde_json::Value> = None;
        let some = Some(json!({"id": 1, "title": "x"}));
        let retitled = Some(json!({"id": 1, "title": "y"}));

        assert!(filter.should_notify(&none, &some));
        assert!(!filter.should_notify(&some, &retitled));
        assert!(!filter.should_notify(&none, &none));
    }

    #[test]
    fn hashmap_record() {
        let filter = KeyFilter::new(["k"]);
        let prev: HashMap<String, u8> = HashMap::from([("k".into(), 1), ("j".into(), 1)]);
        let next: HashMap<String, u8> = HashMap::from([("k".into(), 1), ("j".into(), 2)]);
        assert!(!filter.should_notify(&prev, &next));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_key() -> impl Strategy<Value = String> {
        prop_oneof![Just("a"), Just("b"), Just("c"), Just("d")].prop_map(str::to_string)
    }

    fn arb_record() -> impl Strategy<Value = BTreeMap<String, u8>> {
        proptest::collection::btree_map(arb_key(), 0u8..4, 0..4)
    }

    proptest! {
        #[test]
        fn keys_are_deduplicated_in_order(keys in proptest::collection::vec(arb_key(), 0..12)) {
            let filter = KeyFilter::new(keys.iter().cloned());
            let mut expected: Vec<String> = Vec::new();
            for key in keys {
                if !expected.contains(&key) {
                    expected.push(key);
                }
            }
            let kept: Vec<String> = filter.keys().map(str::to_string).collect();
            prop_assert_eq!(kept, expected);
        }

        #[test]
        fn equal_records_never_notify(
            record in arb_record(),
            keys in proptest::collection::vec(arb_key(), 1..4),
        ) {
            let filter = KeyFilter::new(keys);
            prop_assert!(!filter.should_notify(&record, &record.clone()));
        }

        #[test]
        fn notify_iff_some_filtered_key_differs(
            prev in arb_record(),
            next in arb_record(),
            keys in proptest::collection::vec(arb_key(), 1..4),
        ) {
            let filter = KeyFilter::new(keys);
            let expected = filter.keys().any(|k| prev.get(k) != next.get(k));
            prop_assert_eq!(filter.should_notify(&prev, &next), expected);
        }
    }
}
