//! Immutable bags (multisets) of same-typed primitive values.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::datatype::Datatype;
use crate::value::AttributeValue;

/// A bag holds an element whose datatype differs from the bag's.
#[derive(Debug, Clone, Error)]
#[error("bag of {expected} cannot hold a {found} value")]
pub struct BagTypeError {
    /// Declared element datatype of the bag.
    pub expected: Datatype,
    /// Datatype of the offending element.
    pub found: Datatype,
}

/// An immutable multiset of primitive values sharing one datatype.
///
/// Bags are frozen at construction and cheap to clone; clones share the
/// backing storage, so repeated designator lookups within a request observe
/// the same bag instance.
#[derive(Debug, Clone)]
pub struct Bag {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    datatype: Datatype,
    values: Vec<AttributeValue>,
}

impl Bag {
    /// Builds a bag, checking every element against the declared datatype.
    pub fn new(datatype: Datatype, values: Vec<AttributeValue>) -> Result<Self, BagTypeError> {
        for v in &values {
            if v.datatype() != datatype {
                return Err(BagTypeError { expected: datatype, found: v.datatype() });
            }
        }
        Ok(Self { inner: Arc::new(Inner { datatype, values }) })
    }

    /// The empty bag of the given element datatype.
    #[must_use]
    pub fn empty(datatype: Datatype) -> Self {
        Self { inner: Arc::new(Inner { datatype, values: Vec::new() }) }
    }

    /// A one-element bag.
    #[must_use]
    pub fn singleton(value: AttributeValue) -> Self {
        let datatype = value.datatype();
        Self { inner: Arc::new(Inner { datatype, values: vec![value] }) }
    }

    /// The element datatype, retained even when the bag is empty.
    #[must_use]
    pub fn datatype(&self) -> Datatype {
        self.inner.datatype
    }

    /// Number of elements, counting duplicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values.len()
    }

    /// True when the bag has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.values.is_empty()
    }

    /// Iterates the elements in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.inner.values.iter()
    }

    /// The elements as a slice.
    #[must_use]
    pub fn values(&self) -> &[AttributeValue] {
        &self.inner.values
    }

    /// True when `value` occurs in the bag.
    #[must_use]
    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.inner.values.iter().any(|v| v == value)
    }

    /// The single element of a one-element bag, or `None` otherwise.
    #[must_use]
    pub fn single(&self) -> Option<&AttributeValue> {
        match self.inner.values.as_slice() {
            [v] => Some(v),
            _ => None,
        }
    }

    /// True when every element of `self` also occurs in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.iter().all(|v| other.contains(v))
    }

    /// True when the two bags hold the same set of values (duplicates
    /// ignored), per `set-equals`.
    #[must_use]
    pub fn set_equals(&self, other: &Self) -> bool {
        self.is_subset_of(other) && other.is_subset_of(self)
    }

    /// Set intersection, preserving first-occurrence order and dropping
    /// duplicates.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut out: Vec<AttributeValue> = Vec::new();
        for v in self.iter() {
            if other.contains(v) && !out.contains(v) {
                out.push(v.clone());
            }
        }
        Self { inner: Arc::new(Inner { datatype: self.datatype(), values: out }) }
    }

    /// Set union, preserving first-occurrence order and dropping duplicates.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out: Vec<AttributeValue> = Vec::new();
        for v in self.iter().chain(other.iter()) {
            if !out.contains(v) {
                out.push(v.clone());
            }
        }
        Self { inner: Arc::new(Inner { datatype: self.datatype(), values: out }) }
    }

    /// True when both bags share the backing storage (identity, not value,
    /// equality).
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Bag {
    fn eq(&self, other: &Self) -> bool {
        self.datatype() == other.datatype() && self.inner.values == other.inner.values
    }
}

impl fmt::Display for Bag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bag[{}](", self.datatype())?;
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&v.canonical())?;
        }
        f.write_str(")")
    }
}

impl Serialize for Bag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
