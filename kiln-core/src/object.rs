//! Constructed objects
//!
//! An `Object` is whatever a raw constructor produced, wrapped with the
//! bookkeeping the compiler needs: the constructor kind, the category that
//! registered it, an optional user-chosen name and free-form attributes that
//! after-build hooks may attach. Objects are mutable until they are
//! registered; from then on they are shared through `ObjectRef`.

use crate::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A constructed, name-aware entity
pub struct Object {
    kind: String,
    category: Option<String>,
    name: Option<String>,
    attrs: BTreeMap<String, Value>,
    payload: Box<dyn Any + Send + Sync>,
}

impl Object {
    pub fn new<T: Any + Send + Sync>(kind: impl Into<String>, payload: T) -> Self {
        Self {
            kind: kind.into(),
            category: None,
            name: None,
            attrs: BTreeMap::new(),
            payload: Box::new(payload),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = Some(category.into());
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Builder: set name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Builder: attach attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Borrow the constructed payload if it has type `T`
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Freeze the object into a shared handle
    pub fn into_ref(self) -> ObjectRef {
        ObjectRef(Arc::new(self))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("kind", &self.kind)
            .field("category", &self.category)
            .field("name", &self.name)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a registered object.
///
/// Equality of handles is identity: two handles are the same object only if
/// they point at the same allocation.
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    pub fn ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for ObjectRef {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", self.kind, name),
            None => write!(f, "{}(<unnamed>)", self.kind),
        }
    }
}
