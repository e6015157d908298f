//! Generics and annotation cache
//!
//! Separate from the member metadata cache because it is more expensive and
//! rarely needed. The cache has two tiers:
//!
//! - **Primary**: the declared annotations and generic signature, immutable
//!   from construction.
//! - **Secondary**: the merged all-annotations snapshot. This tier is
//!   explicitly evictable ([`GenericsCache::evict_merged`]); recomputation
//!   is idempotent and safe under concurrent re-population, so concurrent
//!   computes may race and the last write wins with an equal value.
//!
//! All getters return defensive copies; cached arrays are never mutated
//! after population.

use std::sync::Arc;

use parking_lot::RwLock;

use super::Type;

/// An annotation instance attached to a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Binary name of the annotation type
    pub type_name: String,
    /// Whether the annotation type carries the inheritable marker
    pub inheritable: bool,
    /// Element name/value pairs, in declaration order
    pub values: Vec<(String, String)>,
}

impl Annotation {
    /// Plain, non-inheritable annotation with no elements
    pub fn marker(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            inheritable: false,
            values: Vec::new(),
        }
    }

    /// Inheritable annotation with no elements
    pub fn inheritable_marker(type_name: &str) -> Self {
        Self {
            inheritable: true,
            ..Self::marker(type_name)
        }
    }

    /// Attach an element value
    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.values.push((name.to_string(), value.to_string()));
        self
    }
}

/// Generic signature data recorded at parse time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericSignature {
    /// Declared type parameters, e.g. `["T", "U extends a.Base"]`
    pub type_parameters: Vec<String>,
    /// Generic superclass signature, e.g. `a.Box<T>`
    pub superclass: Option<String>,
    /// Generic interface signatures
    pub interfaces: Vec<String>,
}

/// Generics/annotation cache, owned exclusively by its [`Type`]
#[derive(Debug)]
pub(crate) struct GenericsCache {
    declared: Vec<Annotation>,
    signature: Option<GenericSignature>,
    /// Evictable secondary tier: the merged all-annotations snapshot
    merged: RwLock<Option<Arc<Vec<Annotation>>>>,
}

impl GenericsCache {
    pub(crate) fn new(declared: Vec<Annotation>, signature: Option<GenericSignature>) -> Self {
        Self {
            declared,
            signature,
            merged: RwLock::new(None),
        }
    }

    pub(crate) fn declared_annotations(&self) -> Vec<Annotation> {
        self.declared.clone()
    }

    /// Shadow-merge: declared annotations first, then superclass
    /// all-annotations that are inheritable and not shadowed by a declared
    /// annotation of the same annotation type. Interfaces never inherit.
    pub(crate) fn all_annotations(&self, ty: &Type) -> Vec<Annotation> {
        if let Some(snapshot) = self.merged.read().as_ref() {
            return (**snapshot).clone();
        }

        let mut out = self.declared.clone();
        if !ty.is_interface() {
            if let Some(superclass) = ty.superclass() {
                for inherited in superclass.all_annotations() {
                    let shadowed = out
                        .iter()
                        .any(|declared| declared.type_name == inherited.type_name);
                    if inherited.inheritable && !shadowed {
                        out.push(inherited);
                    }
                }
            }
        }

        let snapshot = Arc::new(out);
        *self.merged.write() = Some(Arc::clone(&snapshot));
        (*snapshot).clone()
    }

    pub(crate) fn generic_superclass(&self) -> Option<String> {
        self.signature.as_ref().and_then(|sig| sig.superclass.clone())
    }

    pub(crate) fn generic_interfaces(&self) -> Vec<String> {
        self.signature
            .as_ref()
            .map(|sig| sig.interfaces.clone())
            .unwrap_or_default()
    }

    pub(crate) fn type_parameters(&self) -> Vec<String> {
        self.signature
            .as_ref()
            .map(|sig| sig.type_parameters.clone())
            .unwrap_or_default()
    }

    /// Drop the secondary tier; the next merge recomputes it
    pub(crate) fn evict_merged(&self) {
        *self.merged.write() = None;
    }
}
