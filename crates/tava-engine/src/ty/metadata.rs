//! Per-type member metadata cache
//!
//! Lazily built snapshot of a type's declared and public members. Each
//! field is populated at most once, on first access, and is never
//! recomputed or invalidated: the underlying type is immutable, so this is
//! pure memoization. A lock per cache guards first population; unrelated
//! types never contend.
//!
//! Getters hand out owned copies. The cached arrays themselves are never
//! mutated after population, so a copy observed by one caller can never be
//! affected by another caller's mutation.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{LinkError, LinkResult};
use crate::runtime::capability::{AccessScope, CapabilityChecker};
use crate::sync::OnceBarrier;

use super::member::{Constructor, DeclaredMembers, Field, Method};
use super::Type;

/// Member metadata cache, owned exclusively by its [`Type`]
#[derive(Debug)]
pub struct TypeMetadataCache {
    declared: OnceCell<Arc<DeclaredMembers>>,
    public_fields: OnceCell<Arc<Vec<Field>>>,
    public_methods: OnceCell<Arc<Vec<Method>>>,
    public_constructors: OnceCell<Arc<Vec<Constructor>>>,
    default_ctor: OnceCell<Option<Constructor>>,
    promotion: OnceBarrier,
}

impl TypeMetadataCache {
    pub(crate) fn new() -> Self {
        Self {
            declared: OnceCell::new(),
            public_fields: OnceCell::new(),
            public_methods: OnceCell::new(),
            public_constructors: OnceCell::new(),
            default_ctor: OnceCell::new(),
            promotion: OnceBarrier::new(),
        }
    }

    /// One substrate call, memoized verbatim
    fn declared(&self, ty: &Type) -> LinkResult<&Arc<DeclaredMembers>> {
        self.declared
            .get_or_try_init(|| ty.substrate().declared_members_of(ty).map(Arc::new))
    }

    pub(crate) fn declared_fields(&self, ty: &Type) -> LinkResult<Vec<Field>> {
        Ok(self.declared(ty)?.fields.clone())
    }

    pub(crate) fn declared_methods(&self, ty: &Type) -> LinkResult<Vec<Method>> {
        Ok(self.declared(ty)?.methods.clone())
    }

    pub(crate) fn declared_constructors(&self, ty: &Type) -> LinkResult<Vec<Constructor>> {
        Ok(self.declared(ty)?.constructors.clone())
    }

    /// Declared-public fields plus public fields inherited from the
    /// superclass and every direct interface, deduplicated by identity
    pub(crate) fn public_fields(&self, ty: &Type) -> LinkResult<Vec<Field>> {
        let merged = self.public_fields.get_or_try_init(|| -> LinkResult<_> {
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            for field in &self.declared(ty)?.fields {
                if field.modifiers.is_public()
                    && seen.insert((field.declaring, field.name.clone()))
                {
                    out.push(field.clone());
                }
            }
            let mut inherited: Vec<Field> = Vec::new();
            if let Some(superclass) = ty.superclass() {
                inherited.extend(superclass.public_fields()?);
            }
            for iface in ty.interfaces() {
                inherited.extend(iface.public_fields()?);
            }
            for field in inherited {
                if seen.insert((field.declaring, field.name.clone())) {
                    out.push(field);
                }
            }
            Ok(Arc::new(out))
        })?;
        Ok((**merged).clone())
    }

    /// Declared-public methods plus public methods inherited from the
    /// superclass and every direct interface, deduplicated by identity
    pub(crate) fn public_methods(&self, ty: &Type) -> LinkResult<Vec<Method>> {
        let merged = self.public_methods.get_or_try_init(|| -> LinkResult<_> {
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            for method in &self.declared(ty)?.methods {
                if method.modifiers.is_public() {
                    let (declaring, name, params) = method.identity();
                    if seen.insert((declaring, name.to_string(), params.to_vec())) {
                        out.push(method.clone());
                    }
                }
            }
            let mut inherited = Vec::new();
            if let Some(superclass) = ty.superclass() {
                inherited.extend(superclass.public_methods()?);
            }
            for iface in ty.interfaces() {
                inherited.extend(iface.public_methods()?);
            }
            for method in inherited {
                let (declaring, name, params) = method.identity();
                if seen.insert((declaring, name.to_string(), params.to_vec())) {
                    out.push(method);
                }
            }
            Ok(Arc::new(out))
        })?;
        Ok((**merged).clone())
    }

    /// Constructors are never inherited; the public view is the
    /// declared-public subset
    pub(crate) fn public_constructors(&self, ty: &Type) -> LinkResult<Vec<Constructor>> {
        let merged = self
            .public_constructors
            .get_or_try_init(|| -> LinkResult<_> {
                let out: Vec<Constructor> = self
                    .declared(ty)?
                    .constructors
                    .iter()
                    .filter(|ctor| ctor.modifiers.is_public())
                    .cloned()
                    .collect();
                Ok(Arc::new(out))
            })?;
        Ok((**merged).clone())
    }

    /// The unique zero-parameter constructor
    pub(crate) fn default_constructor(&self, ty: &Type) -> LinkResult<Constructor> {
        let resolved = self.default_ctor.get_or_try_init(|| -> LinkResult<_> {
            let mut found = None;
            for ctor in &self.declared(ty)?.constructors {
                if ctor.is_default() {
                    if found.is_some() {
                        // Two zero-parameter constructors never come out of a
                        // verified class; treat as absent.
                        return Ok(None);
                    }
                    found = Some(ctor.clone());
                }
            }
            Ok(found)
        })?;
        resolved
            .clone()
            .ok_or_else(|| LinkError::NoSuchMethod(format!("{}.<init>()", ty.name())))
    }

    /// Default constructor, promoted for instantiation.
    ///
    /// The first caller runs the one-time access check behind the one-shot
    /// barrier; every concurrent caller blocks until the marking completes
    /// and then proceeds without re-checking. A denied check resets the
    /// barrier, so a later caller under a more permissive checker may
    /// succeed.
    pub(crate) fn promoted_default_constructor(
        &self,
        ty: &Type,
        checker: &dyn CapabilityChecker,
    ) -> LinkResult<Constructor> {
        let ctor = self.default_constructor(ty)?;
        self.promotion
            .call_once(|| checker.check_member_access(ty, AccessScope::Declared))?;
        Ok(ctor)
    }

    /// Whether the one-time promotion has completed
    #[cfg(test)]
    pub(crate) fn promotion_complete(&self) -> bool {
        self.promotion.is_complete()
    }
}
