//! Native substrate seam
//!
//! The substrate is the already-verified, low-level half of the runtime:
//! byte-level class parsing, linking, and initialization. The linking core
//! treats it as a fallible oracle behind the [`NativeSubstrate`] trait and
//! never second-guesses its answers; `Linkage` and initializer errors are
//! propagated verbatim.
//!
//! A substrate hands back [`TypeRecord`]s with supertype links already
//! resolved to live [`Type`]s (supertypes are always loaded before their
//! subtypes), so `is_assignable` has a default implementation that walks the
//! recorded hierarchy. Substrates with a faster native answer may override
//! it.

use std::sync::Arc;

use crate::error::{LinkError, LinkResult};
use crate::ty::{
    Annotation, DeclaredMembers, GenericSignature, Modifiers, Type, TypeKind,
};

/// A parsed, verified type description, ready to become a live [`Type`]
#[derive(Debug)]
pub struct TypeRecord {
    /// Binary (dotted) name
    pub name: String,
    /// Kind of the described type
    pub kind: TypeKind,
    /// Declaration modifiers
    pub modifiers: Modifiers,
    /// Resolved superclass, if any
    pub superclass: Option<Arc<Type>>,
    /// Resolved directly implemented (or extended) interfaces
    pub interfaces: Vec<Arc<Type>>,
    /// Annotations declared on the type
    pub declared_annotations: Vec<Annotation>,
    /// Generic signature, if the type declares one
    pub generic_signature: Option<GenericSignature>,
}

impl TypeRecord {
    /// A public class record with no supertypes
    pub fn class(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TypeKind::Class,
            modifiers: Modifiers::PUBLIC,
            superclass: None,
            interfaces: Vec::new(),
            declared_annotations: Vec::new(),
            generic_signature: None,
        }
    }

    /// A public interface record
    pub fn interface(name: &str) -> Self {
        Self {
            kind: TypeKind::Interface,
            modifiers: Modifiers::PUBLIC.union(Modifiers::ABSTRACT),
            ..Self::class(name)
        }
    }

    /// Set declaration modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the resolved superclass
    pub fn with_superclass(mut self, superclass: Option<Arc<Type>>) -> Self {
        self.superclass = superclass;
        self
    }

    /// Set the resolved interfaces
    pub fn with_interfaces(mut self, interfaces: Vec<Arc<Type>>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Set the declared annotations
    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.declared_annotations = annotations;
        self
    }

    /// Set the generic signature
    pub fn with_generic_signature(mut self, signature: GenericSignature) -> Self {
        self.generic_signature = Some(signature);
        self
    }
}

/// The native substrate: primitive, already-verified operations the linking
/// core delegates to
pub trait NativeSubstrate: Send + Sync {
    /// Parse raw, already-bounds-checked class bytes into a record.
    ///
    /// Fails with [`LinkError::MalformedClass`] on any structural defect,
    /// including a parsed name different from `expected_name`.
    fn parse_and_define(&self, expected_name: &str, bytes: &[u8]) -> LinkResult<TypeRecord>;

    /// Look up a bootstrap-classpath type by name.
    ///
    /// Fails softly with [`LinkError::TypeNotFound`] when the name is not a
    /// bootstrap type.
    fn bootstrap_lookup(&self, name: &str) -> LinkResult<TypeRecord>;

    /// Enumerate the members `ty` declares directly
    fn declared_members_of(&self, ty: &Type) -> LinkResult<DeclaredMembers>;

    /// Superclass and direct interfaces of `ty`.
    ///
    /// Records resolve these at parse time, so the default answer reads the
    /// stored links.
    fn super_and_interfaces_of(&self, ty: &Type) -> (Option<Arc<Type>>, Vec<Arc<Type>>) {
        (ty.superclass().cloned(), ty.interfaces().to_vec())
    }

    /// Whether a value of type `source` is assignable to `target`.
    ///
    /// Default: identity, superclass chain, transitive interfaces, and
    /// array covariance over reference element types. Primitives are
    /// assignable only from themselves.
    fn is_assignable(&self, target: &Type, source: &Type) -> bool {
        hierarchy_assignable(target, source)
    }

    /// Link (verify/prepare) a previously defined type.
    ///
    /// Fails with [`LinkError::Linkage`], propagated unchanged to callers.
    fn link(&self, ty: &Type) -> LinkResult<()>;

    /// Run the type's static initialization.
    ///
    /// Fails with [`LinkError::ExceptionInInitializer`], propagated
    /// unchanged to callers.
    fn initialize(&self, ty: &Type) -> LinkResult<()>;
}

/// Default assignability walk over the recorded hierarchy
fn hierarchy_assignable(target: &Type, source: &Type) -> bool {
    if target.id() == source.id() {
        return true;
    }
    if target.is_primitive() || source.is_primitive() {
        return false;
    }
    if target.is_array() {
        return match (target.component_type(), source.component_type()) {
            (Some(t), Some(s)) => hierarchy_assignable(t, s),
            _ => false,
        };
    }
    if let Some(superclass) = source.superclass() {
        if hierarchy_assignable(target, superclass) {
            return true;
        }
    }
    source
        .interfaces()
        .iter()
        .any(|iface| hierarchy_assignable(target, iface))
}

/// A substrate with nothing behind it: every lookup fails softly, parsing
/// always rejects, declared member sets are empty. Useful for embedders
/// that install all types through loader hooks, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubstrate;

impl NativeSubstrate for NoopSubstrate {
    fn parse_and_define(&self, expected_name: &str, _bytes: &[u8]) -> LinkResult<TypeRecord> {
        Err(LinkError::MalformedClass {
            name: expected_name.to_string(),
            reason: "no substrate installed".to_string(),
        })
    }

    fn bootstrap_lookup(&self, name: &str) -> LinkResult<TypeRecord> {
        Err(LinkError::not_found(name))
    }

    fn declared_members_of(&self, _ty: &Type) -> LinkResult<DeclaredMembers> {
        Ok(DeclaredMembers::new())
    }

    fn link(&self, _ty: &Type) -> LinkResult<()> {
        Ok(())
    }

    fn initialize(&self, _ty: &Type) -> LinkResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_substrate_rejects_everything() {
        let substrate = NoopSubstrate;
        assert!(matches!(
            substrate.parse_and_define("a.B", b"bytes"),
            Err(LinkError::MalformedClass { .. })
        ));
        assert!(matches!(
            substrate.bootstrap_lookup("a.B"),
            Err(LinkError::TypeNotFound { .. })
        ));
    }

    #[test]
    fn test_record_builders() {
        let record = TypeRecord::interface("a.I");
        assert_eq!(record.kind, TypeKind::Interface);
        assert!(record.modifiers.contains(Modifiers::ABSTRACT));

        let record = TypeRecord::class("a.C").with_modifiers(Modifiers::PUBLIC.union(Modifiers::FINAL));
        assert!(record.modifiers.contains(Modifiers::FINAL));
    }

    #[test]
    fn test_super_and_interfaces_reads_stored_links() {
        let substrate = NoopSubstrate;
        let base = Type::from_record(TypeRecord::class("a.Base"), Arc::new(NoopSubstrate));
        let ty = Type::from_record(
            TypeRecord::class("a.Leaf").with_superclass(Some(Arc::clone(&base))),
            Arc::new(NoopSubstrate),
        );
        let (superclass, interfaces) = substrate.super_and_interfaces_of(&ty);
        assert!(Arc::ptr_eq(&superclass.unwrap(), &base));
        assert!(interfaces.is_empty());
    }
}
