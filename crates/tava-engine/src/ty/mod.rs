//! Runtime type objects
//!
//! A [`Type`] is the canonical, process-unique representation of a loaded
//! class, interface, array, or primitive. Identity is by object: two loads
//! of the same name through the same delegation chain observe the same
//! `Arc<Type>`. The binary name, kind, and hierarchy links never change
//! after construction; the defining loader and protection domain are
//! assigned exactly once at registration time.
//!
//! Reflective facts live in two lazily populated caches owned by the type:
//! the member/metadata cache ([`metadata`]) and the generics/annotation
//! cache ([`generics`]). Once a cache field is observed populated it is
//! permanently stable and safe to read without synchronization.

mod generics;
mod member;
mod metadata;

pub use generics::{Annotation, GenericSignature};
pub use member::{Constructor, DeclaredMembers, Field, Method};
pub use metadata::TypeMetadataCache;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::error::{LinkError, LinkResult};
use crate::loader::{ClassLoader, ProtectionDomain};
use crate::runtime::capability::CapabilityChecker;
use crate::runtime::substrate::{NativeSubstrate, TypeRecord};

use generics::GenericsCache;

/// Process-unique identity of a loaded type
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u64);

impl TypeId {
    /// Allocate a fresh, process-unique type ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::new()
    }
}

/// What kind of type this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Ordinary class
    Class,
    /// Interface
    Interface,
    /// Array type; carries a component type
    Array,
    /// Primitive (`int`, `bool`, ...), pre-registered by the bootstrap loader
    Primitive,
}

/// Declaration modifiers, packed as const bitflags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    /// No modifiers
    pub const NONE: Self = Self(0x0000);
    /// `public`
    pub const PUBLIC: Self = Self(0x0001);
    /// `private`
    pub const PRIVATE: Self = Self(0x0002);
    /// `protected`
    pub const PROTECTED: Self = Self(0x0004);
    /// `static`
    pub const STATIC: Self = Self(0x0008);
    /// `final`
    pub const FINAL: Self = Self(0x0010);
    /// `abstract`
    pub const ABSTRACT: Self = Self(0x0400);

    /// Create from raw bits
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Whether all flags in `other` are set
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of two modifier sets
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether the `public` flag is set
    pub const fn is_public(&self) -> bool {
        self.contains(Self::PUBLIC)
    }
}

/// Serialization classification of a type, computed once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationKind {
    /// Implements neither marker interface
    None,
    /// Implements `tava.io.Serializable`
    Serializable,
    /// Implements `tava.io.Externalizable` (wins over `Serializable`)
    Externalizable,
}

/// Marker interface recognized for [`SerializationKind::Serializable`]
pub const SERIALIZABLE_INTERFACE: &str = "tava.io.Serializable";
/// Marker interface recognized for [`SerializationKind::Externalizable`]
pub const EXTERNALIZABLE_INTERFACE: &str = "tava.io.Externalizable";

/// A loaded class, interface, array, or primitive type
pub struct Type {
    id: TypeId,
    name: String,
    package: String,
    kind: TypeKind,
    modifiers: Modifiers,
    superclass: Option<Arc<Type>>,
    interfaces: Vec<Arc<Type>>,
    component: Option<Arc<Type>>,
    substrate: Arc<dyn NativeSubstrate>,
    defining_loader: OnceCell<Weak<ClassLoader>>,
    domain: OnceCell<Arc<ProtectionDomain>>,
    serialization: OnceCell<SerializationKind>,
    metadata: TypeMetadataCache,
    generics: GenericsCache,
}

impl Type {
    /// Wrap a substrate-produced record into a live type object.
    ///
    /// The defining loader and protection domain are bound later, at
    /// registration time, by the loader that commits the definition.
    pub fn from_record(record: TypeRecord, substrate: Arc<dyn NativeSubstrate>) -> Arc<Type> {
        let TypeRecord {
            name,
            kind,
            modifiers,
            superclass,
            interfaces,
            declared_annotations,
            generic_signature,
        } = record;
        let package = package_of(&name).to_string();
        Arc::new(Type {
            id: TypeId::new(),
            name,
            package,
            kind,
            modifiers,
            superclass,
            interfaces,
            component: None,
            substrate,
            defining_loader: OnceCell::new(),
            domain: OnceCell::new(),
            serialization: OnceCell::new(),
            metadata: TypeMetadataCache::new(),
            generics: GenericsCache::new(declared_annotations, generic_signature),
        })
    }

    /// Create a primitive type. Pre-registered by the bootstrap loader.
    pub fn primitive(name: &str, substrate: Arc<dyn NativeSubstrate>) -> Arc<Type> {
        Arc::new(Type {
            id: TypeId::new(),
            name: name.to_string(),
            package: String::new(),
            kind: TypeKind::Primitive,
            modifiers: Modifiers::PUBLIC.union(Modifiers::FINAL),
            superclass: None,
            interfaces: Vec::new(),
            component: None,
            substrate,
            defining_loader: OnceCell::new(),
            domain: OnceCell::new(),
            serialization: OnceCell::new(),
            metadata: TypeMetadataCache::new(),
            generics: GenericsCache::new(Vec::new(), None),
        })
    }

    /// Create the array type over `component`.
    ///
    /// The array shares the component's defining loader; callers register it
    /// with that loader.
    pub fn array_of(component: &Arc<Type>) -> Arc<Type> {
        Arc::new(Type {
            id: TypeId::new(),
            name: format!("{}[]", component.name),
            package: component.package.clone(),
            kind: TypeKind::Array,
            modifiers: Modifiers::PUBLIC.union(Modifiers::FINAL),
            superclass: None,
            interfaces: Vec::new(),
            component: Some(Arc::clone(component)),
            substrate: Arc::clone(&component.substrate),
            defining_loader: OnceCell::new(),
            domain: OnceCell::new(),
            serialization: OnceCell::new(),
            metadata: TypeMetadataCache::new(),
            generics: GenericsCache::new(Vec::new(), None),
        })
    }

    /// Process-unique identity
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Binary (dotted) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package name: everything before the last dot, or `""`
    pub fn package_name(&self) -> &str {
        &self.package
    }

    /// Kind of this type
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Declaration modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether this is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Whether this is a primitive type
    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    /// Whether this is an array type
    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    /// Component type of an array, `None` otherwise
    pub fn component_type(&self) -> Option<&Arc<Type>> {
        self.component.as_ref()
    }

    /// Direct superclass, `None` for interfaces, primitives, and the root
    pub fn superclass(&self) -> Option<&Arc<Type>> {
        self.superclass.as_ref()
    }

    /// Directly implemented (or extended) interfaces
    pub fn interfaces(&self) -> &[Arc<Type>] {
        &self.interfaces
    }

    /// The substrate that produced this type
    pub(crate) fn substrate(&self) -> &Arc<dyn NativeSubstrate> {
        &self.substrate
    }

    /// Bind the defining loader. Effective at most once; later calls are
    /// ignored and report `false`.
    pub(crate) fn bind_defining_loader(&self, loader: &Arc<ClassLoader>) -> bool {
        self.defining_loader.set(Arc::downgrade(loader)).is_ok()
    }

    /// The loader that defined this type, if it is still alive
    pub fn defining_loader(&self) -> Option<Arc<ClassLoader>> {
        self.defining_loader.get().and_then(Weak::upgrade)
    }

    /// Bind the protection domain. Effective at most once.
    pub(crate) fn bind_domain(&self, domain: Arc<ProtectionDomain>) {
        let _ = self.domain.set(domain);
    }

    /// Protection domain. Registration always binds one; an unregistered
    /// type reports the shared unrestricted default.
    pub fn protection_domain(&self) -> Arc<ProtectionDomain> {
        Arc::clone(
            self.domain
                .get_or_init(|| Arc::new(ProtectionDomain::unrestricted("<unbound>"))),
        )
    }

    /// Serialization classification, computed on first access
    pub fn serialization_kind(&self) -> SerializationKind {
        *self.serialization.get_or_init(|| {
            if self.implements(EXTERNALIZABLE_INTERFACE) {
                SerializationKind::Externalizable
            } else if self.implements(SERIALIZABLE_INTERFACE) {
                SerializationKind::Serializable
            } else {
                SerializationKind::None
            }
        })
    }

    /// Whether this type or any supertype names `interface_name` among its
    /// interfaces
    fn implements(&self, interface_name: &str) -> bool {
        fn interface_reaches(iface: &Type, name: &str) -> bool {
            iface.name == name
                || iface
                    .interfaces
                    .iter()
                    .any(|parent| interface_reaches(parent, name))
        }
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty
                .interfaces
                .iter()
                .any(|iface| interface_reaches(iface, interface_name))
            {
                return true;
            }
            current = ty.superclass.as_deref();
        }
        false
    }

    /// Whether a value of type `source` can be assigned to this type
    pub fn is_assignable_from(&self, source: &Type) -> bool {
        self.substrate.is_assignable(self, source)
    }

    /// Whether a value whose dynamic type is `runtime_type` is an instance
    /// of this type
    pub fn is_instance(&self, runtime_type: &Type) -> bool {
        self.is_assignable_from(runtime_type)
    }

    // ------------------------------------------------------------------
    // Member metadata cache (populated at most once, lazily)
    // ------------------------------------------------------------------

    /// Fields declared directly by this type
    pub fn declared_fields(&self) -> LinkResult<Vec<Field>> {
        self.metadata.declared_fields(self)
    }

    /// Methods declared directly by this type
    pub fn declared_methods(&self) -> LinkResult<Vec<Method>> {
        self.metadata.declared_methods(self)
    }

    /// Constructors declared directly by this type
    pub fn declared_constructors(&self) -> LinkResult<Vec<Constructor>> {
        self.metadata.declared_constructors(self)
    }

    /// Public fields: declared-public plus inherited public fields,
    /// deduplicated by signature and declaring type
    pub fn public_fields(&self) -> LinkResult<Vec<Field>> {
        self.metadata.public_fields(self)
    }

    /// Public methods: declared-public plus inherited public methods,
    /// deduplicated by signature and declaring type
    pub fn public_methods(&self) -> LinkResult<Vec<Method>> {
        self.metadata.public_methods(self)
    }

    /// Public constructors (constructors are never inherited)
    pub fn public_constructors(&self) -> LinkResult<Vec<Constructor>> {
        self.metadata.public_constructors(self)
    }

    /// The unique zero-parameter constructor, or [`LinkError::NoSuchMethod`]
    pub fn default_constructor(&self) -> LinkResult<Constructor> {
        self.metadata.default_constructor(self)
    }

    /// The default constructor, promoted for instantiation.
    ///
    /// The first caller performs the one-time access check and marking;
    /// concurrent callers block until that completes and then reuse the
    /// promoted constructor without re-checking.
    pub fn promoted_default_constructor(
        &self,
        checker: &dyn CapabilityChecker,
    ) -> LinkResult<Constructor> {
        self.metadata.promoted_default_constructor(self, checker)
    }

    /// Look up a public field by name, searching the merged public view
    pub fn public_field(&self, name: &str) -> LinkResult<Field> {
        self.public_fields()?
            .into_iter()
            .find(|field| field.name == name)
            .ok_or_else(|| LinkError::NoSuchField(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Generics/annotation cache
    // ------------------------------------------------------------------

    /// Annotations declared directly on this type (defensive copy)
    pub fn declared_annotations(&self) -> Vec<Annotation> {
        self.generics.declared_annotations()
    }

    /// Declared annotations merged with inheritable superclass annotations;
    /// declared annotations shadow inherited ones of the same annotation
    /// type. Interfaces never inherit annotations this way.
    pub fn all_annotations(&self) -> Vec<Annotation> {
        self.generics.all_annotations(self)
    }

    /// Generic superclass signature, if one was recorded
    pub fn generic_superclass(&self) -> Option<String> {
        self.generics.generic_superclass()
    }

    /// Generic interface signatures (defensive copy)
    pub fn generic_interfaces(&self) -> Vec<String> {
        self.generics.generic_interfaces()
    }

    /// Declared type parameters (defensive copy)
    pub fn type_parameters(&self) -> Vec<String> {
        self.generics.type_parameters()
    }

    /// Drop the merged annotation snapshot (the evictable secondary tier).
    /// The next [`Type::all_annotations`] call recomputes it; recomputation
    /// is idempotent.
    pub fn evict_annotation_snapshot(&self) {
        self.generics.evict_merged()
    }

    /// Resolved assertion status for this type, per its defining loader
    pub fn desired_assertion_status(&self) -> bool {
        match self.defining_loader() {
            Some(loader) => loader.desired_assertion_status(&self.name),
            None => false,
        }
    }
}

impl std::fmt::Debug for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Type")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Package name of a dotted binary name: everything before the last dot
pub(crate) fn package_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::substrate::NoopSubstrate;

    fn noop() -> Arc<dyn NativeSubstrate> {
        Arc::new(NoopSubstrate)
    }

    fn class(name: &str, superclass: Option<Arc<Type>>, interfaces: Vec<Arc<Type>>) -> Arc<Type> {
        Type::from_record(
            TypeRecord::class(name)
                .with_superclass(superclass)
                .with_interfaces(interfaces),
            noop(),
        )
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("com.app.Main"), "com.app");
        assert_eq!(package_of("Main"), "");
        assert_eq!(package_of("com.app.Main[]"), "com.app");
    }

    #[test]
    fn test_modifiers_bits() {
        let m = Modifiers::PUBLIC.union(Modifiers::FINAL);
        assert!(m.is_public());
        assert!(m.contains(Modifiers::FINAL));
        assert!(!m.contains(Modifiers::STATIC));
        assert_eq!(Modifiers::from_bits(m.bits()), m);
    }

    #[test]
    fn test_type_ids_unique() {
        let a = class("a.A", None, vec![]);
        let b = class("a.B", None, vec![]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_kind_predicates() {
        let iface = Type::from_record(TypeRecord::interface("a.I"), noop());
        assert!(iface.is_interface());
        assert!(!iface.is_array());

        let prim = Type::primitive("int", noop());
        assert!(prim.is_primitive());
        assert_eq!(prim.package_name(), "");

        let elem = class("a.A", None, vec![]);
        let arr = Type::array_of(&elem);
        assert!(arr.is_array());
        assert_eq!(arr.name(), "a.A[]");
        assert!(Arc::ptr_eq(arr.component_type().unwrap(), &elem));
    }

    #[test]
    fn test_serialization_kind_from_marker_interfaces() {
        let serializable = Type::from_record(TypeRecord::interface(SERIALIZABLE_INTERFACE), noop());
        let externalizable =
            Type::from_record(TypeRecord::interface(EXTERNALIZABLE_INTERFACE), noop());

        let plain = class("a.Plain", None, vec![]);
        assert_eq!(plain.serialization_kind(), SerializationKind::None);

        let ser = class("a.Ser", None, vec![Arc::clone(&serializable)]);
        assert_eq!(ser.serialization_kind(), SerializationKind::Serializable);

        // Inherited through the superclass chain.
        let sub = class("a.Sub", Some(Arc::clone(&ser)), vec![]);
        assert_eq!(sub.serialization_kind(), SerializationKind::Serializable);

        // Externalizable wins over Serializable.
        let ext = class(
            "a.Ext",
            Some(ser),
            vec![externalizable],
        );
        assert_eq!(ext.serialization_kind(), SerializationKind::Externalizable);
    }

    #[test]
    fn test_serialization_marker_through_super_interface() {
        let serializable = Type::from_record(TypeRecord::interface(SERIALIZABLE_INTERFACE), noop());
        let marker = Type::from_record(
            TypeRecord::interface("a.Marker").with_interfaces(vec![serializable]),
            noop(),
        );
        let ty = class("a.C", None, vec![marker]);
        assert_eq!(ty.serialization_kind(), SerializationKind::Serializable);
    }

    #[test]
    fn test_assignability_hierarchy_walk() {
        let base = class("a.Base", None, vec![]);
        let mid = class("a.Mid", Some(Arc::clone(&base)), vec![]);
        let leaf = class("a.Leaf", Some(Arc::clone(&mid)), vec![]);

        assert!(base.is_assignable_from(&leaf));
        assert!(base.is_assignable_from(&base));
        assert!(!leaf.is_assignable_from(&base));
        assert!(base.is_instance(&mid));
    }

    #[test]
    fn test_assignability_interfaces_and_arrays() {
        let iface = Type::from_record(TypeRecord::interface("a.I"), noop());
        let impl_ty = class("a.Impl", None, vec![Arc::clone(&iface)]);
        assert!(iface.is_assignable_from(&impl_ty));

        // Array covariance over reference element types.
        let base = class("a.Base", None, vec![]);
        let leaf = class("a.Leaf", Some(Arc::clone(&base)), vec![]);
        let base_arr = Type::array_of(&base);
        let leaf_arr = Type::array_of(&leaf);
        assert!(base_arr.is_assignable_from(&leaf_arr));
        assert!(!leaf_arr.is_assignable_from(&base_arr));

        // Primitives are assignable only from themselves.
        let int_a = Type::primitive("int", noop());
        let int_b = Type::primitive("int", noop());
        assert!(int_a.is_assignable_from(&int_a));
        assert!(!int_a.is_assignable_from(&int_b));
    }

    #[test]
    fn test_domain_defaults_to_unrestricted() {
        let ty = class("a.A", None, vec![]);
        let domain = ty.protection_domain();
        assert!(domain.certificates().is_empty());
    }
}
