//! Tava Runtime Linking Core
//!
//! The dynamic-linking and type-metadata core of the Tava managed runtime:
//! - **Loader delegation engine**: parent-first type loading, definition,
//!   packages, resources, and assertion switches (`loader` module)
//! - **Type objects and reflective caches**: member metadata and
//!   generics/annotation snapshots, populated once and then immutable
//!   (`ty` module)
//! - **Runtime context**: the process-wide home of the bootstrap loader and
//!   the injected substrate/capability seams (`runtime` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tava_engine::{AllowAll, ClassLoader, NoHooks, RuntimeContext, RuntimeOptions};
//!
//! let runtime = RuntimeContext::new(substrate, Arc::new(AllowAll), RuntimeOptions::default());
//! let loader = ClassLoader::new(&runtime, "app", None, Box::new(NoHooks))?;
//! let ty = loader.load_type("com.app.Main", true)?;
//! assert_eq!(ty.name(), "com.app.Main");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod loader;
pub mod runtime;
pub mod sync;
pub mod ty;

pub use error::{LinkError, LinkResult};
pub use loader::{
    AssertionMaps, Certificate, CertificateSet, ClassLoader, CodeSource, LoaderHooks, LoaderId,
    NoHooks, Package, ProtectionDomain, Resource, Resources, SystemAssertionConfig,
    RESERVED_NAMESPACE,
};
pub use runtime::{
    AccessScope, AllowAll, AssertionOptions, CapabilityChecker, NativeSubstrate, NoopSubstrate,
    RuntimeContext, RuntimeOptions, TypeRecord, PRIMITIVE_TYPES,
};
pub use sync::OnceBarrier;
pub use ty::{
    Annotation, Constructor, DeclaredMembers, Field, GenericSignature, Method, Modifiers,
    SerializationKind, Type, TypeId, TypeKind, TypeMetadataCache,
};
