//! ClassLoader delegation engine
//!
//! Loaders form a strict tree: every loader except the bootstrap root has
//! exactly one parent, fixed at construction. A load request walks the
//! parent chain exhaustively before this loader's own hooks run, so a child
//! can never shadow a type an ancestor supplies — the delegation model's
//! core security property.
//!
//! Each loader keeps two type tables: the types it *defined* (turned bytes
//! into a live type) and the types it *initiated* (resolved through it,
//! possibly defined by an ancestor). Table writes happen under one lock per
//! loader, and the package/signer consistency check runs under that same
//! lock, atomically with the registration it guards. Concurrency on the
//! load path is idempotent re-entry, not mutual exclusion: two threads
//! racing on one name both succeed and observe the same type object.

mod assertions;
mod domain;
mod hooks;
mod package;

pub use assertions::{AssertionMaps, SystemAssertionConfig};
pub use domain::{Certificate, CertificateSet, CodeSource, ProtectionDomain};
pub use hooks::{LoaderHooks, NoHooks, Resource};
pub use package::Package;

use std::collections::hash_map::Entry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::{LinkError, LinkResult};
use crate::runtime::RuntimeContext;
use crate::ty::{package_of, Type};

/// Root of the namespace reserved for the runtime's own types
pub const RESERVED_NAMESPACE: &str = "tava";

/// Unique identifier for a class loader
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoaderId(u64);

impl LoaderId {
    /// Allocate a fresh, process-unique loader ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for LoaderId {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-loader tables, guarded together so signer checks and type
/// registration are atomic
#[derive(Default)]
struct LoaderTables {
    defined: FxHashMap<String, Arc<Type>>,
    initiated: FxHashMap<String, Arc<Type>>,
    packages: FxHashMap<String, Package>,
    signers: FxHashMap<String, CertificateSet>,
}

/// A node in the loader tree
pub struct ClassLoader {
    id: LoaderId,
    name: String,
    parent: Option<Arc<ClassLoader>>,
    runtime: Weak<RuntimeContext>,
    hooks: Box<dyn LoaderHooks>,
    tables: Mutex<LoaderTables>,
    assertions: Mutex<AssertionMaps>,
    default_domain: Arc<ProtectionDomain>,
}

impl ClassLoader {
    /// Construct a loader under `parent` (the bootstrap loader when
    /// `None`), with the given lookup hooks.
    ///
    /// Checked against the runtime's capability checker
    /// (`check_create_loader`).
    pub fn new(
        runtime: &Arc<RuntimeContext>,
        name: &str,
        parent: Option<Arc<ClassLoader>>,
        hooks: Box<dyn LoaderHooks>,
    ) -> LinkResult<Arc<ClassLoader>> {
        runtime.capabilities().check_create_loader()?;
        let parent = parent.unwrap_or_else(|| Arc::clone(runtime.bootstrap()));
        let default_status = runtime
            .system_assertions()
            .default_enabled()
            .unwrap_or(false);
        let loader = Arc::new(ClassLoader {
            id: LoaderId::new(),
            name: name.to_string(),
            parent: Some(parent),
            runtime: Arc::downgrade(runtime),
            hooks,
            tables: Mutex::new(LoaderTables::default()),
            assertions: Mutex::new(AssertionMaps::with_default(default_status)),
            default_domain: Arc::new(ProtectionDomain::unrestricted(&format!("loader:{name}"))),
        });
        runtime.register_loader(&loader);
        debug!(loader = %loader.name, id = loader.id.as_u64(), "created class loader");
        Ok(loader)
    }

    /// The parentless root loader. Built once per runtime context.
    pub(crate) fn bootstrap(
        runtime: Weak<RuntimeContext>,
        hooks: Box<dyn LoaderHooks>,
        default_assertion_status: bool,
    ) -> Arc<ClassLoader> {
        Arc::new(ClassLoader {
            id: LoaderId::new(),
            name: "bootstrap".to_string(),
            parent: None,
            runtime,
            hooks,
            tables: Mutex::new(LoaderTables::default()),
            assertions: Mutex::new(AssertionMaps::with_default(default_assertion_status)),
            default_domain: Arc::new(ProtectionDomain::unrestricted("loader:bootstrap")),
        })
    }

    /// Loader identity
    pub fn id(&self) -> LoaderId {
        self.id
    }

    /// Loader label, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent loader; `None` only for the bootstrap root
    pub fn parent(&self) -> Option<&Arc<ClassLoader>> {
        self.parent.as_ref()
    }

    /// The loader's default protection domain, used when a definition
    /// supplies none
    pub fn default_domain(&self) -> &Arc<ProtectionDomain> {
        &self.default_domain
    }

    /// The owning runtime context. A loader that outlives its runtime
    /// rejects every operation.
    fn runtime(&self) -> LinkResult<Arc<RuntimeContext>> {
        self.runtime
            .upgrade()
            .ok_or(LinkError::DefunctLoader(self.id))
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load the named type through parent-first delegation.
    ///
    /// Order: the initiated table, then the parent chain (the native
    /// bootstrap lookup for the parentless root), and only after the chain
    /// fails softly this loader's own `find_type` hook. On success this
    /// loader is registered as an initiating loader for the result. The
    /// error surfaced on total failure is the last fallback's, reported
    /// under the originally requested name.
    pub fn load_type(self: &Arc<Self>, name: &str, resolve: bool) -> LinkResult<Arc<Type>> {
        let runtime = self.runtime()?;
        runtime.capabilities().check_package_access(package_of(name))?;

        if let Some(existing) = self.tables.lock().initiated.get(name).cloned() {
            trace!(loader = %self.name, name, "initiated-table hit");
            if resolve {
                self.resolve_type(&existing)?;
            }
            return Ok(existing);
        }

        let delegated = match &self.parent {
            Some(parent) => parent.load_type(name, false),
            None => self.bootstrap_define(&runtime, name),
        };
        let ty = match delegated {
            Ok(ty) => ty,
            Err(err) if err.is_soft() => {
                trace!(loader = %self.name, name, "parent chain failed softly, trying hooks");
                self.hooks.find_type(self, name)?
            }
            Err(err) => return Err(err),
        };

        let ty = self.register_initiated(name, ty);
        if resolve {
            self.resolve_type(&ty)?;
        }
        Ok(ty)
    }

    /// Root-loader lookup: ask the substrate for a bootstrap type and
    /// define it under this loader
    fn bootstrap_define(
        self: &Arc<Self>,
        runtime: &Arc<RuntimeContext>,
        name: &str,
    ) -> LinkResult<Arc<Type>> {
        let record = runtime.substrate().bootstrap_lookup(name)?;
        if record.name != name {
            return Err(LinkError::MalformedClass {
                name: name.to_string(),
                reason: format!("bootstrap record is named {}", record.name),
            });
        }
        let ty = Type::from_record(record, Arc::clone(runtime.substrate()));
        ty.bind_domain(Arc::clone(&self.default_domain));

        let mut tables = self.tables.lock();
        // A racing lookup may have won; the loser's parse becomes a no-op.
        if let Some(existing) = tables.initiated.get(name) {
            return Ok(Arc::clone(existing));
        }
        ty.bind_defining_loader(self);
        tables.defined.insert(name.to_string(), Arc::clone(&ty));
        tables.initiated.insert(name.to_string(), Arc::clone(&ty));
        debug!(loader = %self.name, name, "bootstrap-defined type");
        Ok(ty)
    }

    /// Mark this loader as an initiating loader for `ty`. A racing
    /// registration under the same name wins and is returned instead.
    fn register_initiated(&self, name: &str, ty: Arc<Type>) -> Arc<Type> {
        let mut tables = self.tables.lock();
        match tables.initiated.entry(name.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&ty));
                ty
            }
        }
    }

    // ------------------------------------------------------------------
    // Definition
    // ------------------------------------------------------------------

    /// Turn class bytes into a live type defined by this loader.
    ///
    /// Validates the dotted name, the byte range, and the reserved
    /// namespace; applies the loader default domain when none is given;
    /// and runs the package sealing and signer checks atomically with the
    /// table registration. A failed definition leaves every table exactly
    /// as it was.
    pub fn define_type(
        self: &Arc<Self>,
        name: &str,
        bytes: &[u8],
        offset: usize,
        len: usize,
        domain: Option<Arc<ProtectionDomain>>,
    ) -> LinkResult<Arc<Type>> {
        let runtime = self.runtime()?;

        if name.is_empty() || name.contains('/') {
            return Err(LinkError::MalformedName(name.to_string()));
        }
        if name == RESERVED_NAMESPACE
            || name
                .strip_prefix(RESERVED_NAMESPACE)
                .is_some_and(|rest| rest.starts_with('.'))
        {
            return Err(LinkError::SecurityViolation(format!(
                "cannot define type in reserved namespace: {name}"
            )));
        }
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= bytes.len())
            .ok_or(LinkError::OutOfBounds {
                offset,
                len,
                buffer: bytes.len(),
            })?;

        let domain = domain.unwrap_or_else(|| Arc::clone(&self.default_domain));
        let package = package_of(name).to_string();

        let record = runtime.substrate().parse_and_define(name, &bytes[offset..end])?;
        if record.name != name {
            return Err(LinkError::MalformedClass {
                name: name.to_string(),
                reason: format!("parsed name {} does not match", record.name),
            });
        }
        let ty = Type::from_record(record, Arc::clone(runtime.substrate()));
        ty.bind_domain(Arc::clone(&domain));

        {
            let mut tables = self.tables.lock();
            if tables.defined.contains_key(name) {
                return Err(LinkError::AlreadyDefined(name.to_string()));
            }
            if let Some(pkg) = tables.packages.get(&package) {
                if let Some(seal_base) = pkg.seal_base() {
                    if seal_base != domain.location() {
                        warn!(loader = %self.name, name, %package, "sealing violation");
                        return Err(LinkError::SealedPackage {
                            package,
                            seal_base: seal_base.to_string(),
                        });
                    }
                }
            }
            match package::check_and_record(
                tables.signers.get(&package),
                domain.certificates(),
                &package,
            ) {
                Ok(Some(baseline)) => {
                    tables.signers.insert(package.clone(), baseline);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(loader = %self.name, name, %package, "signer mismatch");
                    return Err(err);
                }
            }
            ty.bind_defining_loader(self);
            tables.defined.insert(name.to_string(), Arc::clone(&ty));
            tables.initiated.insert(name.to_string(), Arc::clone(&ty));
        }
        debug!(loader = %self.name, name, "defined type");
        Ok(ty)
    }

    /// Link a previously defined-but-unlinked type. Substrate linkage
    /// errors propagate unchanged.
    pub fn resolve_type(&self, ty: &Arc<Type>) -> LinkResult<()> {
        self.runtime()?.substrate().link(ty)
    }

    /// Link and then run static initialization. Initializer failures
    /// propagate unchanged.
    pub fn initialize_type(&self, ty: &Arc<Type>) -> LinkResult<()> {
        self.resolve_type(ty)?;
        self.runtime()?.substrate().initialize(ty)
    }

    /// Install an engine-built type (primitives, arrays) as defined and
    /// initiated by this loader
    pub(crate) fn install_bootstrap_type(self: &Arc<Self>, ty: Arc<Type>) {
        ty.bind_domain(Arc::clone(&self.default_domain));
        ty.bind_defining_loader(self);
        let mut tables = self.tables.lock();
        tables
            .defined
            .insert(ty.name().to_string(), Arc::clone(&ty));
        tables.initiated.insert(ty.name().to_string(), ty);
    }

    /// The canonical array type over `component`, defined by this loader.
    /// Built and registered on first request; later requests observe the
    /// same type object.
    pub fn array_type(self: &Arc<Self>, component: &Arc<Type>) -> Arc<Type> {
        let name = format!("{}[]", component.name());
        let mut tables = self.tables.lock();
        if let Some(existing) = tables.initiated.get(&name) {
            return Arc::clone(existing);
        }
        let ty = Type::array_of(component);
        ty.bind_domain(Arc::clone(&self.default_domain));
        ty.bind_defining_loader(self);
        tables.defined.insert(name.clone(), Arc::clone(&ty));
        tables.initiated.insert(name, Arc::clone(&ty));
        ty
    }

    /// The type this loader defined under `name`, if any
    pub fn defined_type(&self, name: &str) -> Option<Arc<Type>> {
        self.tables.lock().defined.get(name).cloned()
    }

    /// The type this loader initiated under `name`, if any
    pub fn initiated_type(&self, name: &str) -> Option<Arc<Type>> {
        self.tables.lock().initiated.get(name).cloned()
    }

    /// Whether this loader is the defining loader of `ty`
    pub fn is_defining_loader_of(&self, ty: &Type) -> bool {
        ty.defining_loader().is_some_and(|l| l.id == self.id)
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Find one resource, parent-first: ancestors are searched before this
    /// loader's own hook, so an ancestor's resource shadows a descendant's
    pub fn find_resource(&self, name: &str) -> Option<Resource> {
        if let Some(parent) = &self.parent {
            if let Some(resource) = parent.find_resource(name) {
                return Some(resource);
            }
        }
        self.hooks.find_resource(name)
    }

    /// Find every matching resource as a lazy iterator.
    ///
    /// Iteration order is ancestor-first: the bootstrap loader's resources
    /// come first and shadow same-named resources further down the chain.
    /// Each loader's hook runs only when iteration reaches it.
    pub fn find_resources(self: &Arc<Self>, name: &str) -> Resources {
        let mut chain = Vec::new();
        let mut current = Some(Arc::clone(self));
        while let Some(loader) = current {
            current = loader.parent.clone();
            chain.push(loader);
        }
        chain.reverse();
        Resources {
            name: name.to_string(),
            loaders: chain.into_iter(),
            current: Vec::new().into_iter(),
        }
    }

    /// Resolve a native library name through this loader's hook, then the
    /// parent chain
    pub fn resolve_library(&self, name: &str) -> Option<PathBuf> {
        if let Some(path) = self.hooks.find_library(name) {
            return Some(path);
        }
        self.parent.as_ref().and_then(|p| p.resolve_library(name))
    }

    // ------------------------------------------------------------------
    // Packages
    // ------------------------------------------------------------------

    /// Record a package definition. Fails with
    /// [`LinkError::DuplicatePackage`] if this loader already has one under
    /// the same name.
    pub fn define_package(&self, package: Package) -> LinkResult<()> {
        let mut tables = self.tables.lock();
        if tables.packages.contains_key(package.name()) {
            return Err(LinkError::DuplicatePackage(package.name().to_string()));
        }
        tables.packages.insert(package.name().to_string(), package);
        Ok(())
    }

    /// The package record under `name`, if this loader defined one
    pub fn package(&self, name: &str) -> Option<Package> {
        self.tables.lock().packages.get(name).cloned()
    }

    /// All packages this loader defined
    pub fn packages(&self) -> Vec<Package> {
        self.tables.lock().packages.values().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Assertion status
    // ------------------------------------------------------------------

    /// Set this loader's default assertion status
    pub fn set_default_assertion_status(&self, enabled: bool) {
        self.assertions.lock().set_default_status(enabled);
    }

    /// Set an assertion status for a package prefix
    pub fn set_package_assertion_status(&self, package: &str, enabled: bool) {
        self.assertions.lock().set_package_status(package, enabled);
    }

    /// Set an assertion status for an exact type name
    pub fn set_class_assertion_status(&self, class: &str, enabled: bool) {
        self.assertions.lock().set_class_status(class, enabled);
    }

    /// Drop all recorded statuses and ignore system overrides from now on
    pub fn clear_assertion_status(&self) {
        self.assertions.lock().clear();
    }

    /// Resolve the desired assertion status for a type name defined by
    /// this loader. Without any process-wide assertion configuration every
    /// type resolves to disabled.
    pub fn desired_assertion_status(&self, type_name: &str) -> bool {
        let Ok(runtime) = self.runtime() else {
            return false;
        };
        let system = runtime.system_assertions();
        if !system.is_configured() {
            return false;
        }
        assertions::desired_status(type_name, &self.assertions.lock(), system)
    }
}

impl std::fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassLoader")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .finish()
    }
}

/// Lazy resource iterator over a loader chain, ancestor-first
pub struct Resources {
    name: String,
    loaders: std::vec::IntoIter<Arc<ClassLoader>>,
    current: std::vec::IntoIter<Resource>,
}

impl Iterator for Resources {
    type Item = Resource;

    fn next(&mut self) -> Option<Resource> {
        loop {
            if let Some(resource) = self.current.next() {
                return Some(resource);
            }
            let loader = self.loaders.next()?;
            self.current = loader.hooks.find_resources(&self.name).into_iter();
        }
    }
}
