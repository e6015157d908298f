//! Process-wide runtime context
//!
//! One [`RuntimeContext`] replaces the global singletons the linking core
//! would otherwise need: the bootstrap loader, the shared default
//! protection domain, the system-level assertion configuration, and the
//! injected native substrate and capability checker. It is constructed
//! exactly once per embedding and passed (as an `Arc`) to every loader at
//! construction; there is no implicit static lazy-init anywhere in the
//! crate.

pub mod capability;
pub mod substrate;

pub use capability::{AccessScope, AllowAll, CapabilityChecker};
pub use substrate::{NativeSubstrate, NoopSubstrate, TypeRecord};

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use crate::loader::{
    ClassLoader, LoaderHooks, LoaderId, NoHooks, ProtectionDomain, SystemAssertionConfig,
};
use crate::error::LinkResult;
use crate::ty::Type;

/// Primitive type names pre-registered by the bootstrap loader
pub const PRIMITIVE_TYPES: [&str; 7] = ["bool", "int", "long", "float", "double", "char", "unit"];

/// Command-line style assertion switches.
///
/// Entries ending in `...` address a package recursively (`"com.foo..."`
/// enables `com.foo` and everything below it; `"..."` addresses the
/// unnamed package); other entries address an exact type name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssertionOptions {
    /// Names/packages to enable assertions for
    #[serde(default)]
    pub enable: Vec<String>,
    /// Names/packages to disable assertions for
    #[serde(default)]
    pub disable: Vec<String>,
    /// Process-wide default, seeding every loader's default status
    #[serde(default, rename = "default")]
    pub default_enabled: Option<bool>,
}

/// Runtime construction options, deserializable from TOML:
///
/// ```toml
/// [assertions]
/// enable = ["com.app...", "com.lib.Main"]
/// disable = ["com.app.noisy..."]
/// default = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeOptions {
    /// Assertion switches
    #[serde(default)]
    pub assertions: AssertionOptions,
}

impl RuntimeOptions {
    /// Parse options from a TOML document
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}

fn system_assertions_from(options: &AssertionOptions) -> SystemAssertionConfig {
    let mut config = SystemAssertionConfig::default();
    for (entries, enabled) in [(&options.enable, true), (&options.disable, false)] {
        for entry in entries {
            match entry.strip_suffix("...") {
                Some(package) => {
                    config.set_package_override(package.trim_end_matches('.'), enabled)
                }
                None => config.set_class_override(entry, enabled),
            }
        }
    }
    if let Some(default_enabled) = options.default_enabled {
        config.set_default(default_enabled);
    }
    config
}

/// The process-wide context every delegation engine instance hangs off
pub struct RuntimeContext {
    substrate: Arc<dyn NativeSubstrate>,
    capabilities: Arc<dyn CapabilityChecker>,
    system_assertions: SystemAssertionConfig,
    default_domain: Arc<ProtectionDomain>,
    bootstrap: Arc<ClassLoader>,
    loaders: DashMap<LoaderId, Weak<ClassLoader>>,
}

impl RuntimeContext {
    /// Build a runtime context with a hook-less bootstrap loader
    pub fn new(
        substrate: Arc<dyn NativeSubstrate>,
        capabilities: Arc<dyn CapabilityChecker>,
        options: RuntimeOptions,
    ) -> Arc<RuntimeContext> {
        Self::with_bootstrap_hooks(substrate, capabilities, options, Box::new(NoHooks))
    }

    /// Build a runtime context whose bootstrap loader searches
    /// `bootstrap_hooks` for resources (the classpath fallback)
    pub fn with_bootstrap_hooks(
        substrate: Arc<dyn NativeSubstrate>,
        capabilities: Arc<dyn CapabilityChecker>,
        options: RuntimeOptions,
        bootstrap_hooks: Box<dyn LoaderHooks>,
    ) -> Arc<RuntimeContext> {
        let system_assertions = system_assertions_from(&options.assertions);
        let default_status = system_assertions.default_enabled().unwrap_or(false);
        let context = Arc::new_cyclic(|weak: &Weak<RuntimeContext>| {
            let bootstrap = ClassLoader::bootstrap(weak.clone(), bootstrap_hooks, default_status);
            RuntimeContext {
                substrate,
                capabilities,
                system_assertions,
                default_domain: Arc::new(ProtectionDomain::unrestricted("runtime")),
                bootstrap,
                loaders: DashMap::new(),
            }
        });
        context
            .loaders
            .insert(context.bootstrap.id(), Arc::downgrade(&context.bootstrap));
        for name in PRIMITIVE_TYPES {
            let ty = Type::primitive(name, Arc::clone(&context.substrate));
            context.bootstrap.install_bootstrap_type(ty);
        }
        debug!("runtime context initialized");
        context
    }

    /// The bootstrap (root) loader
    pub fn bootstrap(&self) -> &Arc<ClassLoader> {
        &self.bootstrap
    }

    /// The native substrate
    pub fn substrate(&self) -> &Arc<dyn NativeSubstrate> {
        &self.substrate
    }

    /// The capability checker
    pub fn capabilities(&self) -> &Arc<dyn CapabilityChecker> {
        &self.capabilities
    }

    /// The shared "everything" protection domain
    pub fn default_domain(&self) -> &Arc<ProtectionDomain> {
        &self.default_domain
    }

    /// Process-wide assertion configuration
    pub fn system_assertions(&self) -> &SystemAssertionConfig {
        &self.system_assertions
    }

    pub(crate) fn register_loader(&self, loader: &Arc<ClassLoader>) {
        self.loaders.insert(loader.id(), Arc::downgrade(loader));
    }

    /// Look up a live loader by ID
    pub fn loader(&self, id: LoaderId) -> Option<Arc<ClassLoader>> {
        self.loaders.get(&id).and_then(|entry| entry.upgrade())
    }

    /// The defining loader of `ty`, behind the `check_get_class_loader`
    /// capability. `None` means the loader has been reclaimed.
    pub fn class_loader_of(&self, ty: &Type) -> LinkResult<Option<Arc<ClassLoader>>> {
        self.capabilities.check_get_class_loader()?;
        Ok(ty.defining_loader())
    }

    /// The canonical array type over `component`, registered with the
    /// component's defining loader (the bootstrap loader for engine-built
    /// component types)
    pub fn array_type(&self, component: &Arc<Type>) -> Arc<Type> {
        let loader = component
            .defining_loader()
            .unwrap_or_else(|| Arc::clone(&self.bootstrap));
        loader.array_type(component)
    }

    /// A pre-registered primitive type by name
    pub fn primitive(&self, name: &str) -> Option<Arc<Type>> {
        self.bootstrap
            .initiated_type(name)
            .filter(|ty| ty.is_primitive())
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("bootstrap", &self.bootstrap.id())
            .field("loaders", &self.loaders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_with(options: RuntimeOptions) -> Arc<RuntimeContext> {
        RuntimeContext::new(Arc::new(NoopSubstrate), Arc::new(AllowAll), options)
    }

    #[test]
    fn test_primitives_preregistered() {
        let runtime = runtime_with(RuntimeOptions::default());
        for name in PRIMITIVE_TYPES {
            let ty = runtime.primitive(name).expect(name);
            assert!(ty.is_primitive());
            assert!(runtime.bootstrap().is_defining_loader_of(&ty));
        }
        assert!(runtime.primitive("missing").is_none());
    }

    #[test]
    fn test_array_types_are_canonical() {
        let runtime = runtime_with(RuntimeOptions::default());
        let int = runtime.primitive("int").unwrap();

        let arr = runtime.array_type(&int);
        assert!(arr.is_array());
        assert_eq!(arr.name(), "int[]");
        assert!(Arc::ptr_eq(arr.component_type().unwrap(), &int));
        assert!(runtime.bootstrap().is_defining_loader_of(&arr));

        // Repeated requests observe the same type object, also by name.
        assert!(Arc::ptr_eq(&runtime.array_type(&int), &arr));
        let by_name = runtime.bootstrap().load_type("int[]", false).unwrap();
        assert!(Arc::ptr_eq(&by_name, &arr));
    }

    #[test]
    fn test_loader_registry_tracks_liveness() {
        let runtime = runtime_with(RuntimeOptions::default());
        let loader =
            ClassLoader::new(&runtime, "app", None, Box::new(NoHooks)).unwrap();
        let id = loader.id();
        assert!(runtime.loader(id).is_some());

        drop(loader);
        assert!(runtime.loader(id).is_none());
    }

    #[test]
    fn test_options_from_toml() {
        let options = RuntimeOptions::from_toml(
            r#"
            [assertions]
            enable = ["com.app...", "com.lib.Main"]
            disable = ["com.app.noisy..."]
            default = true
            "#,
        )
        .unwrap();
        assert_eq!(options.assertions.enable.len(), 2);
        assert_eq!(options.assertions.default_enabled, Some(true));

        let config = system_assertions_from(&options.assertions);
        assert!(config.is_configured());
        assert_eq!(config.default_enabled(), Some(true));
    }

    #[test]
    fn test_unconfigured_options_disable_everything() {
        let config = system_assertions_from(&AssertionOptions::default());
        assert!(!config.is_configured());
    }

    #[test]
    fn test_package_suffix_parsing() {
        let options = AssertionOptions {
            enable: vec!["com.foo...".to_string(), "...".to_string()],
            disable: vec![],
            default_enabled: None,
        };
        let config = system_assertions_from(&options);
        assert!(config.is_configured());
    }
}
