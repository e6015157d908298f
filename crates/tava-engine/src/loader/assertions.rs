//! Assertion status resolution
//!
//! Per-loader and system-wide assertion switches, resolved most specific
//! first: exact class name, then system exact name, then the package chain
//! from most to least specific, then system package overrides, then the
//! loader default. A loader that cleared its statuses ignores the system
//! overrides but still honors its own maps. If no assertion configuration
//! exists anywhere in the process, everything resolves to disabled.

use rustc_hash::FxHashMap;

/// Per-loader assertion status maps
#[derive(Debug, Clone)]
pub struct AssertionMaps {
    class_status: FxHashMap<String, bool>,
    package_status: FxHashMap<String, bool>,
    default_status: bool,
    system_cleared: bool,
}

impl AssertionMaps {
    /// Empty maps with the given default status
    pub fn with_default(default_status: bool) -> Self {
        Self {
            class_status: FxHashMap::default(),
            package_status: FxHashMap::default(),
            default_status,
            system_cleared: false,
        }
    }

    /// Record an exact-name status
    pub fn set_class_status(&mut self, class: &str, enabled: bool) {
        self.class_status.insert(class.to_string(), enabled);
    }

    /// Record a package-prefix status. The empty string addresses the
    /// unnamed package.
    pub fn set_package_status(&mut self, package: &str, enabled: bool) {
        self.package_status.insert(package.to_string(), enabled);
    }

    /// Set the loader default status
    pub fn set_default_status(&mut self, enabled: bool) {
        self.default_status = enabled;
    }

    /// Drop all recorded statuses, reset the default to disabled, and
    /// ignore system overrides from now on
    pub fn clear(&mut self) {
        self.class_status.clear();
        self.package_status.clear();
        self.default_status = false;
        self.system_cleared = true;
    }
}

impl Default for AssertionMaps {
    fn default() -> Self {
        Self::with_default(false)
    }
}

/// Process-wide (command-line/config) assertion overrides
#[derive(Debug, Clone, Default)]
pub struct SystemAssertionConfig {
    class_overrides: FxHashMap<String, bool>,
    package_overrides: FxHashMap<String, bool>,
    default_enabled: Option<bool>,
}

impl SystemAssertionConfig {
    /// Record a system exact-name override
    pub fn set_class_override(&mut self, class: &str, enabled: bool) {
        self.class_overrides.insert(class.to_string(), enabled);
    }

    /// Record a system package override
    pub fn set_package_override(&mut self, package: &str, enabled: bool) {
        self.package_overrides.insert(package.to_string(), enabled);
    }

    /// Set the system-wide default
    pub fn set_default(&mut self, enabled: bool) {
        self.default_enabled = Some(enabled);
    }

    /// The system-wide default, used to seed loader defaults
    pub fn default_enabled(&self) -> Option<bool> {
        self.default_enabled
    }

    /// Whether any assertion configuration exists at all. When false, every
    /// type resolves to disabled as a fast path.
    pub fn is_configured(&self) -> bool {
        self.default_enabled.is_some()
            || !self.class_overrides.is_empty()
            || !self.package_overrides.is_empty()
    }
}

/// Resolve the desired assertion status for `type_name`.
///
/// The caller is responsible for the global unconfigured fast path.
pub(crate) fn desired_status(
    type_name: &str,
    maps: &AssertionMaps,
    system: &SystemAssertionConfig,
) -> bool {
    let top_level = top_level_name(type_name);

    // 1. Exact name in the loader's class map.
    if let Some(&status) = maps.class_status.get(top_level) {
        return status;
    }
    // 2. System exact-name override, unless cleared.
    if !maps.system_cleared {
        if let Some(&status) = system.class_overrides.get(top_level) {
            return status;
        }
    }
    // 3. Loader package map, most specific first, down to "".
    for package in package_chain(top_level) {
        if let Some(&status) = maps.package_status.get(package) {
            return status;
        }
    }
    // 4. System package overrides, unless cleared.
    if !maps.system_cleared {
        for package in package_chain(top_level) {
            if let Some(&status) = system.package_overrides.get(package) {
                return status;
            }
        }
    }
    // 5. Loader default.
    maps.default_status
}

/// Strip a nested-type suffix: assertion statuses key on the top-level
/// enclosing type's name
fn top_level_name(type_name: &str) -> &str {
    match type_name.find('$') {
        Some(idx) => &type_name[..idx],
        None => type_name,
    }
}

/// Package names of `type_name` from most to least specific, ending with
/// the unnamed package ""
fn package_chain(type_name: &str) -> impl Iterator<Item = &str> {
    let package = crate::ty::package_of(type_name);
    let mut next = if package.is_empty() { None } else { Some(package) };
    let mut done = false;
    std::iter::from_fn(move || {
        if let Some(current) = next {
            next = match current.rfind('.') {
                Some(idx) => Some(&current[..idx]),
                None => None,
            };
            Some(current)
        } else if !done {
            done = true;
            Some("")
        } else {
            None
        }
    })
}
