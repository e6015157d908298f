//! Loader strategy hooks
//!
//! Concrete loaders supply their lookup strategy through [`LoaderHooks`]
//! instead of subclassing the delegation engine. The engine composes over
//! this interface: hooks are consulted only after the parent chain has
//! failed softly, so a hook can never shadow a type an ancestor supplies.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{LinkError, LinkResult};
use crate::loader::ClassLoader;
use crate::ty::Type;

/// A resource located by a loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Resource name as requested
    pub name: String,
    /// Where the resource was found (jar/url/loader label)
    pub origin: String,
}

impl Resource {
    /// Resource `name` found at `origin`
    pub fn new(name: &str, origin: &str) -> Self {
        Self {
            name: name.to_string(),
            origin: origin.to_string(),
        }
    }
}

/// Lookup strategy a concrete loader plugs into the delegation engine.
///
/// Every hook is optional; the defaults find nothing. `find_type`
/// implementations typically read bytes from their backing store and call
/// [`ClassLoader::define_type`] on the loader they were handed.
pub trait LoaderHooks: Send + Sync {
    /// Produce the named type, or fail softly with
    /// [`LinkError::TypeNotFound`]
    fn find_type(&self, loader: &Arc<ClassLoader>, name: &str) -> LinkResult<Arc<Type>> {
        let _ = loader;
        Err(LinkError::not_found(name))
    }

    /// Locate a single resource owned by this loader
    fn find_resource(&self, name: &str) -> Option<Resource> {
        let _ = name;
        None
    }

    /// Locate every matching resource owned by this loader
    fn find_resources(&self, name: &str) -> Vec<Resource> {
        self.find_resource(name).into_iter().collect()
    }

    /// Locate a native library by its platform-independent name
    fn find_library(&self, name: &str) -> Option<PathBuf> {
        let _ = name;
        None
    }
}

/// Hooks that find nothing; the bootstrap default
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl LoaderHooks for NoHooks {}
