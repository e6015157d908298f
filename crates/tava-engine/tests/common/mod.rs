//! Shared fixtures for linking-core integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use tava_engine::{
    Annotation, ClassLoader, DeclaredMembers, LinkError, LinkResult, LoaderHooks, NativeSubstrate,
    Resource, Type, TypeRecord,
};

/// Class bytes in the fixture wire format: the bytes are the dotted name.
pub fn class_bytes(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Substrate serving a configurable universe of well-formed classes.
///
/// The "wire format" is trivial: a class's bytes are its own dotted name,
/// so any other byte sequence is a structural defect.
pub struct FixtureSubstrate {
    bootstrap_names: Mutex<HashSet<String>>,
    members: Mutex<HashMap<String, DeclaredMembers>>,
    annotations: Mutex<HashMap<String, Vec<Annotation>>>,
    superclasses: Mutex<HashMap<String, Arc<Type>>>,
    failing_links: Mutex<HashSet<String>>,
    bootstrap_lookups: AtomicUsize,
}

impl FixtureSubstrate {
    pub fn new() -> Self {
        Self {
            bootstrap_names: Mutex::new(HashSet::new()),
            members: Mutex::new(HashMap::new()),
            annotations: Mutex::new(HashMap::new()),
            superclasses: Mutex::new(HashMap::new()),
            failing_links: Mutex::new(HashSet::new()),
            bootstrap_lookups: AtomicUsize::new(0),
        }
    }

    /// Make `name` resolvable through the bootstrap lookup
    pub fn add_bootstrap(&self, name: &str) {
        self.bootstrap_names.lock().insert(name.to_string());
    }

    /// Serve `members` for the named type
    pub fn put_members(&self, name: &str, members: DeclaredMembers) {
        self.members.lock().insert(name.to_string(), members);
    }

    /// Attach declared annotations to future records of `name`
    pub fn put_annotations(&self, name: &str, annotations: Vec<Annotation>) {
        self.annotations.lock().insert(name.to_string(), annotations);
    }

    /// Attach a superclass to future records of `name`
    pub fn set_superclass(&self, name: &str, superclass: Arc<Type>) {
        self.superclasses
            .lock()
            .insert(name.to_string(), superclass);
    }

    /// Make linking fail for the named type
    pub fn fail_link(&self, name: &str) {
        self.failing_links.lock().insert(name.to_string());
    }

    /// How many bootstrap lookups reached the substrate
    pub fn bootstrap_lookups(&self) -> usize {
        self.bootstrap_lookups.load(Ordering::SeqCst)
    }

    fn record_for(&self, name: &str) -> TypeRecord {
        let mut record = TypeRecord::class(name)
            .with_superclass(self.superclasses.lock().get(name).cloned());
        if let Some(annotations) = self.annotations.lock().get(name) {
            record = record.with_annotations(annotations.clone());
        }
        record
    }
}

impl NativeSubstrate for FixtureSubstrate {
    fn parse_and_define(&self, expected_name: &str, bytes: &[u8]) -> LinkResult<TypeRecord> {
        if bytes != expected_name.as_bytes() {
            return Err(LinkError::MalformedClass {
                name: expected_name.to_string(),
                reason: "bytes do not spell the class name".to_string(),
            });
        }
        Ok(self.record_for(expected_name))
    }

    fn bootstrap_lookup(&self, name: &str) -> LinkResult<TypeRecord> {
        self.bootstrap_lookups.fetch_add(1, Ordering::SeqCst);
        if self.bootstrap_names.lock().contains(name) {
            Ok(self.record_for(name))
        } else {
            Err(LinkError::TypeNotFound {
                name: name.to_string(),
            })
        }
    }

    fn declared_members_of(&self, ty: &Type) -> LinkResult<DeclaredMembers> {
        Ok(self
            .members
            .lock()
            .get(ty.name())
            .cloned()
            .unwrap_or_default()
            .attributed_to(ty.id()))
    }

    fn link(&self, ty: &Type) -> LinkResult<()> {
        if self.failing_links.lock().contains(ty.name()) {
            return Err(LinkError::Linkage {
                name: ty.name().to_string(),
                reason: "verification failed".to_string(),
            });
        }
        Ok(())
    }

    fn initialize(&self, _ty: &Type) -> LinkResult<()> {
        Ok(())
    }
}

/// Hooks that fail the test if the delegation engine ever consults them
pub struct PanicHooks;

impl LoaderHooks for PanicHooks {
    fn find_type(&self, _loader: &Arc<ClassLoader>, name: &str) -> LinkResult<Arc<Type>> {
        panic!("find_type hook invoked for {name} although the parent chain can supply it");
    }
}

/// Hooks that define types from a canned byte store, the way a jar-backed
/// loader would
pub struct StoreHooks {
    store: Mutex<HashMap<String, Vec<u8>>>,
    lookups: AtomicUsize,
}

impl StoreHooks {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, name: &str) {
        self.store.lock().insert(name.to_string(), class_bytes(name));
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl LoaderHooks for StoreHooks {
    fn find_type(&self, loader: &Arc<ClassLoader>, name: &str) -> LinkResult<Arc<Type>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .store
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| LinkError::TypeNotFound {
                name: name.to_string(),
            })?;
        loader.define_type(name, &bytes, 0, bytes.len(), None)
    }
}

/// Hooks exposing a fixed resource list under one origin label
pub struct ResourceHooks {
    origin: String,
    names: Vec<String>,
}

impl ResourceHooks {
    pub fn new(origin: &str, names: &[&str]) -> Self {
        Self {
            origin: origin.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl LoaderHooks for ResourceHooks {
    fn find_resource(&self, name: &str) -> Option<Resource> {
        self.names
            .iter()
            .any(|n| n == name)
            .then(|| Resource::new(name, &self.origin))
    }
}
