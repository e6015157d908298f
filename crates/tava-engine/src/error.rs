//! Linking and metadata errors
//!
//! One taxonomy for the whole linking core. Lookup failures
//! ([`LinkError::TypeNotFound`], [`LinkError::NoSuchMethod`],
//! [`LinkError::NoSuchField`]) are soft: callers may retry with a different
//! loader or strategy. Everything else is fatal to the triggering call and
//! must leave loader tables exactly as they were before the call.

use crate::loader::LoaderId;

/// Errors raised by the linking core
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// No loader in the delegation chain could produce the named type.
    ///
    /// Soft: the caller may retry through a different loader. The name is
    /// always the originally requested binary name, never an internal alias.
    #[error("Type not found: {name}")]
    TypeNotFound {
        /// The binary name that was requested
        name: String,
    },

    /// A binary name was syntactically invalid (slash-form, empty, ...)
    #[error("Malformed type name: {0:?}")]
    MalformedName(String),

    /// The native substrate rejected the class bytes
    #[error("Malformed class {name}: {reason}")]
    MalformedClass {
        /// The name the definition was attempted under
        name: String,
        /// Substrate-reported defect
        reason: String,
    },

    /// A byte range fell outside the supplied buffer
    #[error("Byte range {offset}..+{len} out of bounds for buffer of {buffer} bytes")]
    OutOfBounds {
        /// Requested start offset
        offset: usize,
        /// Requested length
        len: usize,
        /// Actual buffer length
        buffer: usize,
    },

    /// Linking (verification/preparation) failed; propagated verbatim from
    /// the native substrate
    #[error("Linkage error in {name}: {reason}")]
    Linkage {
        /// The type being linked
        name: String,
        /// Substrate-reported cause
        reason: String,
    },

    /// A static initializer raised; propagated verbatim from the substrate
    #[error("Exception in initializer of {name}: {reason}")]
    ExceptionInInitializer {
        /// The type being initialized
        name: String,
        /// Substrate-reported cause
        reason: String,
    },

    /// The loader already has a package record under this name
    #[error("Package already defined: {0}")]
    DuplicatePackage(String),

    /// The loader already defined a type under this binary name
    #[error("Type already defined by this loader: {0}")]
    AlreadyDefined(String),

    /// A definition presented a certificate set different from the
    /// package's recorded baseline
    #[error("Signer mismatch for package {package}")]
    SignerMismatch {
        /// The package whose baseline was violated
        package: String,
    },

    /// A definition targeted a sealed package from a different code source
    #[error("Package {package} is sealed against {seal_base}")]
    SealedPackage {
        /// The sealed package
        package: String,
        /// The code-source location the package is sealed against
        seal_base: String,
    },

    /// The capability checker denied a privileged operation
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// The owning runtime context is gone; the loader rejects every
    /// operation
    #[error("Loader {0:?} is defunct (runtime context dropped)")]
    DefunctLoader(LoaderId),

    /// No matching method/constructor. Soft: reported as "member absent".
    #[error("No such method: {0}")]
    NoSuchMethod(String),

    /// No matching field. Soft: reported as "member absent".
    #[error("No such field: {0}")]
    NoSuchField(String),
}

impl LinkError {
    /// Whether this failure is soft (retryable with a different strategy)
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            LinkError::TypeNotFound { .. }
                | LinkError::NoSuchMethod(_)
                | LinkError::NoSuchField(_)
        )
    }

    /// Shorthand for the soft not-found case the delegation walk recovers
    pub(crate) fn not_found(name: &str) -> Self {
        LinkError::TypeNotFound {
            name: name.to_string(),
        }
    }
}

/// Linking core result
pub type LinkResult<T> = Result<T, LinkError>;
