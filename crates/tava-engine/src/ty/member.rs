//! Declared member model
//!
//! Fields, methods, and constructors as reported by the native substrate.
//! Members carry their declaring type's [`TypeId`]; the public-view merge
//! deduplicates by signature plus declaring type, so a member reachable
//! through several interface paths appears once.

use super::{Modifiers, TypeId};

/// A declared field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Binary name of the field's type
    pub field_type: String,
    /// Declaration modifiers
    pub modifiers: Modifiers,
    /// Identity of the declaring type
    pub declaring: TypeId,
}

/// A declared method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Binary names of the parameter types, in order
    pub param_types: Vec<String>,
    /// Binary name of the return type
    pub return_type: String,
    /// Declaration modifiers
    pub modifiers: Modifiers,
    /// Identity of the declaring type
    pub declaring: TypeId,
}

/// A declared constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    /// Binary names of the parameter types, in order
    pub param_types: Vec<String>,
    /// Declaration modifiers
    pub modifiers: Modifiers,
    /// Identity of the declaring type
    pub declaring: TypeId,
}

impl Method {
    /// Dedup key: declaring type plus name and parameter types
    pub(crate) fn identity(&self) -> (TypeId, &str, &[String]) {
        (self.declaring, &self.name, &self.param_types)
    }
}

impl Constructor {
    /// Whether this is the zero-parameter constructor
    pub fn is_default(&self) -> bool {
        self.param_types.is_empty()
    }
}

/// Everything a type declares directly, memoized verbatim from one
/// substrate call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredMembers {
    /// Declared fields
    pub fields: Vec<Field>,
    /// Declared methods
    pub methods: Vec<Method>,
    /// Declared constructors
    pub constructors: Vec<Constructor>,
}

impl DeclaredMembers {
    /// Empty member set
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp every member with `declaring`. Substrates that build member
    /// sets up front use this to attribute them to the queried type.
    pub fn attributed_to(mut self, declaring: TypeId) -> Self {
        for field in &mut self.fields {
            field.declaring = declaring;
        }
        for method in &mut self.methods {
            method.declaring = declaring;
        }
        for ctor in &mut self.constructors {
            ctor.declaring = declaring;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_identity_distinguishes_overloads() {
        let id = TypeId::new();
        let a = Method {
            name: "run".to_string(),
            param_types: vec![],
            return_type: "unit".to_string(),
            modifiers: Modifiers::PUBLIC,
            declaring: id,
        };
        let b = Method {
            param_types: vec!["int".to_string()],
            ..a.clone()
        };
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_attributed_to_stamps_all_members() {
        let id = TypeId::new();
        let members = DeclaredMembers {
            fields: vec![Field {
                name: "x".to_string(),
                field_type: "int".to_string(),
                modifiers: Modifiers::PUBLIC,
                declaring: TypeId::new(),
            }],
            methods: vec![],
            constructors: vec![Constructor {
                param_types: vec![],
                modifiers: Modifiers::PUBLIC,
                declaring: TypeId::new(),
            }],
        }
        .attributed_to(id);

        assert_eq!(members.fields[0].declaring, id);
        assert_eq!(members.constructors[0].declaring, id);
        assert!(members.constructors[0].is_default());
    }
}
