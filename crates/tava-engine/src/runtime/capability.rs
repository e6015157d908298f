//! Capability checker seam
//!
//! A policy object consulted before privileged operations. The linking core
//! only asks allow/deny questions; it never stores or computes policy, and
//! it never catches a denial — [`crate::LinkError::SecurityViolation`]
//! propagates to the caller.

use crate::error::LinkResult;
use crate::ty::Type;

/// Which member view an access request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Public members only
    Public,
    /// Declared members, including non-public ones
    Declared,
}

/// Policy seam for privileged operations.
///
/// Every check either returns `Ok(())` or raises
/// [`crate::LinkError::SecurityViolation`]. The default for each check is
/// to allow.
pub trait CapabilityChecker: Send + Sync {
    /// May the caller reflect over `ty`'s members at `scope`?
    fn check_member_access(&self, ty: &Type, scope: AccessScope) -> LinkResult<()> {
        let _ = (ty, scope);
        Ok(())
    }

    /// May the caller touch types in `package`?
    fn check_package_access(&self, package: &str) -> LinkResult<()> {
        let _ = package;
        Ok(())
    }

    /// May the caller construct a new class loader?
    fn check_create_loader(&self) -> LinkResult<()> {
        Ok(())
    }

    /// May the caller obtain a class-loader reference?
    fn check_get_class_loader(&self) -> LinkResult<()> {
        Ok(())
    }
}

/// The permissive default checker: every capability is granted
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl CapabilityChecker for AllowAll {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::runtime::substrate::{NoopSubstrate, TypeRecord};
    use std::sync::Arc;

    #[test]
    fn test_allow_all_grants_everything() {
        let checker = AllowAll;
        let ty = crate::ty::Type::from_record(TypeRecord::class("a.A"), Arc::new(NoopSubstrate));
        assert!(checker.check_member_access(&ty, AccessScope::Declared).is_ok());
        assert!(checker.check_package_access("a").is_ok());
        assert!(checker.check_create_loader().is_ok());
        assert!(checker.check_get_class_loader().is_ok());
    }

    #[test]
    fn test_denial_surfaces_as_security_violation() {
        struct NoLoaders;
        impl CapabilityChecker for NoLoaders {
            fn check_create_loader(&self) -> LinkResult<()> {
                Err(LinkError::SecurityViolation("createLoader".to_string()))
            }
        }
        assert!(matches!(
            NoLoaders.check_create_loader(),
            Err(LinkError::SecurityViolation(_))
        ));
    }
}
