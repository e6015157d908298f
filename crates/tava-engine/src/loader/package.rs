//! Package records and the signer consistency enforcer
//!
//! Every type defined into a package must present the same certificate set
//! as the first type defined there: one package, one signer set. The check
//! runs under the loader's table lock, atomically with the registration it
//! guards, so two racing definers cannot both believe they are first.

use crate::error::{LinkError, LinkResult};
use crate::loader::domain::CertificateSet;

/// A named package defined by one loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    name: String,
    spec_title: Option<String>,
    spec_version: Option<String>,
    spec_vendor: Option<String>,
    impl_title: Option<String>,
    impl_version: Option<String>,
    impl_vendor: Option<String>,
    seal_base: Option<String>,
}

impl Package {
    /// New package record with no attributes
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            spec_title: None,
            spec_version: None,
            spec_vendor: None,
            impl_title: None,
            impl_version: None,
            impl_vendor: None,
            seal_base: None,
        }
    }

    /// Attach specification title/version/vendor
    pub fn with_spec(mut self, title: &str, version: &str, vendor: &str) -> Self {
        self.spec_title = Some(title.to_string());
        self.spec_version = Some(version.to_string());
        self.spec_vendor = Some(vendor.to_string());
        self
    }

    /// Attach implementation title/version/vendor
    pub fn with_impl(mut self, title: &str, version: &str, vendor: &str) -> Self {
        self.impl_title = Some(title.to_string());
        self.impl_version = Some(version.to_string());
        self.impl_vendor = Some(vendor.to_string());
        self
    }

    /// Seal the package against a code-source location. Once sealed, only
    /// types from that location may join the package.
    pub fn sealed(mut self, base: &str) -> Self {
        self.seal_base = Some(base.to_string());
        self
    }

    /// Package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Specification title, if recorded
    pub fn spec_title(&self) -> Option<&str> {
        self.spec_title.as_deref()
    }

    /// Specification version, if recorded
    pub fn spec_version(&self) -> Option<&str> {
        self.spec_version.as_deref()
    }

    /// Implementation title, if recorded
    pub fn impl_title(&self) -> Option<&str> {
        self.impl_title.as_deref()
    }

    /// Implementation version, if recorded
    pub fn impl_version(&self) -> Option<&str> {
        self.impl_version.as_deref()
    }

    /// Whether the package is sealed
    pub fn is_sealed(&self) -> bool {
        self.seal_base.is_some()
    }

    /// The location the package is sealed against, if sealed
    pub fn seal_base(&self) -> Option<&str> {
        self.seal_base.as_deref()
    }
}

/// The package/signer rule: first definition records the baseline; later
/// definitions must present an equal set.
///
/// Returns `Ok(Some(set))` when there is no baseline yet and `set` should
/// be recorded, `Ok(None)` when the proposed set equals the baseline
/// (nothing to record), and [`LinkError::SignerMismatch`] otherwise. The
/// caller must abort the whole definition on mismatch.
pub(crate) fn check_and_record(
    existing: Option<&CertificateSet>,
    proposed: &CertificateSet,
    package: &str,
) -> LinkResult<Option<CertificateSet>> {
    match existing {
        None => Ok(Some(proposed.clone())),
        Some(baseline) if baseline == proposed => Ok(None),
        Some(_) => Err(LinkError::SignerMismatch {
            package: package.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::domain::Certificate;

    fn set(certs: &[&str]) -> CertificateSet {
        certs
            .iter()
            .map(|c| Certificate::from_der(c, c.as_bytes()))
            .collect()
    }

    #[test]
    fn test_first_definition_records_baseline() {
        let proposed = set(&["CN=a"]);
        let result = check_and_record(None, &proposed, "com.app").unwrap();
        assert_eq!(result, Some(proposed));
    }

    #[test]
    fn test_equal_set_is_noop() {
        let baseline = set(&["CN=a", "CN=b"]);
        let proposed = set(&["CN=b", "CN=a"]);
        let result = check_and_record(Some(&baseline), &proposed, "com.app").unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_unequal_set_is_rejected() {
        let baseline = set(&["CN=a"]);
        let proposed = set(&["CN=b"]);
        let result = check_and_record(Some(&baseline), &proposed, "com.app");
        assert_eq!(
            result,
            Err(LinkError::SignerMismatch {
                package: "com.app".to_string()
            })
        );
    }

    #[test]
    fn test_unsigned_baseline_rejects_signed() {
        let baseline = CertificateSet::new();
        let proposed = set(&["CN=a"]);
        assert!(check_and_record(Some(&baseline), &proposed, "com.app").is_err());
    }

    #[test]
    fn test_package_attributes() {
        let pkg = Package::new("com.app")
            .with_spec("App Spec", "1.2", "Vendor")
            .with_impl("app-impl", "1.2.3", "Vendor")
            .sealed("jar:app.jar");
        assert_eq!(pkg.name(), "com.app");
        assert_eq!(pkg.spec_version(), Some("1.2"));
        assert_eq!(pkg.impl_title(), Some("app-impl"));
        assert!(pkg.is_sealed());
        assert_eq!(pkg.seal_base(), Some("jar:app.jar"));
    }
}
