//! Module name to package identifier mapping

use regex::Regex;

use crate::version::types::PackageId;

/// Maps `<Prefix>_<Name>` module names onto `<vendor>/<packagePrefix><name>`
pub struct IdentifierScheme {
    vendor: String,
    module_prefix: String,
    package_prefix: String,
    excluded: Vec<String>,
    boundary_re: Regex,
}

impl IdentifierScheme {
    pub fn new(vendor: &str, module_prefix: &str, package_prefix: &str, excluded: &[String]) -> Self {
        Self {
            vendor: vendor.to_lowercase(),
            module_prefix: module_prefix.to_string(),
            package_prefix: package_prefix.to_string(),
            excluded: excluded.to_vec(),
            boundary_re: Regex::new(r"([A-Z]|[0-9]+)").unwrap(),
        }
    }

    /// Identifier for `module_name`, or `None` when the module is not one
    /// of the vendor's published packages
    pub fn identifier_for(&self, module_name: &str) -> Option<PackageId> {
        let (prefix, rest) = module_name.split_once('_')?;
        if prefix != self.module_prefix || rest.is_empty() {
            return None;
        }
        if self.excluded.iter().any(|suffix| suffix == rest) {
            return None;
        }

        Some(PackageId::new(format!(
            "{}/{}{}",
            self.vendor,
            self.package_prefix,
            self.kebab_case(rest)
        )))
    }

    /// `BackendWidget` -> `backend-widget`, `CMSPage` -> `c-m-s-page`, `Base64` -> `base-64`
    fn kebab_case(&self, name: &str) -> String {
        let mut chars = name.chars();
        let lowered_first: String = match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        };

        self.boundary_re
            .replace_all(&lowered_first, "-${1}")
            .trim_matches('-')
            .to_lowercase()
    }
}
