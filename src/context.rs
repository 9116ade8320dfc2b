use std::collections::HashMap;

/// Namespace prefixes to use when marshalling, keyed by namespace URI.
///
/// A prefix bound here wins over the prefix an element would pick for itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarshalContext {
    prefixes: HashMap<String, String>,
}

impl MarshalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context binding `ds`, `xades` and `xades141` to their namespaces.
    pub fn with_default_prefixes() -> Self {
        let mut ctx = Self::new();
        ctx.set_namespace_prefix(crate::DSIG_NS, crate::DSIG_PREFIX);
        ctx.set_namespace_prefix(crate::XADES_NS, crate::XADES_PREFIX);
        ctx.set_namespace_prefix(crate::XADES141_NS, crate::XADES141_PREFIX);
        ctx
    }

    /// Binds `prefix` to `namespace`, returning the previous binding.
    pub fn set_namespace_prefix(&mut self, namespace: &str, prefix: &str) -> Option<String> {
        self.prefixes
            .insert(namespace.to_string(), prefix.to_string())
    }

    pub fn namespace_prefix<'a>(&'a self, namespace: &str, default_prefix: &'a str) -> &'a str {
        self.prefixes
            .get(namespace)
            .map(String::as_str)
            .unwrap_or(default_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_prefix_wins() {
        let mut ctx = MarshalContext::new();
        assert_eq!(ctx.namespace_prefix(crate::XADES_NS, "xades"), "xades");

        assert_eq!(ctx.set_namespace_prefix(crate::XADES_NS, "xa"), None);
        assert_eq!(ctx.namespace_prefix(crate::XADES_NS, "xades"), "xa");
        assert_eq!(
            ctx.set_namespace_prefix(crate::XADES_NS, "x"),
            Some("xa".to_string())
        );
    }

    #[test]
    fn default_prefixes() {
        let ctx = MarshalContext::with_default_prefixes();
        assert_eq!(ctx.namespace_prefix(crate::DSIG_NS, ""), "ds");
        assert_eq!(ctx.namespace_prefix(crate::XADES141_NS, ""), "xades141");
        assert_eq!(ctx.namespace_prefix("urn:other", "o"), "o");
    }
}
