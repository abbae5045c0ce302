//! Root configuration.

use crate::types::Namespace;

/// Settings for one [`Root`](crate::pipeline::Root).
///
/// ```ignore
/// let config = RootConfig {
///     default_namespace: Namespace::Svg,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootConfig {
    /// Namespace for elements with no namespace-declaring ancestor and no `Env`.
    pub default_namespace: Namespace,
    /// Cache the first element built from each draft and clone it afterwards.
    pub use_stencils: bool,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            default_namespace: Namespace::Html,
            use_stencils: true,
        }
    }
}

impl RootConfig {
    pub fn with_default_namespace(mut self, namespace: Namespace) -> Self {
        self.default_namespace = namespace;
        self
    }

    pub fn with_stencils(mut self, enabled: bool) -> Self {
        self.use_stencils = enabled;
        self
    }
}
