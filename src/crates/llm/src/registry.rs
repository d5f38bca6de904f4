//! Static context-window registries.
//!
//! Each backend owns a const table of `(model, context tokens)` pairs and a
//! documented default for names it does not know.

use tracing::warn;

/// A backend's model table.
#[derive(Debug, Clone, Copy)]
pub struct ModelRegistry {
    backend: &'static str,
    models: &'static [(&'static str, usize)],
    default_context_size: usize,
}

impl ModelRegistry {
    /// Create a registry.
    pub const fn new(
        backend: &'static str,
        models: &'static [(&'static str, usize)],
        default_context_size: usize,
    ) -> Self {
        Self {
            backend,
            models,
            default_context_size,
        }
    }

    /// Context size for `model`, or the default with a warning when unknown.
    pub fn context_size(&self, model: &str) -> usize {
        match self.lookup(model) {
            Some(size) => size,
            None => {
                warn!(
                    backend = self.backend,
                    model,
                    default = self.default_context_size,
                    "unknown model; using default context size"
                );
                self.default_context_size
            }
        }
    }

    /// Exact lookup without the fallback.
    pub fn lookup(&self, model: &str) -> Option<usize> {
        self.models
            .iter()
            .find(|(name, _)| *name == model)
            .map(|(_, size)| *size)
    }

    /// Model names in declaration order.
    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Size returned for unknown models.
    pub fn default_context_size(&self) -> usize {
        self.default_context_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(&str, usize)] = &[("small", 512), ("large", 8192)];
    const REGISTRY: ModelRegistry = ModelRegistry::new("test", TABLE, 1000);

    #[test]
    fn test_known_and_unknown_models() {
        assert_eq!(REGISTRY.context_size("small"), 512);
        assert_eq!(REGISTRY.context_size("large"), 8192);
        assert_eq!(REGISTRY.context_size("missing"), 1000);
        assert_eq!(REGISTRY.lookup("missing"), None);
    }

    #[test]
    fn test_model_names_order() {
        assert_eq!(REGISTRY.model_names(), vec!["small", "large"]);
        assert_eq!(REGISTRY.default_context_size(), 1000);
    }
}
