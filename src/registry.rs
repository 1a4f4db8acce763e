use std::collections::HashSet;

/// Ids of document objects already emitted during one conversion.
///
/// A registry lives exactly as long as the document it guards; there is no
/// removal.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    claimed: HashSet<String>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `id` is seen, false afterwards.
    pub fn try_claim(&mut self, id: &str) -> bool {
        if self.claimed.contains(id) {
            tracing::trace!(id, "object already emitted");
            return false;
        }
        self.claimed.insert(id.to_string())
    }

    pub fn is_claimed(&self, id: &str) -> bool {
        self.claimed.contains(id)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_once() {
        let mut registry = IdentityRegistry::new();
        assert!(registry.try_claim("species_1"));
        assert!(!registry.try_claim("species_1"));
        assert!(registry.try_claim("species_2"));
        assert!(!registry.try_claim("species_1"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn fresh_registry_forgets() {
        let mut first = IdentityRegistry::new();
        assert!(first.try_claim("reaction_9"));
        let mut second = IdentityRegistry::new();
        assert!(!second.is_claimed("reaction_9"));
        assert!(second.try_claim("reaction_9"));
    }
}
