//! Single-hop fallback resolution
//!
//! Given a test whose assumptions are not met, name its designated
//! alternative or report that none exists. Resolution never chains: the
//! caller decides what happens when the alternative fails too.

use crate::catalog::{Fallback, TestCatalog, TestId};
use tracing::debug;

/// Looks up designated alternatives in a catalog
#[derive(Debug, Clone, Copy)]
pub struct FallbackResolver<'a> {
    catalog: &'a TestCatalog,
}

impl<'a> FallbackResolver<'a> {
    pub fn new(catalog: &'a TestCatalog) -> Self {
        FallbackResolver { catalog }
    }

    /// Total over every TestId
    pub fn resolve(&self, test: TestId) -> Fallback {
        let fallback = self.catalog.alternative(test);
        debug!(test = %test, fallback = ?fallback, "resolved fallback");
        fallback
    }

    pub fn catalog(&self) -> &'a TestCatalog {
        self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_paired_t_falls_back_to_wilcoxon() {
        let catalog = TestCatalog::standard();
        let resolver = FallbackResolver::new(&catalog);
        assert_eq!(
            resolver.resolve(TestId::PairedSamplesTTest),
            Fallback::Alternative(TestId::WilcoxonSignedRankTest)
        );
    }

    #[test]
    fn test_resolution_is_single_hop() {
        // Paired Z -> Paired T -> Wilcoxon, but one call only moves one step
        let catalog = TestCatalog::standard();
        let resolver = FallbackResolver::new(&catalog);
        assert_eq!(
            resolver.resolve(TestId::PairedSamplesZTest),
            Fallback::Alternative(TestId::PairedSamplesTTest)
        );
    }

    #[test]
    fn test_no_alternative_is_explicit() {
        let catalog = TestCatalog::standard();
        let resolver = FallbackResolver::new(&catalog);
        assert_eq!(
            resolver.resolve(TestId::LogLinearAnalysis),
            Fallback::NoAlternativeDefined
        );
    }

    #[test]
    fn test_resolver_follows_catalog_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert(TestId::PearsonCorrelation, Some(TestId::KendallsTau));
        overrides.insert(TestId::OneWayAnova, None);
        let catalog = TestCatalog::with_overrides(&overrides).unwrap();
        let resolver = FallbackResolver::new(&catalog);

        assert_eq!(
            resolver.resolve(TestId::PearsonCorrelation),
            Fallback::Alternative(TestId::KendallsTau)
        );
        assert_eq!(
            resolver.resolve(TestId::OneWayAnova),
            Fallback::NoAlternativeDefined
        );
    }
}
