//! Test catalog
//!
//! Static registry of every statistical test the system knows about, its
//! human-readable name and its designated alternative.
//!
//! Global invariants enforced:
//! - Every TestId has exactly one entry (checked when the catalog is built)
//! - No test is its own alternative
//! - Once built, a catalog is read-only and lookups cannot fail

use crate::choice::choice_enum;
use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

choice_enum! {
    /// Identifier of a statistical test
    ///
    /// Closed by construction: adding a variant forces every exhaustive
    /// match below (names, default alternatives, checker profiles) to be
    /// extended before the crate compiles.
    pub enum TestId ("test") {
        ChiSquareGoodnessOfFit => "Chi-square-goodness-of-fit" | "Chi-square goodness of fit",
        ChiSquareTestOfIndependence => "Chi-square-test-of-independence" | "Chi-square test of independence",
        CramersV => "Cramers-V" | "Cramer's V",
        ExactTestOfGoodnessOfFitMultinomial => "Exact-test-of-Goodness-of-Fit-(multinomial-model)" | "Exact test of Goodness of Fit (multinomial model)",
        ExactTestOfGoodnessOfFit => "Exact-test-of-Goodness-of-Fit" | "Exact test of Goodness of Fit",
        FactorialAnova => "Factorial-ANOVA" | "Factorial ANOVA",
        FishersExactTest => "Fishers-Exact-test" | "Fischers Exact test" | "Fisher's exact test",
        GTestOfGoodnessOfFit => "G-test-of-Goodness-of-Fit" | "G-test of Goodness of Fit",
        GTest => "G-test",
        IndependentSamplesTTest => "Independent-samples-T-test" | "Independent samples T-test",
        IndependentSamplesZTest => "Independent-samples-Z-test" | "Independent samples Z-test",
        KendallsTau => "Kendalls-Tau" | "Kendall's Tau",
        KruskalWallis => "Kruskal-Wallis",
        LogLinearAnalysis => "Log-linear-analysis" | "Log-linear analysis",
        MannWhitneyUTest => "Mann-Whitney-U-Test" | "Mann-Whitney U Test",
        McNemarsTest => "McNemars-test" | "McNemars test" | "McNemar's test",
        OneProportionZTest => "One-proportion-z-test" | "One-proportion z-test",
        OneWayAncova => "One-way-ANCOVA" | "One-way ANCOVA",
        OneWayAnova => "One-way-ANOVA" | "One-way ANOVA",
        PairedSamplesTTest => "Paired-samples-T-test" | "Paired samples T-test",
        PairedSamplesZTest => "Paired-samples-Z-test" | "Paired samples Z-test",
        PartialCorrelation => "Partial-correlation" | "Partial correlation",
        PearsonCorrelation => "Pearson-correlation" | "Pearson correlation",
        PhiCoefficient => "Phi-co-efficient" | "Phi co-efficient",
        PointBiserialCorrelation => "Point-biserial-correlation" | "Point biserial correlation",
        SingleSampleTTest => "Single-sample-T-test" | "Single sample T-test",
        SingleSampleWilcoxonSignedRankTest => "Single-sample-wilcoxon-signed-rank-test" | "Single sample wilcoxon signed-rank test",
        SingleSampleZTest => "Single-sample-Z-test" | "Single sample Z-test",
        SpearmansRho => "Spearmans-Rho" | "Spearman's Rho",
        TwoProportionZTest => "Two-proportion-z-test" | "Two proportion z-test",
        WilcoxonSignedRankTest => "Wilcoxon-signed-rank-test" | "Wilcoxon signed-rank test",
        RepeatedMeasuresAnova => "Repeated-measures-ANOVA" | "Repeated measures ANOVA",
        SplitPlotAnova => "Split-plot-ANOVA" | "Split-plot ANOVA" | "Mixed ANOVA",
        FriedmanTest => "Friedman-test" | "Friedman test",
    }
}

impl TestId {
    /// Human-readable test name
    pub fn name(&self) -> &'static str {
        match self {
            TestId::ChiSquareGoodnessOfFit => "Chi-square goodness of fit",
            TestId::ChiSquareTestOfIndependence => "Chi-square test of independence",
            TestId::CramersV => "Cramér's V",
            TestId::ExactTestOfGoodnessOfFitMultinomial => {
                "Exact test of goodness of fit (multinomial model)"
            }
            TestId::ExactTestOfGoodnessOfFit => "Exact test of goodness of fit",
            TestId::FactorialAnova => "Factorial ANOVA",
            TestId::FishersExactTest => "Fisher's exact test",
            TestId::GTestOfGoodnessOfFit => "G-test of goodness of fit",
            TestId::GTest => "G-test of independence",
            TestId::IndependentSamplesTTest => "Independent samples t-test",
            TestId::IndependentSamplesZTest => "Independent samples z-test",
            TestId::KendallsTau => "Kendall's tau",
            TestId::KruskalWallis => "Kruskal-Wallis H test",
            TestId::LogLinearAnalysis => "Log-linear analysis",
            TestId::MannWhitneyUTest => "Mann-Whitney U test",
            TestId::McNemarsTest => "McNemar's test",
            TestId::OneProportionZTest => "One-proportion z-test",
            TestId::OneWayAncova => "One-way ANCOVA",
            TestId::OneWayAnova => "One-way ANOVA",
            TestId::PairedSamplesTTest => "Paired samples t-test",
            TestId::PairedSamplesZTest => "Paired samples z-test",
            TestId::PartialCorrelation => "Partial correlation",
            TestId::PearsonCorrelation => "Pearson correlation",
            TestId::PhiCoefficient => "Phi coefficient",
            TestId::PointBiserialCorrelation => "Point-biserial correlation",
            TestId::SingleSampleTTest => "Single sample t-test",
            TestId::SingleSampleWilcoxonSignedRankTest => "Single sample Wilcoxon signed-rank test",
            TestId::SingleSampleZTest => "Single sample z-test",
            TestId::SpearmansRho => "Spearman's rho",
            TestId::TwoProportionZTest => "Two-proportion z-test",
            TestId::WilcoxonSignedRankTest => "Wilcoxon signed-rank test",
            TestId::RepeatedMeasuresAnova => "Repeated measures ANOVA",
            TestId::SplitPlotAnova => "Split-plot ANOVA",
            TestId::FriedmanTest => "Friedman test",
        }
    }

    /// Designated alternative in the standard catalog
    pub fn default_alternative(&self) -> Fallback {
        use Fallback::{Alternative, NoAlternativeDefined};
        match self {
            TestId::ChiSquareTestOfIndependence => Alternative(TestId::FishersExactTest),
            TestId::FishersExactTest => Alternative(TestId::ChiSquareTestOfIndependence),
            TestId::IndependentSamplesTTest => Alternative(TestId::MannWhitneyUTest),
            TestId::OneWayAnova => Alternative(TestId::KruskalWallis),
            TestId::PairedSamplesTTest => Alternative(TestId::WilcoxonSignedRankTest),
            TestId::PairedSamplesZTest => Alternative(TestId::PairedSamplesTTest),
            TestId::PearsonCorrelation => Alternative(TestId::SpearmansRho),
            TestId::RepeatedMeasuresAnova => Alternative(TestId::FriedmanTest),
            TestId::SingleSampleTTest => Alternative(TestId::SingleSampleWilcoxonSignedRankTest),
            TestId::SingleSampleZTest => Alternative(TestId::SingleSampleWilcoxonSignedRankTest),
            // The independent z-test has three plausible substitutes depending
            // on which assumption failed, so none is designated.
            TestId::IndependentSamplesZTest
            | TestId::ChiSquareGoodnessOfFit
            | TestId::CramersV
            | TestId::ExactTestOfGoodnessOfFitMultinomial
            | TestId::ExactTestOfGoodnessOfFit
            | TestId::FactorialAnova
            | TestId::GTestOfGoodnessOfFit
            | TestId::GTest
            | TestId::KendallsTau
            | TestId::KruskalWallis
            | TestId::LogLinearAnalysis
            | TestId::MannWhitneyUTest
            | TestId::McNemarsTest
            | TestId::OneProportionZTest
            | TestId::OneWayAncova
            | TestId::PartialCorrelation
            | TestId::PhiCoefficient
            | TestId::PointBiserialCorrelation
            | TestId::SingleSampleWilcoxonSignedRankTest
            | TestId::SpearmansRho
            | TestId::TwoProportionZTest
            | TestId::WilcoxonSignedRankTest
            | TestId::SplitPlotAnova
            | TestId::FriedmanTest => NoAlternativeDefined,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Outcome of looking up an alternative test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "test", rename_all = "kebab-case")]
pub enum Fallback {
    Alternative(TestId),
    NoAlternativeDefined,
}

impl Fallback {
    pub fn alternative(&self) -> Option<TestId> {
        match self {
            Fallback::Alternative(test) => Some(*test),
            Fallback::NoAlternativeDefined => None,
        }
    }
}

/// Single catalog row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CatalogEntry {
    pub id: TestId,
    pub name: &'static str,
    pub alternative: Fallback,
}

/// Read-only test catalog, indexed by TestId
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCatalog {
    // entries[i].id as usize == i
    entries: Vec<CatalogEntry>,
}

impl TestCatalog {
    /// Catalog with the designated alternatives
    pub fn standard() -> Self {
        TestCatalog {
            entries: TestId::ALL
                .iter()
                .map(|id| CatalogEntry {
                    id: *id,
                    name: id.name(),
                    alternative: id.default_alternative(),
                })
                .collect(),
        }
    }

    /// Build a catalog from explicit `(test, alternative)` pairs
    ///
    /// Fails unless every TestId appears exactly once and no test names
    /// itself as its alternative.
    pub fn from_entries<I>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (TestId, Fallback)>,
    {
        let mut slots: Vec<Option<CatalogEntry>> = vec![None; TestId::ALL.len()];

        for (id, alternative) in entries {
            if alternative == Fallback::Alternative(id) {
                return Err(CatalogError::SelfAlternative(id));
            }
            let slot = &mut slots[id.index()];
            if slot.is_some() {
                return Err(CatalogError::DuplicateEntry(id));
            }
            *slot = Some(CatalogEntry {
                id,
                name: id.name(),
                alternative,
            });
        }

        let mut complete = Vec::with_capacity(slots.len());
        for (slot, id) in slots.into_iter().zip(TestId::ALL) {
            match slot {
                Some(entry) => complete.push(entry),
                None => return Err(CatalogError::MissingEntry(*id)),
            }
        }

        Ok(TestCatalog { entries: complete })
    }

    /// Standard catalog with some alternatives replaced
    pub fn with_overrides(overrides: &BTreeMap<TestId, Option<TestId>>) -> Result<Self, CatalogError> {
        Self::from_entries(TestId::ALL.iter().map(|id| {
            let alternative = match overrides.get(id) {
                Some(Some(alt)) => Fallback::Alternative(*alt),
                Some(None) => Fallback::NoAlternativeDefined,
                None => id.default_alternative(),
            };
            (*id, alternative)
        }))
    }

    /// Entry for a test (infallible once the catalog is built)
    pub fn entry(&self, id: TestId) -> &CatalogEntry {
        &self.entries[id.index()]
    }

    pub fn alternative(&self, id: TestId) -> Fallback {
        self.entry(id).alternative
    }

    pub fn contains(&self, id: TestId) -> bool {
        self.entries.get(id.index()).is_some_and(|e| e.id == id)
    }

    /// All entries in TestId declaration order
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Every test id, for manual selection from the full catalog
    pub fn ids(&self) -> Vec<TestId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Parse an external identifier
    ///
    /// Accepts the canonical id or its spaced display label.
    pub fn lookup(&self, raw: &str) -> Result<TestId, CatalogError> {
        raw.parse::<TestId>()
            .map_err(|_| CatalogError::UnknownTestId(raw.to_string()))
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_covers_every_test() {
        let catalog = TestCatalog::standard();
        assert_eq!(catalog.entries().len(), TestId::ALL.len());
        for (i, entry) in catalog.entries().iter().enumerate() {
            assert_eq!(entry.id as usize, i);
            assert!(catalog.contains(entry.id));
        }
    }

    #[test]
    fn test_designated_alternatives() {
        let catalog = TestCatalog::standard();
        assert_eq!(
            catalog.alternative(TestId::PairedSamplesTTest),
            Fallback::Alternative(TestId::WilcoxonSignedRankTest)
        );
        assert_eq!(
            catalog.alternative(TestId::PearsonCorrelation),
            Fallback::Alternative(TestId::SpearmansRho)
        );
        assert_eq!(
            catalog.alternative(TestId::IndependentSamplesZTest),
            Fallback::NoAlternativeDefined
        );
    }

    #[test]
    fn test_no_standard_entry_is_its_own_alternative() {
        for id in TestId::ALL {
            assert_ne!(id.default_alternative(), Fallback::Alternative(*id), "{}", id);
        }
    }

    #[test]
    fn test_from_entries_rejects_missing_entry() {
        let entries = TestId::ALL
            .iter()
            .filter(|id| **id != TestId::GTest)
            .map(|id| (*id, id.default_alternative()));
        assert_eq!(
            TestCatalog::from_entries(entries),
            Err(CatalogError::MissingEntry(TestId::GTest))
        );
    }

    #[test]
    fn test_from_entries_rejects_duplicate_entry() {
        let entries = TestId::ALL
            .iter()
            .map(|id| (*id, id.default_alternative()))
            .chain(std::iter::once((TestId::KruskalWallis, Fallback::NoAlternativeDefined)));
        assert_eq!(
            TestCatalog::from_entries(entries),
            Err(CatalogError::DuplicateEntry(TestId::KruskalWallis))
        );
    }

    #[test]
    fn test_overrides_replace_alternatives() {
        let mut overrides = BTreeMap::new();
        overrides.insert(TestId::PearsonCorrelation, Some(TestId::KendallsTau));
        overrides.insert(TestId::PairedSamplesTTest, None);
        let catalog = TestCatalog::with_overrides(&overrides).unwrap();
        assert_eq!(
            catalog.alternative(TestId::PearsonCorrelation),
            Fallback::Alternative(TestId::KendallsTau)
        );
        assert_eq!(
            catalog.alternative(TestId::PairedSamplesTTest),
            Fallback::NoAlternativeDefined
        );
        // untouched entries keep their defaults
        assert_eq!(
            catalog.alternative(TestId::OneWayAnova),
            Fallback::Alternative(TestId::KruskalWallis)
        );
    }

    #[test]
    fn test_overrides_reject_self_alternative() {
        let mut overrides = BTreeMap::new();
        overrides.insert(TestId::GTest, Some(TestId::GTest));
        assert_eq!(
            TestCatalog::with_overrides(&overrides),
            Err(CatalogError::SelfAlternative(TestId::GTest))
        );
    }

    #[test]
    fn test_lookup_accepts_canonical_and_display_labels() {
        let catalog = TestCatalog::standard();
        assert_eq!(catalog.lookup("Paired-samples-T-test"), Ok(TestId::PairedSamplesTTest));
        assert_eq!(catalog.lookup("Fischers Exact test"), Ok(TestId::FishersExactTest));
        assert_eq!(
            catalog.lookup("Bogus-test"),
            Err(CatalogError::UnknownTestId("Bogus-test".to_string()))
        );
    }

    #[test]
    fn test_serialized_id_is_canonical_label() {
        let json = serde_json::to_string(&TestId::SingleSampleZTest).unwrap();
        assert_eq!(json, "\"Single-sample-Z-test\"");
        let fallback = serde_json::to_string(&Fallback::Alternative(TestId::SpearmansRho)).unwrap();
        assert_eq!(fallback, r#"{"kind":"alternative","test":"Spearmans-Rho"}"#);
    }
}
