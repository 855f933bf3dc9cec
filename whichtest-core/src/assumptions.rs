//! Assumption checks producing tri-state verdicts
//!
//! A checker looks at a dataset through the caller's column selections and
//! answers Met, NotMet or Pending. Pending means something the check needs
//! has not been supplied yet; it is never a failure.
//!
//! The built-in checkers compute only counts (column types, distinct levels,
//! expected frequencies, group sizes). Anything needing a statistical test
//! (normality, equal variances, sphericity) is a named confirmation supplied
//! by the caller or an external computation layer.
//!
//! Global invariants enforced:
//! - Every TestId has a checker in the standard registry
//! - Verdicts combine with NotMet over Pending over Met
//! - A fresh verdict is computed per call (nothing is cached)

use crate::catalog::TestId;
use crate::dataset::{Column, ContingencyTable, Dataset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of an assumption check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssumptionVerdict {
    Met,
    NotMet,
    Pending,
}

impl AssumptionVerdict {
    fn rank(self) -> u8 {
        match self {
            AssumptionVerdict::Met => 0,
            AssumptionVerdict::Pending => 1,
            AssumptionVerdict::NotMet => 2,
        }
    }

    /// Combine two verdicts, keeping the more severe one
    pub fn combine(self, other: AssumptionVerdict) -> AssumptionVerdict {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Combine many verdicts; an empty set is Met
    pub fn combine_all<I: IntoIterator<Item = AssumptionVerdict>>(verdicts: I) -> Self {
        verdicts
            .into_iter()
            .fold(AssumptionVerdict::Met, AssumptionVerdict::combine)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssumptionVerdict::Met => "met",
            AssumptionVerdict::NotMet => "not-met",
            AssumptionVerdict::Pending => "pending",
        }
    }
}

impl std::fmt::Display for AssumptionVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Caller choices for one check: column per role, answer per confirmation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selections {
    pub columns: BTreeMap<String, String>,
    pub confirmations: BTreeMap<String, bool>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, role: &str, column: &str) -> Self {
        self.columns.insert(role.to_string(), column.to_string());
        self
    }

    pub fn with_confirmation(mut self, assumption: &str, holds: bool) -> Self {
        self.confirmations.insert(assumption.to_string(), holds);
        self
    }

    pub fn column(&self, role: &str) -> Option<&str> {
        self.columns.get(role).map(String::as_str)
    }

    /// Case-insensitive lookup of a confirmation
    pub fn confirmation(&self, assumption: &str) -> Option<bool> {
        self.confirmations.get(assumption).copied().or_else(|| {
            self.confirmations
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(assumption))
                .map(|(_, holds)| *holds)
        })
    }
}

/// One line of a check report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub name: String,
    pub verdict: AssumptionVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Finding {
    fn new(name: impl Into<String>, verdict: AssumptionVerdict, detail: Option<String>) -> Self {
        Finding {
            name: name.into(),
            verdict,
            detail,
        }
    }
}

/// Verdict plus the findings behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub verdict: AssumptionVerdict,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        CheckReport {
            verdict: AssumptionVerdict::combine_all(findings.iter().map(|f| f.verdict)),
            findings,
        }
    }
}

impl From<AssumptionVerdict> for CheckReport {
    fn from(verdict: AssumptionVerdict) -> Self {
        CheckReport {
            verdict,
            findings: Vec::new(),
        }
    }
}

/// Checks one test's assumptions against a dataset
pub trait AssumptionChecker {
    fn check(&self, dataset: &Dataset, selections: &Selections) -> CheckReport;
}

impl<F> AssumptionChecker for F
where
    F: Fn(&Dataset, &Selections) -> AssumptionVerdict,
{
    fn check(&self, dataset: &Dataset, selections: &Selections) -> CheckReport {
        CheckReport::from(self(dataset, selections))
    }
}

/// Numeric limits for the structural checks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckThresholds {
    pub min_expected_count: f64,
    pub min_group_size: usize,
    pub fisher_total_limit: usize,
}

impl Default for CheckThresholds {
    fn default() -> Self {
        CheckThresholds {
            min_expected_count: 5.0,
            min_group_size: 5,
            fisher_total_limit: 20,
        }
    }
}

/// Count-based check over selected columns (arguments are role names)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralCheck {
    Numeric(&'static str),
    /// Exactly two distinct values
    Binary(&'static str),
    LevelsAtLeast(&'static str, usize),
    /// Every cell of the cross-tabulation has a large enough expected count
    ExpectedCountsAtLeast(&'static str, &'static str),
    /// Goodness of fit against equal proportions has large enough expected counts
    UniformExpectedAtLeast(&'static str),
    /// Every level of a grouping column has enough rows
    MinGroupSize(&'static str),
    /// Small total or a small expected count, so an exact test is warranted
    FisherSampleSize(&'static str, &'static str),
}

impl StructuralCheck {
    fn roles(&self) -> Vec<&'static str> {
        match *self {
            StructuralCheck::Numeric(r)
            | StructuralCheck::Binary(r)
            | StructuralCheck::LevelsAtLeast(r, _)
            | StructuralCheck::UniformExpectedAtLeast(r)
            | StructuralCheck::MinGroupSize(r) => vec![r],
            StructuralCheck::ExpectedCountsAtLeast(a, b)
            | StructuralCheck::FisherSampleSize(a, b) => vec![a, b],
        }
    }

    fn name(&self) -> String {
        match self {
            StructuralCheck::Numeric(r) => format!("{} is numeric", r),
            StructuralCheck::Binary(r) => format!("{} has two levels", r),
            StructuralCheck::LevelsAtLeast(r, n) => format!("{} has at least {} levels", r, n),
            StructuralCheck::ExpectedCountsAtLeast(a, b) => {
                format!("expected counts of {} x {}", a, b)
            }
            StructuralCheck::UniformExpectedAtLeast(r) => format!("expected counts of {}", r),
            StructuralCheck::MinGroupSize(r) => format!("group sizes of {}", r),
            StructuralCheck::FisherSampleSize(a, b) => {
                format!("sample size of {} x {}", a, b)
            }
        }
    }

    fn run(
        &self,
        columns: &BTreeMap<&'static str, &Column>,
        thresholds: &CheckThresholds,
    ) -> Option<(AssumptionVerdict, String)> {
        use AssumptionVerdict::{Met, NotMet};
        let verdict = |ok: bool| if ok { Met } else { NotMet };

        let outcome = match *self {
            StructuralCheck::Numeric(r) => {
                let column = columns.get(r)?;
                (
                    verdict(column.is_numeric()),
                    format!("column '{}' numeric: {}", column.name, column.is_numeric()),
                )
            }
            StructuralCheck::Binary(r) => {
                let column = columns.get(r)?;
                let distinct = column.distinct();
                (
                    verdict(distinct == 2),
                    format!("column '{}' has {} distinct values", column.name, distinct),
                )
            }
            StructuralCheck::LevelsAtLeast(r, min) => {
                let column = columns.get(r)?;
                let distinct = column.distinct();
                (
                    verdict(distinct >= min),
                    format!("column '{}' has {} distinct values", column.name, distinct),
                )
            }
            StructuralCheck::ExpectedCountsAtLeast(a, b) => {
                let table = ContingencyTable::from_columns(columns.get(a)?, columns.get(b)?);
                match table.min_expected() {
                    Some(min) => (
                        verdict(min >= thresholds.min_expected_count),
                        format!(
                            "smallest expected count {:.2} (minimum {})",
                            min, thresholds.min_expected_count
                        ),
                    ),
                    None => (NotMet, "no complete rows to tabulate".to_string()),
                }
            }
            StructuralCheck::UniformExpectedAtLeast(r) => {
                let column = columns.get(r)?;
                let levels = column.distinct();
                if levels == 0 {
                    (NotMet, format!("column '{}' has no values", column.name))
                } else {
                    let expected = column.non_missing() as f64 / levels as f64;
                    (
                        verdict(expected >= thresholds.min_expected_count),
                        format!(
                            "expected count per level {:.2} (minimum {})",
                            expected, thresholds.min_expected_count
                        ),
                    )
                }
            }
            StructuralCheck::MinGroupSize(r) => {
                let column = columns.get(r)?;
                let counts = column.level_counts();
                match counts.iter().min_by_key(|(_, n)| **n) {
                    Some((level, smallest)) => (
                        verdict(*smallest >= thresholds.min_group_size),
                        format!(
                            "smallest group '{}' has {} rows (minimum {})",
                            level, smallest, thresholds.min_group_size
                        ),
                    ),
                    None => (NotMet, format!("column '{}' has no groups", column.name)),
                }
            }
            StructuralCheck::FisherSampleSize(a, b) => {
                let table = ContingencyTable::from_columns(columns.get(a)?, columns.get(b)?);
                let total = table.total();
                let min_expected = table.min_expected().unwrap_or(0.0);
                let small = total < thresholds.fisher_total_limit
                    || min_expected < thresholds.min_expected_count;
                (
                    verdict(small),
                    format!(
                        "total {} (limit {}), smallest expected count {:.2}",
                        total, thresholds.fisher_total_limit, min_expected
                    ),
                )
            }
        };
        Some(outcome)
    }
}

/// Built-in description of what a test needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssumptionProfile {
    pub test: TestId,
    /// Column roles the caller must select
    pub roles: &'static [&'static str],
    pub checks: &'static [StructuralCheck],
    /// Assumptions confirmed outside this crate
    pub confirmations: &'static [&'static str],
}

const INDEPENDENCE: &str = "Independence";
const NORMALITY: &str = "Normality";
const EQUAL_VARIANCES: &str = "Equal Variances";
const KNOWN_VARIANCE: &str = "Known Population Variance";
const NO_OUTLIERS: &str = "No Outliers";
const MONOTONIC: &str = "Monotonic Relationship";
const SIMILAR_SHAPES: &str = "Similar Distribution Shapes";
const SPHERICITY: &str = "Sphericity";

impl AssumptionProfile {
    /// Profile for every test, exhaustively
    pub fn for_test(test: TestId) -> Self {
        use StructuralCheck::*;
        let (roles, checks, confirmations): (
            &'static [&'static str],
            &'static [StructuralCheck],
            &'static [&'static str],
        ) = match test {
            TestId::ChiSquareGoodnessOfFit | TestId::GTestOfGoodnessOfFit => (
                &["variable"],
                &[LevelsAtLeast("variable", 2), UniformExpectedAtLeast("variable")],
                &[INDEPENDENCE],
            ),
            TestId::ChiSquareTestOfIndependence | TestId::GTest => (
                &["variable_1", "variable_2"],
                &[ExpectedCountsAtLeast("variable_1", "variable_2")],
                &[INDEPENDENCE],
            ),
            TestId::CramersV => (
                &["variable_1", "variable_2"],
                &[LevelsAtLeast("variable_1", 2), LevelsAtLeast("variable_2", 2)],
                &[],
            ),
            TestId::ExactTestOfGoodnessOfFitMultinomial => (
                &["variable"],
                &[LevelsAtLeast("variable", 3)],
                &[INDEPENDENCE],
            ),
            TestId::ExactTestOfGoodnessOfFit => {
                (&["variable"], &[Binary("variable")], &[INDEPENDENCE])
            }
            TestId::FactorialAnova => (
                &["factor_1", "factor_2", "value"],
                &[Numeric("value"), MinGroupSize("factor_1"), MinGroupSize("factor_2")],
                &[NORMALITY, EQUAL_VARIANCES, INDEPENDENCE],
            ),
            TestId::FishersExactTest => (
                &["variable_1", "variable_2"],
                &[FisherSampleSize("variable_1", "variable_2")],
                &[INDEPENDENCE],
            ),
            TestId::IndependentSamplesTTest => (
                &["group", "value"],
                &[Numeric("value"), Binary("group"), MinGroupSize("group")],
                &[NORMALITY, EQUAL_VARIANCES, INDEPENDENCE],
            ),
            TestId::IndependentSamplesZTest => (
                &["group", "value"],
                &[Numeric("value"), Binary("group"), MinGroupSize("group")],
                &[NORMALITY, KNOWN_VARIANCE, INDEPENDENCE],
            ),
            TestId::KendallsTau | TestId::SpearmansRho => {
                (&["variable_1", "variable_2"], &[], &[MONOTONIC])
            }
            TestId::KruskalWallis => (
                &["group", "value"],
                &[Numeric("value"), LevelsAtLeast("group", 2), MinGroupSize("group")],
                &[SIMILAR_SHAPES, INDEPENDENCE],
            ),
            TestId::LogLinearAnalysis => (
                &["variable_1", "variable_2", "variable_3"],
                &[
                    ExpectedCountsAtLeast("variable_1", "variable_2"),
                    ExpectedCountsAtLeast("variable_1", "variable_3"),
                    ExpectedCountsAtLeast("variable_2", "variable_3"),
                ],
                &[INDEPENDENCE],
            ),
            TestId::MannWhitneyUTest => (
                &["group", "value"],
                &[Binary("group")],
                &[SIMILAR_SHAPES, INDEPENDENCE],
            ),
            TestId::McNemarsTest => (
                &["before", "after"],
                &[Binary("before"), Binary("after")],
                &["Paired Observations"],
            ),
            TestId::OneProportionZTest => (
                &["variable"],
                &[Binary("variable"), UniformExpectedAtLeast("variable")],
                &[INDEPENDENCE],
            ),
            TestId::OneWayAncova => (
                &["group", "value", "covariate"],
                &[Numeric("value"), Numeric("covariate"), MinGroupSize("group")],
                &[NORMALITY, EQUAL_VARIANCES, "Homogeneity of Regression Slopes"],
            ),
            TestId::OneWayAnova => (
                &["group", "value"],
                &[Numeric("value"), LevelsAtLeast("group", 2), MinGroupSize("group")],
                &[NORMALITY, EQUAL_VARIANCES, INDEPENDENCE],
            ),
            TestId::PairedSamplesTTest => (
                &["sample_1", "sample_2"],
                &[Numeric("sample_1"), Numeric("sample_2")],
                &["Dependent Samples", "Normal Distribution of Differences", NO_OUTLIERS],
            ),
            TestId::PairedSamplesZTest => (
                &["sample_1", "sample_2"],
                &[Numeric("sample_1"), Numeric("sample_2")],
                &["Dependent Samples", "Normal Distribution of Differences", KNOWN_VARIANCE],
            ),
            TestId::PartialCorrelation => (
                &["variable_1", "variable_2", "covariate"],
                &[Numeric("variable_1"), Numeric("variable_2"), Numeric("covariate")],
                &["Linearity", NORMALITY],
            ),
            TestId::PearsonCorrelation => (
                &["variable_1", "variable_2"],
                &[Numeric("variable_1"), Numeric("variable_2")],
                &["Linearity", NORMALITY, NO_OUTLIERS],
            ),
            TestId::PhiCoefficient => (
                &["variable_1", "variable_2"],
                &[Binary("variable_1"), Binary("variable_2")],
                &[],
            ),
            TestId::PointBiserialCorrelation => (
                &["binary", "continuous"],
                &[Binary("binary"), Numeric("continuous")],
                &[NORMALITY, EQUAL_VARIANCES],
            ),
            TestId::SingleSampleTTest => {
                (&["value"], &[Numeric("value")], &[NORMALITY, INDEPENDENCE])
            }
            TestId::SingleSampleWilcoxonSignedRankTest => {
                (&["value"], &[Numeric("value")], &["Symmetric Distribution"])
            }
            TestId::SingleSampleZTest => {
                (&["value"], &[Numeric("value")], &[NORMALITY, KNOWN_VARIANCE])
            }
            TestId::TwoProportionZTest => (
                &["group", "outcome"],
                &[
                    Binary("group"),
                    Binary("outcome"),
                    ExpectedCountsAtLeast("group", "outcome"),
                ],
                &[INDEPENDENCE],
            ),
            TestId::WilcoxonSignedRankTest => (
                &["sample_1", "sample_2"],
                &[Numeric("sample_1"), Numeric("sample_2")],
                &["Symmetric Differences"],
            ),
            TestId::RepeatedMeasuresAnova => (
                &["subject", "condition", "value"],
                &[Numeric("value"), LevelsAtLeast("condition", 3)],
                &[NORMALITY, SPHERICITY],
            ),
            TestId::SplitPlotAnova => (
                &["subject", "within", "between", "value"],
                &[Numeric("value"), LevelsAtLeast("within", 2), LevelsAtLeast("between", 2)],
                &[NORMALITY, SPHERICITY, EQUAL_VARIANCES],
            ),
            TestId::FriedmanTest => (
                &["subject", "condition", "value"],
                &[LevelsAtLeast("condition", 3)],
                &[],
            ),
        };

        AssumptionProfile {
            test,
            roles,
            checks,
            confirmations,
        }
    }

    /// Evaluate against a dataset
    ///
    /// Roles resolve first. A check only runs when every role it reads
    /// resolved to a column; unresolved roles already make the result
    /// Pending.
    pub fn evaluate(
        &self,
        dataset: &Dataset,
        selections: &Selections,
        thresholds: &CheckThresholds,
    ) -> CheckReport {
        let mut findings = Vec::new();
        let mut columns: BTreeMap<&'static str, &Column> = BTreeMap::new();

        for role in self.roles {
            match selections.column(role) {
                None => findings.push(Finding::new(
                    format!("column for {}", role),
                    AssumptionVerdict::Pending,
                    Some("no column selected".to_string()),
                )),
                Some(name) => match dataset.column(name) {
                    Some(column) => {
                        columns.insert(*role, column);
                    }
                    None => {
                        warn!(test = %self.test, role, column = name, "selected column not in dataset");
                        findings.push(Finding::new(
                            format!("column for {}", role),
                            AssumptionVerdict::Pending,
                            Some(format!("dataset has no column '{}'", name)),
                        ));
                    }
                },
            }
        }

        for check in self.checks {
            if !check.roles().iter().all(|r| columns.contains_key(r)) {
                continue;
            }
            if let Some((verdict, detail)) = check.run(&columns, thresholds) {
                findings.push(Finding::new(check.name(), verdict, Some(detail)));
            }
        }

        for assumption in self.confirmations {
            let (verdict, detail) = match selections.confirmation(assumption) {
                Some(true) => (AssumptionVerdict::Met, None),
                Some(false) => (AssumptionVerdict::NotMet, Some("confirmed not to hold".to_string())),
                None => (AssumptionVerdict::Pending, Some("awaiting confirmation".to_string())),
            };
            findings.push(Finding::new(*assumption, verdict, detail));
        }

        let report = CheckReport::from_findings(findings);
        debug!(test = %self.test, verdict = %report.verdict, "assumption check");
        report
    }
}

/// Built-in checker: a profile plus thresholds
#[derive(Debug, Clone, Copy)]
pub struct ProfileChecker {
    profile: AssumptionProfile,
    thresholds: CheckThresholds,
}

impl ProfileChecker {
    pub fn new(test: TestId, thresholds: CheckThresholds) -> Self {
        ProfileChecker {
            profile: AssumptionProfile::for_test(test),
            thresholds,
        }
    }

    pub fn profile(&self) -> &AssumptionProfile {
        &self.profile
    }
}

impl AssumptionChecker for ProfileChecker {
    fn check(&self, dataset: &Dataset, selections: &Selections) -> CheckReport {
        self.profile.evaluate(dataset, selections, &self.thresholds)
    }
}

/// One checker per TestId
pub struct CheckerRegistry {
    checkers: BTreeMap<TestId, Box<dyn AssumptionChecker>>,
}

impl CheckerRegistry {
    /// Built-in profile checkers for every test
    pub fn standard(thresholds: CheckThresholds) -> Self {
        let checkers = TestId::ALL
            .iter()
            .map(|test| {
                let checker: Box<dyn AssumptionChecker> =
                    Box::new(ProfileChecker::new(*test, thresholds));
                (*test, checker)
            })
            .collect();
        CheckerRegistry { checkers }
    }

    /// Replace the checker for one test
    pub fn register(&mut self, test: TestId, checker: Box<dyn AssumptionChecker>) {
        self.checkers.insert(test, checker);
    }

    pub fn check(&self, test: TestId, dataset: &Dataset, selections: &Selections) -> CheckReport {
        match self.checkers.get(&test) {
            Some(checker) => checker.check(dataset, selections),
            None => CheckReport::from_findings(vec![Finding::new(
                "checker",
                AssumptionVerdict::Pending,
                Some(format!("no checker registered for {}", test)),
            )]),
        }
    }
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::standard(CheckThresholds::default())
    }
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("tests", &self.checkers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use AssumptionVerdict::{Met, NotMet, Pending};

    fn paired_dataset() -> Dataset {
        Dataset::from_columns(vec![
            Column::numbers("before", &[5.1, 4.8, 6.0, 5.5, 5.9]),
            Column::numbers("after", &[5.6, 5.0, 6.3, 5.4, 6.4]),
            Column::labels("site", &["a", "a", "b", "b", "b"]),
        ])
        .unwrap()
    }

    fn paired_selections() -> Selections {
        Selections::new()
            .with_column("sample_1", "before")
            .with_column("sample_2", "after")
    }

    #[test]
    fn test_combine_orders_severity() {
        assert_eq!(Met.combine(Pending), Pending);
        assert_eq!(Pending.combine(NotMet), NotMet);
        assert_eq!(NotMet.combine(Met), NotMet);
        assert_eq!(AssumptionVerdict::combine_all([]), Met);
        assert_eq!(AssumptionVerdict::combine_all([Met, Pending, Met]), Pending);
    }

    #[test]
    fn test_every_test_has_a_profile_with_roles() {
        for test in TestId::ALL {
            let profile = AssumptionProfile::for_test(*test);
            assert_eq!(profile.test, *test);
            assert!(!profile.roles.is_empty(), "{} has no roles", test);
            for check in profile.checks {
                for role in check.roles() {
                    assert!(profile.roles.contains(&role), "{}: {} not a role", test, role);
                }
            }
        }
    }

    #[test]
    fn test_missing_selection_is_pending() {
        let registry = CheckerRegistry::default();
        let report = registry.check(
            TestId::PairedSamplesTTest,
            &paired_dataset(),
            &Selections::new().with_column("sample_1", "before"),
        );
        assert_eq!(report.verdict, Pending);
    }

    #[test]
    fn test_unknown_column_is_pending() {
        let registry = CheckerRegistry::default();
        let selections = Selections::new()
            .with_column("sample_1", "before")
            .with_column("sample_2", "later");
        let report = registry.check(TestId::PairedSamplesTTest, &paired_dataset(), &selections);
        assert_eq!(report.verdict, Pending);
        assert!(report
            .findings
            .iter()
            .any(|f| f.detail.as_deref() == Some("dataset has no column 'later'")));
    }

    #[test]
    fn test_confirmations_decide_paired_t() {
        let registry = CheckerRegistry::default();
        let confirmed = paired_selections()
            .with_confirmation("Dependent Samples", true)
            .with_confirmation("normal distribution of differences", true)
            .with_confirmation("No Outliers", true);
        let report = registry.check(TestId::PairedSamplesTTest, &paired_dataset(), &confirmed);
        assert_eq!(report.verdict, Met);

        let refuted = confirmed.with_confirmation("No Outliers", false);
        let report = registry.check(TestId::PairedSamplesTTest, &paired_dataset(), &refuted);
        assert_eq!(report.verdict, NotMet);
    }

    #[test]
    fn test_structural_failure_dominates_pending_confirmations() {
        let registry = CheckerRegistry::default();
        let selections = Selections::new()
            .with_column("sample_1", "before")
            .with_column("sample_2", "site");
        let report = registry.check(TestId::PairedSamplesTTest, &paired_dataset(), &selections);
        assert_eq!(report.verdict, NotMet);
    }

    #[test]
    fn test_expected_counts_threshold() {
        let dataset = Dataset::from_columns(vec![
            Column::labels("a", &["x", "x", "y", "y"]),
            Column::labels("b", &["p", "q", "p", "q"]),
        ])
        .unwrap();
        let selections = Selections::new()
            .with_column("variable_1", "a")
            .with_column("variable_2", "b")
            .with_confirmation("Independence", true);

        let strict = CheckerRegistry::default();
        assert_eq!(
            strict
                .check(TestId::ChiSquareTestOfIndependence, &dataset, &selections)
                .verdict,
            NotMet
        );
        // Same table is small enough to warrant Fisher's exact test
        assert_eq!(
            strict
                .check(TestId::FishersExactTest, &dataset, &selections)
                .verdict,
            Met
        );

        let lenient = CheckerRegistry::standard(CheckThresholds {
            min_expected_count: 1.0,
            ..CheckThresholds::default()
        });
        assert_eq!(
            lenient
                .check(TestId::ChiSquareTestOfIndependence, &dataset, &selections)
                .verdict,
            Met
        );
    }

    fn finding<'a>(report: &'a CheckReport, name: &str) -> &'a Finding {
        report
            .findings
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no finding named {}", name))
    }

    #[test]
    fn test_small_group_fails_t_test() {
        let dataset = Dataset::from_columns(vec![
            Column::labels("arm", &["a", "a", "a", "a", "a", "a", "b", "b", "b"]),
            Column::numbers("score", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]),
        ])
        .unwrap();
        let selections = Selections::new()
            .with_column("group", "arm")
            .with_column("value", "score");
        let report = CheckerRegistry::default().check(
            TestId::IndependentSamplesTTest,
            &dataset,
            &selections,
        );
        assert_eq!(report.verdict, NotMet);
        assert_eq!(finding(&report, "group has two levels").verdict, Met);
        let sizes = finding(&report, "group sizes of group");
        assert_eq!(sizes.verdict, NotMet);
        assert_eq!(
            sizes.detail.as_deref(),
            Some("smallest group 'b' has 3 rows (minimum 5)")
        );
    }

    #[test]
    fn test_three_level_group_is_not_binary() {
        let dataset = Dataset::from_columns(vec![
            Column::labels("arm", &["a", "a", "b", "b", "c", "c"]),
            Column::numbers("score", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        ])
        .unwrap();
        let selections = Selections::new()
            .with_column("group", "arm")
            .with_column("value", "score");
        let report = CheckerRegistry::default().check(
            TestId::IndependentSamplesTTest,
            &dataset,
            &selections,
        );
        assert_eq!(finding(&report, "group has two levels").verdict, NotMet);
        assert_eq!(report.verdict, NotMet);
    }

    #[test]
    fn test_goodness_of_fit_needs_expected_per_level() {
        let sparse = Dataset::from_columns(vec![Column::labels(
            "colour",
            &["red", "red", "blue", "blue", "green", "green", "pink", "pink"],
        )])
        .unwrap();
        let selections = Selections::new().with_column("variable", "colour");
        let registry = CheckerRegistry::default();

        let report = registry.check(TestId::ChiSquareGoodnessOfFit, &sparse, &selections);
        assert_eq!(finding(&report, "variable has at least 2 levels").verdict, Met);
        let expected = finding(&report, "expected counts of variable");
        assert_eq!(expected.verdict, NotMet);
        assert_eq!(
            expected.detail.as_deref(),
            Some("expected count per level 2.00 (minimum 5)")
        );
        assert_eq!(report.verdict, NotMet);
    }

    #[test]
    fn test_levels_at_least() {
        let dataset = Dataset::from_columns(vec![
            Column::labels("two", &["a", "b", "a", "b"]),
            Column::labels("three", &["a", "b", "c", "a"]),
        ])
        .unwrap();
        let registry = CheckerRegistry::default();
        let check = |column: &str| {
            let selections = Selections::new()
                .with_column("variable", column)
                .with_confirmation("Independence", true);
            registry.check(TestId::ExactTestOfGoodnessOfFitMultinomial, &dataset, &selections)
        };

        let report = check("two");
        assert_eq!(finding(&report, "variable has at least 3 levels").verdict, NotMet);
        assert_eq!(report.verdict, NotMet);
        assert_eq!(check("three").verdict, Met);
    }

    #[test]
    fn test_log_linear_checks_every_pair() {
        let v1: Vec<&str> = (0..40).map(|i| if i % 2 == 0 { "x" } else { "y" }).collect();
        let v2: Vec<&str> = (0..40)
            .map(|i| if (i / 2) % 2 == 0 { "p" } else { "q" })
            .collect();
        let v3: Vec<&str> = (0..40).map(|i| if i < 2 { "n" } else { "m" }).collect();
        let dataset = Dataset::from_columns(vec![
            Column::labels("v1", &v1),
            Column::labels("v2", &v2),
            Column::labels("v3", &v3),
        ])
        .unwrap();
        let selections = Selections::new()
            .with_column("variable_1", "v1")
            .with_column("variable_2", "v2")
            .with_column("variable_3", "v3")
            .with_confirmation("Independence", true);

        let report =
            CheckerRegistry::default().check(TestId::LogLinearAnalysis, &dataset, &selections);
        assert_eq!(
            finding(&report, "expected counts of variable_1 x variable_2").verdict,
            Met
        );
        assert_eq!(
            finding(&report, "expected counts of variable_1 x variable_3").verdict,
            NotMet
        );
        assert_eq!(
            finding(&report, "expected counts of variable_2 x variable_3").verdict,
            NotMet
        );
        assert_eq!(report.verdict, NotMet);
    }

    #[test]
    fn test_registered_checker_replaces_profile() {
        let mut registry = CheckerRegistry::default();
        registry.register(
            TestId::PearsonCorrelation,
            Box::new(|_: &Dataset, _: &Selections| NotMet),
        );
        let report = registry.check(
            TestId::PearsonCorrelation,
            &Dataset::default(),
            &Selections::new(),
        );
        assert_eq!(report, CheckReport::from(NotMet));
    }
}
