//! Decision table mapping an InputSpec to recommended tests
//!
//! The table is an ordered list of rules. Each rule is a conjunction of
//! exact-equality conditions over InputSpec fields; the first rule whose
//! conditions all hold fires. An unset field never satisfies a condition,
//! so an under-specified InputSpec falls through to an empty recommendation.
//!
//! Global invariants enforced:
//! - Evaluation is a pure function of the InputSpec (no IO, no state)
//! - Every TestId in the table is a catalog key (TestId is closed)
//! - For a fully specified InputSpec at most one rule fires; the only
//!   multi-test results are the rules that list several tests

use crate::catalog::TestId;
use crate::input::{
    DataType, Field, GroupVariables, HypothesisType, IndependentVariables, InputSpec, LevelCount,
    SampleCount, SampleRelationship, SampleSizeBucket, VariableNature, YesNo,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One exact-equality test over an InputSpec field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Hypothesis(HypothesisType),
    /// Membership in a set of data types
    DataTypeIn(&'static [DataType]),
    Samples(SampleCount),
    Relationship(SampleRelationship),
    Normal(YesNo),
    VarianceKnown(YesNo),
    Levels(LevelCount),
    SizeBucket(SampleSizeBucket),
    /// Categorical grouping, see [`InputSpec::grouping`]
    Grouping(GroupVariables),
    Variables(IndependentVariables),
    Nature(VariableNature),
    Covariates(YesNo),
}

impl Condition {
    pub fn holds(&self, spec: &InputSpec) -> bool {
        match *self {
            Condition::Hypothesis(v) => spec.hypothesis_type == Some(v),
            Condition::DataTypeIn(set) => spec.data_type.is_some_and(|d| set.contains(&d)),
            Condition::Samples(v) => spec.number_of_samples == Some(v),
            Condition::Relationship(v) => spec.sample_relationship == Some(v),
            Condition::Normal(v) => spec.normal_dist == Some(v),
            Condition::VarianceKnown(v) => spec.population_variance_known == Some(v),
            Condition::Levels(v) => spec.number_of_levels == Some(v),
            Condition::SizeBucket(v) => spec.sample_size_per_cell == Some(v),
            Condition::Grouping(v) => spec.grouping() == Some(v),
            Condition::Variables(v) => spec.number_of_independent_variables == Some(v),
            Condition::Nature(v) => spec.nature_of_variables_of_interest == Some(v),
            Condition::Covariates(v) => spec.covariates_present == Some(v),
        }
    }

    /// The field this condition reads
    pub fn field(&self) -> Field {
        match self {
            Condition::Hypothesis(_) => Field::HypothesisType,
            Condition::DataTypeIn(_) => Field::DataType,
            Condition::Samples(_) => Field::NumberOfSamples,
            Condition::Relationship(_) => Field::SampleRelationship,
            Condition::Normal(_) => Field::NormalDist,
            Condition::VarianceKnown(_) => Field::PopulationVarianceKnown,
            Condition::Levels(_) => Field::NumberOfLevels,
            Condition::SizeBucket(_) => Field::SampleSizePerCell,
            Condition::Grouping(_) => Field::NumGroupVariables,
            Condition::Variables(_) => Field::NumberOfIndependentVariables,
            Condition::Nature(_) => Field::NatureOfVariablesOfInterest,
            Condition::Covariates(_) => Field::CovariatesPresent,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = self.field();
        match self {
            Condition::DataTypeIn(set) => {
                let labels: Vec<&str> = set.iter().map(|d| d.as_str()).collect();
                write!(f, "{} in [{}]", field, labels.join(", "))
            }
            Condition::Hypothesis(v) => write!(f, "{}={}", field, v),
            Condition::Samples(v) => write!(f, "{}={}", field, v),
            Condition::Relationship(v) => write!(f, "{}={}", field, v),
            Condition::Normal(v) | Condition::VarianceKnown(v) | Condition::Covariates(v) => {
                write!(f, "{}={}", field, v)
            }
            Condition::Levels(v) => write!(f, "{}={}", field, v),
            Condition::SizeBucket(v) => write!(f, "{}={}", field, v),
            Condition::Grouping(v) => write!(f, "grouping={}", v),
            Condition::Variables(v) => write!(f, "{}={}", field, v),
            Condition::Nature(v) => write!(f, "{}={}", field, v),
        }
    }
}

/// A named (conditions, result) row of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub name: &'static str,
    pub when: &'static [Condition],
    pub then: &'static [TestId],
}

impl Rule {
    pub fn matches(&self, spec: &InputSpec) -> bool {
        self.when.iter().all(|c| c.holds(spec))
    }

    /// Rules listing several tests offer all of them together
    pub fn is_multi(&self) -> bool {
        self.then.len() > 1
    }
}

use Condition::*;

const DIFF: Condition = Hypothesis(HypothesisType::DifferencesOrGoodnessOfFit);
const REL: Condition = Hypothesis(HypothesisType::Relationship);
const CATEGORICAL: Condition = DataTypeIn(&[DataType::Nominal, DataType::Ordinal]);
const CONTINUOUS: Condition = DataTypeIn(&[DataType::Interval, DataType::Ratio]);

const UNDER_10: Condition = SizeBucket(SampleSizeBucket::UnderTenPerCell);
const OVER_10: Condition = SizeBucket(SampleSizeBucket::TenPerCell);
const OVER_1000: Condition = SizeBucket(SampleSizeBucket::TenPerCellThousandTotal);

const ONE_GROUP: Condition = Grouping(GroupVariables::One);
const TWO_GROUPS: Condition = Grouping(GroupVariables::Two);
const TWO_LEVELS: Condition = Levels(LevelCount::Two);
const MANY_LEVELS: Condition = Levels(LevelCount::MoreThanTwo);

const INDEPENDENT: Condition = Relationship(SampleRelationship::Independent);
const PAIRED: Condition = Relationship(SampleRelationship::Paired);
const NORMAL: Condition = Normal(YesNo::Yes);
const NOT_NORMAL: Condition = Normal(YesNo::No);
const VAR_KNOWN: Condition = VarianceKnown(YesNo::Yes);
const VAR_UNKNOWN: Condition = VarianceKnown(YesNo::No);

/// The decision table, in evaluation order
pub static RULES: &[Rule] = &[
    // Differences, categorical data, one grouping variable
    Rule {
        name: "categorical-one-group-two-levels-small",
        when: &[DIFF, CATEGORICAL, ONE_GROUP, TWO_LEVELS, UNDER_10],
        then: &[TestId::ExactTestOfGoodnessOfFit],
    },
    Rule {
        name: "categorical-one-group-two-levels",
        when: &[DIFF, CATEGORICAL, ONE_GROUP, TWO_LEVELS, OVER_10],
        then: &[TestId::OneProportionZTest],
    },
    Rule {
        name: "categorical-one-group-two-levels-large",
        when: &[DIFF, CATEGORICAL, ONE_GROUP, TWO_LEVELS, OVER_1000],
        then: &[TestId::GTestOfGoodnessOfFit],
    },
    Rule {
        name: "categorical-one-group-many-levels-small",
        when: &[DIFF, CATEGORICAL, ONE_GROUP, MANY_LEVELS, UNDER_10],
        then: &[TestId::ExactTestOfGoodnessOfFitMultinomial],
    },
    Rule {
        name: "categorical-one-group-many-levels",
        when: &[DIFF, CATEGORICAL, ONE_GROUP, MANY_LEVELS, OVER_10],
        then: &[TestId::ChiSquareGoodnessOfFit],
    },
    Rule {
        name: "categorical-one-group-many-levels-large",
        when: &[DIFF, CATEGORICAL, ONE_GROUP, MANY_LEVELS, OVER_1000],
        then: &[TestId::GTestOfGoodnessOfFit],
    },
    // Differences, categorical data, two grouping variables
    Rule {
        name: "categorical-two-groups-two-levels-small",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, TWO_LEVELS, INDEPENDENT, UNDER_10],
        then: &[TestId::FishersExactTest],
    },
    Rule {
        name: "categorical-two-groups-two-levels",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, TWO_LEVELS, INDEPENDENT, OVER_10],
        then: &[TestId::TwoProportionZTest],
    },
    Rule {
        name: "categorical-two-groups-two-levels-large",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, TWO_LEVELS, INDEPENDENT, OVER_1000],
        then: &[TestId::GTest],
    },
    Rule {
        name: "categorical-two-groups-two-levels-paired",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, TWO_LEVELS, PAIRED],
        then: &[TestId::McNemarsTest],
    },
    Rule {
        name: "categorical-two-groups-many-levels-paired",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, MANY_LEVELS, PAIRED],
        then: &[TestId::McNemarsTest],
    },
    Rule {
        name: "categorical-two-groups-many-levels-small",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, MANY_LEVELS, INDEPENDENT, UNDER_10],
        then: &[TestId::FishersExactTest],
    },
    Rule {
        name: "categorical-two-groups-many-levels",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, MANY_LEVELS, INDEPENDENT, OVER_10],
        then: &[TestId::ChiSquareTestOfIndependence],
    },
    Rule {
        name: "categorical-two-groups-many-levels-large",
        when: &[DIFF, CATEGORICAL, TWO_GROUPS, MANY_LEVELS, INDEPENDENT, OVER_1000],
        then: &[TestId::GTest],
    },
    // Differences, categorical data, three grouping variables
    Rule {
        name: "categorical-three-groups",
        when: &[DIFF, CATEGORICAL, Grouping(GroupVariables::Three)],
        then: &[TestId::LogLinearAnalysis],
    },
    // Differences, continuous data, one sample
    Rule {
        name: "continuous-one-sample-known-variance",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::One), NORMAL, VAR_KNOWN],
        then: &[TestId::SingleSampleZTest],
    },
    Rule {
        name: "continuous-one-sample",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::One), NORMAL, VAR_UNKNOWN],
        then: &[TestId::SingleSampleTTest],
    },
    Rule {
        name: "continuous-one-sample-non-normal",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::One), NOT_NORMAL],
        then: &[TestId::SingleSampleWilcoxonSignedRankTest],
    },
    // Differences, continuous data, two samples
    Rule {
        name: "continuous-two-independent-known-variance",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::Two), INDEPENDENT, NORMAL, VAR_KNOWN],
        then: &[TestId::IndependentSamplesZTest],
    },
    Rule {
        name: "continuous-two-independent",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::Two), INDEPENDENT, NORMAL, VAR_UNKNOWN],
        then: &[TestId::IndependentSamplesTTest],
    },
    Rule {
        name: "continuous-two-independent-non-normal",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::Two), INDEPENDENT, NOT_NORMAL],
        then: &[TestId::MannWhitneyUTest],
    },
    Rule {
        name: "continuous-two-paired-known-variance",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::Two), PAIRED, NORMAL, VAR_KNOWN],
        then: &[TestId::PairedSamplesZTest],
    },
    Rule {
        name: "continuous-two-paired",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::Two), PAIRED, NORMAL, VAR_UNKNOWN],
        then: &[TestId::PairedSamplesTTest],
    },
    Rule {
        name: "continuous-two-paired-non-normal",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::Two), PAIRED, NOT_NORMAL],
        then: &[TestId::WilcoxonSignedRankTest],
    },
    // Differences, continuous data, more than two samples
    Rule {
        name: "continuous-many-independent",
        when: &[
            DIFF,
            CONTINUOUS,
            Samples(SampleCount::MoreThanTwo),
            INDEPENDENT,
            NORMAL,
            Variables(IndependentVariables::One),
        ],
        then: &[TestId::OneWayAnova],
    },
    Rule {
        name: "continuous-many-independent-covariate",
        when: &[
            DIFF,
            CONTINUOUS,
            Samples(SampleCount::MoreThanTwo),
            INDEPENDENT,
            NORMAL,
            Variables(IndependentVariables::OneWithCovariate),
        ],
        then: &[TestId::OneWayAncova],
    },
    Rule {
        name: "continuous-many-independent-factorial",
        when: &[
            DIFF,
            CONTINUOUS,
            Samples(SampleCount::MoreThanTwo),
            INDEPENDENT,
            NORMAL,
            Variables(IndependentVariables::Multiple),
        ],
        then: &[TestId::FactorialAnova],
    },
    Rule {
        name: "continuous-many-independent-non-normal",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::MoreThanTwo), INDEPENDENT, NOT_NORMAL],
        then: &[TestId::KruskalWallis, TestId::OneWayAnova],
    },
    Rule {
        name: "continuous-many-paired",
        when: &[
            DIFF,
            CONTINUOUS,
            Samples(SampleCount::MoreThanTwo),
            PAIRED,
            NORMAL,
            Variables(IndependentVariables::One),
        ],
        then: &[TestId::RepeatedMeasuresAnova],
    },
    Rule {
        name: "continuous-many-paired-split-plot",
        when: &[
            DIFF,
            CONTINUOUS,
            Samples(SampleCount::MoreThanTwo),
            PAIRED,
            NORMAL,
            Variables(IndependentVariables::Multiple),
        ],
        then: &[TestId::SplitPlotAnova],
    },
    Rule {
        name: "continuous-many-paired-non-normal",
        when: &[DIFF, CONTINUOUS, Samples(SampleCount::MoreThanTwo), PAIRED, NOT_NORMAL],
        then: &[TestId::FriedmanTest],
    },
    // Relationship
    Rule {
        name: "relationship-continuous-covariates",
        when: &[REL, Nature(VariableNature::TwoContinuous), Covariates(YesNo::Yes)],
        then: &[TestId::PartialCorrelation],
    },
    Rule {
        name: "relationship-continuous",
        when: &[REL, Nature(VariableNature::TwoContinuous), Covariates(YesNo::No)],
        then: &[TestId::PearsonCorrelation],
    },
    Rule {
        name: "relationship-categorical-two-levels",
        when: &[REL, Nature(VariableNature::TwoCategorical), TWO_LEVELS],
        then: &[TestId::PhiCoefficient],
    },
    Rule {
        name: "relationship-categorical-many-levels",
        when: &[REL, Nature(VariableNature::TwoCategorical), MANY_LEVELS],
        then: &[TestId::CramersV],
    },
    Rule {
        name: "relationship-ordinal",
        when: &[REL, Nature(VariableNature::AtLeastOneOrdinal)],
        then: &[TestId::KendallsTau, TestId::SpearmansRho],
    },
    Rule {
        name: "relationship-binary-continuous",
        when: &[REL, Nature(VariableNature::OneBinaryOneContinuous)],
        then: &[TestId::PointBiserialCorrelation],
    },
];

/// How rules listing several tests are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiRecommendationPolicy {
    /// Return every listed test
    #[default]
    All,
    /// Return only the first listed test
    First,
}

/// Ordered result of one decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub tests: Vec<TestId>,
    /// Name of the rule that fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
    /// Unanswered relevant fields when nothing fired
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending_fields: Vec<Field>,
}

impl Recommendation {
    /// Empty result: more input is needed
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn contains(&self, test: TestId) -> bool {
        self.tests.contains(&test)
    }

    pub fn first(&self) -> Option<TestId> {
        self.tests.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = TestId> + '_ {
        self.tests.iter().copied()
    }
}

/// Evaluates the decision table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionEngine {
    policy: MultiRecommendationPolicy,
}

impl DecisionEngine {
    pub fn new(policy: MultiRecommendationPolicy) -> Self {
        DecisionEngine { policy }
    }

    pub fn policy(&self) -> MultiRecommendationPolicy {
        self.policy
    }

    /// The full table, in evaluation order
    pub fn rules() -> &'static [Rule] {
        RULES
    }

    /// Every rule whose conditions hold, in table order
    pub fn matching_rules(spec: &InputSpec) -> Vec<&'static Rule> {
        RULES.iter().filter(|rule| rule.matches(spec)).collect()
    }

    /// First-match evaluation of the table
    pub fn recommend(&self, spec: &InputSpec) -> Recommendation {
        let Some(rule) = RULES.iter().find(|rule| rule.matches(spec)) else {
            let pending_fields = spec.pending_fields();
            debug!(pending = ?pending_fields, "no decision rule matched");
            return Recommendation {
                tests: Vec::new(),
                rule: None,
                pending_fields,
            };
        };

        let tests = match self.policy {
            MultiRecommendationPolicy::All => rule.then.to_vec(),
            MultiRecommendationPolicy::First => rule.then.iter().take(1).copied().collect(),
        };
        debug!(rule = rule.name, tests = ?tests, "decision rule fired");

        Recommendation {
            tests,
            rule: Some(rule.name),
            pending_fields: Vec::new(),
        }
    }
}

/// Recommend with the default policy
pub fn recommend(spec: &InputSpec) -> Recommendation {
    DecisionEngine::default().recommend(spec)
}
