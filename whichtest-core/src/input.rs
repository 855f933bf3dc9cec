//! Study description supplied by the input-collection layer
//!
//! Every field is either unset (`None`) or one value of a closed
//! enumeration. Numeric quantities (sample size, number of levels) arrive
//! pre-binned and are compared as opaque categories.
//!
//! Global invariants enforced:
//! - InputSpec is a plain value; nothing here mutates shared state
//! - Unset conditioning fields are never inferred
//! - Field relevance follows the input form's conditioning, in one place

use crate::choice::choice_enum;
use crate::error::InputError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

choice_enum! {
    /// What kind of hypothesis is being tested
    pub enum HypothesisType ("hypothesis_type") {
        DifferencesOrGoodnessOfFit => "Differences-or-Goodness-of-fit" | "Differences or Goodness of fit" | "differences",
        Relationship => "Relationship" | "relationship",
    }
}

choice_enum! {
    /// Level of measurement of the outcome variable
    pub enum DataType ("data_type") {
        Nominal => "Nominal",
        Ordinal => "Ordinal",
        Interval => "Interval",
        Ratio => "Ratio",
    }
}

choice_enum! {
    pub enum SampleCount ("number_of_samples") {
        One => "One",
        Two => "Two",
        MoreThanTwo => "More-than-two" | "More than two",
    }
}

choice_enum! {
    pub enum SampleRelationship ("sample_relationship") {
        Independent => "Independent",
        Paired => "Paired" | "Not Independent" | "Dependent",
    }
}

choice_enum! {
    pub enum YesNo ("yes/no") {
        Yes => "Yes",
        No => "No",
    }
}

choice_enum! {
    /// Number of distinct levels per categorical variable
    pub enum LevelCount ("number_of_levels") {
        Two => "Two",
        MoreThanTwo => "More-than-two" | "More than two",
    }
}

choice_enum! {
    /// Pre-quantized cell count bucket
    pub enum SampleSizeBucket ("sample_size_per_cell") {
        UnderTenPerCell => "<10-per-cell" | "Less than 10 in a cell",
        TenPerCell => ">=10-per-cell" | "≥10-per-cell" | "More than 10 in every cell",
        TenPerCellThousandTotal => ">=10-per-cell-and->1000-total"
            | "≥10-per-cell-and->1000-total"
            | "More than 10 in every cell and more than 1000 in total",
    }
}

choice_enum! {
    /// Number of grouping variables in a categorical design
    pub enum GroupVariables ("num_group_variables") {
        One => "One",
        Two => "Two",
        Three => "Three",
    }
}

choice_enum! {
    pub enum VariableNature ("nature_of_variables_of_interest") {
        TwoContinuous => "Two-continuous" | "Two continuous",
        TwoCategorical => "Two-categorical" | "Two categorical",
        AtLeastOneOrdinal => "At-least-one-ordinal" | "At least one ordinal",
        OneBinaryOneContinuous => "One-binary-one-continuous" | "One binary and one continuous",
    }
}

choice_enum! {
    /// Number of independent variables in a continuous multi-group design
    pub enum IndependentVariables ("number_of_independent_variables") {
        One => "One",
        OneWithCovariate => "One-with-covariate" | "One with a covariate",
        Multiple => "Multiple" | "Multiple independent variables" | "Two-or-more",
    }
}

choice_enum! {
    /// Names of the InputSpec fields
    pub enum Field ("field") {
        HypothesisType => "hypothesis_type",
        DataType => "data_type",
        NumberOfSamples => "number_of_samples",
        SampleRelationship => "sample_relationship",
        NormalDist => "normal_dist",
        PopulationVarianceKnown => "population_variance_known",
        NumberOfLevels => "number_of_levels",
        SampleSizePerCell => "sample_size_per_cell",
        NumGroupVariables => "num_group_variables",
        NatureOfVariablesOfInterest => "nature_of_variables_of_interest",
        CovariatesPresent => "covariates_present",
        NumberOfIndependentVariables => "number_of_independent_variables" | "num_variables",
    }
}

impl Field {
    /// Canonical labels this field accepts
    pub fn options(&self) -> Vec<&'static str> {
        fn labels<T: Copy>(all: &[T], label: fn(&T) -> &'static str) -> Vec<&'static str> {
            all.iter().map(label).collect()
        }
        match self {
            Field::HypothesisType => labels(HypothesisType::ALL, HypothesisType::as_str),
            Field::DataType => labels(DataType::ALL, DataType::as_str),
            Field::NumberOfSamples => labels(SampleCount::ALL, SampleCount::as_str),
            Field::SampleRelationship => labels(SampleRelationship::ALL, SampleRelationship::as_str),
            Field::NormalDist | Field::PopulationVarianceKnown | Field::CovariatesPresent => {
                labels(YesNo::ALL, YesNo::as_str)
            }
            Field::NumberOfLevels => labels(LevelCount::ALL, LevelCount::as_str),
            Field::SampleSizePerCell => labels(SampleSizeBucket::ALL, SampleSizeBucket::as_str),
            Field::NumGroupVariables => labels(GroupVariables::ALL, GroupVariables::as_str),
            Field::NatureOfVariablesOfInterest => {
                labels(VariableNature::ALL, VariableNature::as_str)
            }
            Field::NumberOfIndependentVariables => {
                labels(IndependentVariables::ALL, IndependentVariables::as_str)
            }
        }
    }
}

/// Immutable description of the research question and data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSpec {
    pub hypothesis_type: Option<HypothesisType>,
    pub data_type: Option<DataType>,
    pub number_of_samples: Option<SampleCount>,
    pub sample_relationship: Option<SampleRelationship>,
    pub normal_dist: Option<YesNo>,
    pub population_variance_known: Option<YesNo>,
    pub number_of_levels: Option<LevelCount>,
    pub sample_size_per_cell: Option<SampleSizeBucket>,
    pub num_group_variables: Option<GroupVariables>,
    pub nature_of_variables_of_interest: Option<VariableNature>,
    pub covariates_present: Option<YesNo>,
    #[serde(alias = "num_variables")]
    pub number_of_independent_variables: Option<IndependentVariables>,
}

/// Advisory problem with an InputSpec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InputIssue {
    /// A field was answered although the answers it depends on do not ask for it
    OutOfContext { field: Field },
}

impl std::fmt::Display for InputIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputIssue::OutOfContext { field } => {
                write!(f, "{} is set but not asked for by the other answers", field)
            }
        }
    }
}

impl InputSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.label(field).is_some()
    }

    /// Canonical label of a field's value, if set
    pub fn label(&self, field: Field) -> Option<&'static str> {
        match field {
            Field::HypothesisType => self.hypothesis_type.map(|v| v.as_str()),
            Field::DataType => self.data_type.map(|v| v.as_str()),
            Field::NumberOfSamples => self.number_of_samples.map(|v| v.as_str()),
            Field::SampleRelationship => self.sample_relationship.map(|v| v.as_str()),
            Field::NormalDist => self.normal_dist.map(|v| v.as_str()),
            Field::PopulationVarianceKnown => self.population_variance_known.map(|v| v.as_str()),
            Field::NumberOfLevels => self.number_of_levels.map(|v| v.as_str()),
            Field::SampleSizePerCell => self.sample_size_per_cell.map(|v| v.as_str()),
            Field::NumGroupVariables => self.num_group_variables.map(|v| v.as_str()),
            Field::NatureOfVariablesOfInterest => {
                self.nature_of_variables_of_interest.map(|v| v.as_str())
            }
            Field::CovariatesPresent => self.covariates_present.map(|v| v.as_str()),
            Field::NumberOfIndependentVariables => {
                self.number_of_independent_variables.map(|v| v.as_str())
            }
        }
    }

    /// Set a field from a label, returning the updated spec
    pub fn with_label(mut self, field: Field, raw: &str) -> Result<Self, InputError> {
        match field {
            Field::HypothesisType => self.hypothesis_type = Some(raw.parse()?),
            Field::DataType => self.data_type = Some(raw.parse()?),
            Field::NumberOfSamples => self.number_of_samples = Some(raw.parse()?),
            Field::SampleRelationship => self.sample_relationship = Some(raw.parse()?),
            Field::NormalDist => self.normal_dist = Some(raw.parse()?),
            Field::PopulationVarianceKnown => self.population_variance_known = Some(raw.parse()?),
            Field::NumberOfLevels => self.number_of_levels = Some(raw.parse()?),
            Field::SampleSizePerCell => self.sample_size_per_cell = Some(raw.parse()?),
            Field::NumGroupVariables => self.num_group_variables = Some(raw.parse()?),
            Field::NatureOfVariablesOfInterest => {
                self.nature_of_variables_of_interest = Some(raw.parse()?)
            }
            Field::CovariatesPresent => self.covariates_present = Some(raw.parse()?),
            Field::NumberOfIndependentVariables => {
                self.number_of_independent_variables = Some(raw.parse()?)
            }
        }
        Ok(self)
    }

    /// Parse `field=value` pairs into a spec
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs.into_iter().try_fold(InputSpec::new(), |spec, (name, value)| {
            let field: Field = name
                .parse()
                .map_err(|_| InputError::UnknownField(name.to_string()))?;
            spec.with_label(field, value)
        })
    }

    /// True for Nominal/Ordinal data
    pub fn is_categorical(&self) -> Option<bool> {
        self.data_type
            .map(|d| matches!(d, DataType::Nominal | DataType::Ordinal))
    }

    fn is_differences(&self) -> bool {
        self.hypothesis_type == Some(HypothesisType::DifferencesOrGoodnessOfFit)
    }

    fn is_relationship(&self) -> bool {
        self.hypothesis_type == Some(HypothesisType::Relationship)
    }

    /// Grouping of a categorical design
    ///
    /// `num_group_variables` decides whenever it is set, and
    /// `number_of_samples` is then ignored. Otherwise One or Two samples
    /// stand in for One or Two grouping variables; More-than-two samples says
    /// nothing about the number of variables and leaves grouping open.
    pub fn grouping(&self) -> Option<GroupVariables> {
        self.num_group_variables
            .or_else(|| self.grouping_from_samples())
    }

    fn grouping_from_samples(&self) -> Option<GroupVariables> {
        match self.number_of_samples? {
            SampleCount::One => Some(GroupVariables::One),
            SampleCount::Two => Some(GroupVariables::Two),
            SampleCount::MoreThanTwo => None,
        }
    }

    /// Whether the other answers make `field` a question worth asking
    pub fn is_relevant(&self, field: Field) -> bool {
        let categorical = self.is_differences() && self.is_categorical() == Some(true);
        let continuous = self.is_differences() && self.is_categorical() == Some(false);
        let grouping = self.grouping();

        match field {
            Field::HypothesisType => true,
            Field::DataType => self.is_differences(),
            // Asked unless number_of_samples already settles the grouping
            Field::NumGroupVariables => {
                categorical
                    && (self.num_group_variables.is_some() || self.grouping_from_samples().is_none())
            }
            Field::NumberOfSamples => continuous || categorical,
            Field::NormalDist => continuous,
            Field::PopulationVarianceKnown => {
                continuous
                    && self.normal_dist == Some(YesNo::Yes)
                    && matches!(
                        self.number_of_samples,
                        Some(SampleCount::One | SampleCount::Two)
                    )
            }
            Field::SampleRelationship => {
                (continuous
                    && matches!(
                        self.number_of_samples,
                        Some(SampleCount::Two | SampleCount::MoreThanTwo)
                    ))
                    || (categorical && grouping == Some(GroupVariables::Two))
            }
            Field::NumberOfIndependentVariables => {
                continuous
                    && self.number_of_samples == Some(SampleCount::MoreThanTwo)
                    && self.normal_dist == Some(YesNo::Yes)
                    && self.sample_relationship.is_some()
            }
            Field::NumberOfLevels => {
                (categorical
                    && matches!(grouping, Some(GroupVariables::One | GroupVariables::Two)))
                    || (self.is_relationship()
                        && self.nature_of_variables_of_interest
                            == Some(VariableNature::TwoCategorical))
            }
            Field::SampleSizePerCell => {
                categorical
                    && (grouping == Some(GroupVariables::One)
                        || (grouping == Some(GroupVariables::Two)
                            && self.sample_relationship == Some(SampleRelationship::Independent)))
            }
            Field::NatureOfVariablesOfInterest => self.is_relationship(),
            Field::CovariatesPresent => {
                self.is_relationship()
                    && self.nature_of_variables_of_interest == Some(VariableNature::TwoContinuous)
            }
        }
    }

    /// Relevant fields, in form order
    pub fn relevant_fields(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| self.is_relevant(*f))
            .collect()
    }

    /// Relevant fields that are still unanswered
    pub fn pending_fields(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| self.is_relevant(*f) && !self.is_set(*f))
            .collect()
    }

    /// Advisory checks; the decision engine does not depend on them
    pub fn validate(&self) -> Vec<InputIssue> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| self.is_set(*f) && !self.is_relevant(*f))
            .map(|field| InputIssue::OutOfContext { field })
            .collect()
    }
}

impl InputSpec {
    /// Parse a JSON object of field labels
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("input must be a JSON object of field labels")
    }

    /// Load an input file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse input: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn differences(data_type: DataType) -> InputSpec {
        InputSpec {
            hypothesis_type: Some(HypothesisType::DifferencesOrGoodnessOfFit),
            data_type: Some(data_type),
            ..InputSpec::default()
        }
    }

    #[test]
    fn test_labels_accept_form_wording() {
        assert_eq!("More than two".parse(), Ok(SampleCount::MoreThanTwo));
        assert_eq!(
            "Less than 10 in a cell".parse(),
            Ok(SampleSizeBucket::UnderTenPerCell)
        );
        assert_eq!("≥10-per-cell".parse(), Ok(SampleSizeBucket::TenPerCell));
        assert_eq!("not independent".parse(), Ok(SampleRelationship::Paired));
        assert!("Sometimes".parse::<YesNo>().is_err());
    }

    #[test]
    fn test_deserialize_partial_spec() {
        let json = r#"{
            "hypothesis_type": "Differences-or-Goodness-of-fit",
            "data_type": "Interval",
            "number_of_samples": "One",
            "normal_dist": "Yes",
            "population_variance_known": null
        }"#;
        let spec: InputSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.data_type, Some(DataType::Interval));
        assert_eq!(spec.population_variance_known, None);
        assert_eq!(spec.covariates_present, None);
    }

    #[test]
    fn test_deserialize_rejects_unknown_field() {
        let result: Result<InputSpec, _> = serde_json::from_str(r#"{"p_value": "0.05"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_pairs() {
        let spec = InputSpec::from_pairs([
            ("hypothesis_type", "Relationship"),
            ("nature_of_variables_of_interest", "Two continuous"),
            ("num_variables", "One"),
        ])
        .unwrap();
        assert_eq!(spec.hypothesis_type, Some(HypothesisType::Relationship));
        assert_eq!(
            spec.number_of_independent_variables,
            Some(IndependentVariables::One)
        );
        assert_eq!(
            InputSpec::from_pairs([("colour", "blue")]),
            Err(InputError::UnknownField("colour".to_string()))
        );
    }

    #[test]
    fn test_pending_fields_start_with_hypothesis() {
        assert_eq!(InputSpec::new().pending_fields(), vec![Field::HypothesisType]);
    }

    #[test]
    fn test_pending_fields_continuous_one_sample() {
        let spec = InputSpec {
            number_of_samples: Some(SampleCount::One),
            normal_dist: Some(YesNo::Yes),
            ..differences(DataType::Ratio)
        };
        assert_eq!(spec.pending_fields(), vec![Field::PopulationVarianceKnown]);
    }

    #[test]
    fn test_pending_fields_categorical_two_groups() {
        let spec = InputSpec {
            num_group_variables: Some(GroupVariables::Two),
            ..differences(DataType::Nominal)
        };
        assert_eq!(
            spec.pending_fields(),
            vec![
                Field::NumberOfSamples,
                Field::SampleRelationship,
                Field::NumberOfLevels
            ]
        );
    }

    #[test]
    fn test_grouping_variables_override_sample_count() {
        let spec = InputSpec {
            num_group_variables: Some(GroupVariables::Two),
            number_of_samples: Some(SampleCount::MoreThanTwo),
            ..differences(DataType::Ordinal)
        };
        assert_eq!(spec.grouping(), Some(GroupVariables::Two));
        assert!(spec.is_relevant(Field::NumberOfSamples));
        assert!(spec.is_relevant(Field::SampleRelationship));
        assert!(spec.validate().is_empty());
    }

    #[test]
    fn test_many_samples_leave_grouping_open() {
        let spec = InputSpec {
            number_of_samples: Some(SampleCount::MoreThanTwo),
            ..differences(DataType::Nominal)
        };
        assert_eq!(spec.grouping(), None);
        assert_eq!(spec.pending_fields(), vec![Field::NumGroupVariables]);

        let two = InputSpec {
            number_of_samples: Some(SampleCount::Two),
            ..spec
        };
        assert_eq!(two.grouping(), Some(GroupVariables::Two));
    }

    #[test]
    fn test_grouping_answered_once() {
        let spec = InputSpec {
            number_of_samples: Some(SampleCount::One),
            ..differences(DataType::Nominal)
        };
        assert!(!spec.is_relevant(Field::NumGroupVariables));
        assert_eq!(
            spec.pending_fields(),
            vec![Field::NumberOfLevels, Field::SampleSizePerCell]
        );

        let both = InputSpec {
            num_group_variables: Some(GroupVariables::One),
            ..spec
        };
        assert!(both.validate().is_empty());
    }

    #[test]
    fn test_field_options() {
        assert_eq!(Field::NormalDist.options(), vec!["Yes", "No"]);
        assert_eq!(
            Field::SampleSizePerCell.options(),
            vec!["<10-per-cell", ">=10-per-cell", ">=10-per-cell-and->1000-total"]
        );
    }

    #[test]
    fn test_validate_flags_out_of_context_fields() {
        let spec = InputSpec {
            number_of_samples: Some(SampleCount::One),
            normal_dist: Some(YesNo::No),
            population_variance_known: Some(YesNo::Yes),
            covariates_present: Some(YesNo::No),
            ..differences(DataType::Interval)
        };
        let issues = spec.validate();
        assert_eq!(
            issues,
            vec![
                InputIssue::OutOfContext {
                    field: Field::PopulationVarianceKnown
                },
                InputIssue::OutOfContext {
                    field: Field::CovariatesPresent
                },
            ]
        );
    }

    #[test]
    fn test_complete_spec_has_no_issues() {
        let spec = InputSpec {
            hypothesis_type: Some(HypothesisType::Relationship),
            nature_of_variables_of_interest: Some(VariableNature::TwoCategorical),
            number_of_levels: Some(LevelCount::Two),
            ..InputSpec::default()
        };
        assert!(spec.validate().is_empty());
        assert!(spec.pending_fields().is_empty());
    }
}
