//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::assumptions::CheckReport;
use crate::catalog::{Fallback, TestCatalog, TestId};
use crate::config::ResolvedConfig;
use crate::content::ContentView;
use crate::controller::{Event, SelectionState};
use crate::decision::{MultiRecommendationPolicy, Recommendation, Rule};
use crate::input::{InputIssue, InputSpec};
use serde::Serialize;

/// Input, warnings and outcome of one recommendation
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationReport {
    pub input: InputSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<InputIssue>,
    pub recommendation: Recommendation,
}

impl RecommendationReport {
    pub fn new(input: InputSpec, recommendation: Recommendation) -> Self {
        RecommendationReport {
            issues: input.validate(),
            input,
            recommendation,
        }
    }

    pub fn render_text(&self) -> String {
        render_recommendation_text(&self.input, &self.recommendation, &self.issues)
    }
}

/// Outcome of running one assumption check through the controller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionReport {
    pub test: TestId,
    pub report: CheckReport,
    pub state: SelectionState,
    pub history: Vec<Event>,
}

/// Render any report as pretty JSON
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Render a recommendation as text output
pub fn render_recommendation_text(
    spec: &InputSpec,
    recommendation: &Recommendation,
    issues: &[InputIssue],
) -> String {
    let mut output = String::new();

    for issue in issues {
        output.push_str(&format!("warning: {}\n", issue));
    }

    if recommendation.is_empty() {
        if recommendation.pending_fields.is_empty() {
            output.push_str("No rule covers this combination of answers.\n");
        } else {
            output.push_str("No recommendation yet: more input is needed.\n");
            output.push_str("Still to answer:\n");
            for field in &recommendation.pending_fields {
                output.push_str(&format!("  {:<34} {}\n", field, field.options().join(" | ")));
            }
        }
        return output;
    }

    let answered: Vec<String> = spec
        .relevant_fields()
        .into_iter()
        .filter_map(|f| spec.label(f).map(|v| format!("{}={}", f, v)))
        .collect();
    if !answered.is_empty() {
        output.push_str(&format!("Input: {}\n", answered.join(", ")));
    }

    if let Some(rule) = recommendation.rule {
        output.push_str(&format!("Rule: {}\n", rule));
    }
    output.push_str("Recommended:\n");
    for test in recommendation.iter() {
        output.push_str(&format!("  {:<45} {}\n", test.as_str(), test.name()));
    }

    output
}

/// Render the catalog as a table
pub fn render_catalog_text(catalog: &TestCatalog) -> String {
    let mut output = String::new();
    output.push_str(&format!("{:<52} {}\n", "TEST", "ALTERNATIVE"));
    for entry in catalog.entries() {
        output.push_str(&format!(
            "{:<52} {}\n",
            entry.id.as_str(),
            fallback_label(entry.alternative)
        ));
    }
    output
}

/// Render a single fallback lookup
pub fn render_fallback_text(test: TestId, fallback: Fallback) -> String {
    match fallback {
        Fallback::Alternative(alternative) => format!(
            "{} -> {} ({})\n",
            test.as_str(),
            alternative.as_str(),
            alternative.name()
        ),
        Fallback::NoAlternativeDefined => format!(
            "{} has no designated alternative; choose manually from the catalog\n",
            test.as_str()
        ),
    }
}

/// Render the decision table, one rule per block
pub fn render_rules_text(rules: &[Rule]) -> String {
    let mut output = String::new();
    for (i, rule) in rules.iter().enumerate() {
        let conditions: Vec<String> = rule.when.iter().map(|c| c.to_string()).collect();
        let tests: Vec<&str> = rule.then.iter().map(|t| t.as_str()).collect();
        output.push_str(&format!("{:>2}. {}\n", i + 1, rule.name));
        output.push_str(&format!("    when {}\n", conditions.join(" and ")));
        output.push_str(&format!("    then {}\n", tests.join(", ")));
    }
    output
}

/// Render an assumption check session as text output
pub fn render_session_text(session: &SessionReport) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Assumptions for {}: {}\n",
        session.test.as_str(),
        session.report.verdict
    ));
    for finding in &session.report.findings {
        match &finding.detail {
            Some(detail) => output.push_str(&format!(
                "  [{:<7}] {}: {}\n",
                finding.verdict, finding.name, detail
            )),
            None => output.push_str(&format!("  [{:<7}] {}\n", finding.verdict, finding.name)),
        }
    }

    output.push_str(&format!("State: {}", session.state.name()));
    match &session.state {
        SelectionState::AwaitingAssumptionCheck {
            test,
            substituted_from: Some(from),
        } => output.push_str(&format!(
            " ({} substituted for {}; check it next)\n",
            test.as_str(),
            from.as_str()
        )),
        SelectionState::Recommended { tests, .. } => match fallback_note(session) {
            Some(note) => output.push_str(&format!(
                " ({}; choose from {} catalog tests)\n",
                note,
                tests.len()
            )),
            None => output.push('\n'),
        },
        SelectionState::AwaitingInput { .. } => match fallback_note(session) {
            Some(note) => output.push_str(&format!(" ({}; revise the input)\n", note)),
            None => output.push('\n'),
        },
        SelectionState::Blocked { .. } => {
            output.push_str(" (select the missing columns or confirm the pending assumptions)\n")
        }
        _ => output.push('\n'),
    }

    output
}

/// Why the cycle left its selection, read from the last event
fn fallback_note(session: &SessionReport) -> Option<String> {
    match session.history.last()? {
        Event::FallbackExhausted { test, original } => Some(format!(
            "alternative {} for {} failed too",
            test.as_str(),
            original.as_str()
        )),
        Event::NoAlternative { test } => {
            Some(format!("no automated alternative for {}", test.as_str()))
        }
        _ => None,
    }
}

/// Render explanatory content
pub fn render_content_text(view: &ContentView) -> String {
    let mut output = String::new();
    output.push_str(&format!("{} ({})\n", view.name, view.test.as_str()));
    if let Some(test_type) = &view.test_type {
        output.push_str(&format!("Type: {}\n", test_type));
    }
    output.push_str(&format!("\nExplanation:\n{}\n", view.explanation));
    output.push_str(&format!("\nRequirements:\n{}\n", view.requirements));
    output.push_str(&format!("\nExample:\n{}\n", view.example));
    if let Some(video) = &view.video {
        output.push_str(&format!("\nVideo: {}\n", video));
    }
    output
}

/// Render resolved configuration
pub fn render_config_text(config: &ResolvedConfig) -> String {
    let mut output = String::new();
    match &config.config_path {
        Some(path) => output.push_str(&format!("Config file: {}\n", path.display())),
        None => output.push_str("Config file: (none, using defaults)\n"),
    }
    output.push_str(&format!(
        "Multi recommendations: {}\n",
        match config.multi_recommendations {
            MultiRecommendationPolicy::All => "all",
            MultiRecommendationPolicy::First => "first",
        }
    ));
    output.push_str(&format!(
        "Manual selection: {}\n",
        if config.controller.allow_manual_selection {
            "allowed"
        } else {
            "disabled"
        }
    ));
    output.push_str("\nCheck thresholds:\n");
    output.push_str(&format!(
        "  Min expected count:  {}\n",
        config.thresholds.min_expected_count
    ));
    output.push_str(&format!(
        "  Min group size:      {}\n",
        config.thresholds.min_group_size
    ));
    output.push_str(&format!(
        "  Fisher total limit:  {}\n",
        config.thresholds.fisher_total_limit
    ));

    let standard = TestCatalog::standard();
    let overridden: Vec<_> = config
        .catalog
        .entries()
        .iter()
        .filter(|e| standard.alternative(e.id) != e.alternative)
        .collect();
    if !overridden.is_empty() {
        output.push_str("\nAlternative overrides:\n");
        for entry in overridden {
            output.push_str(&format!(
                "  {} -> {}\n",
                entry.id.as_str(),
                fallback_label(entry.alternative)
            ));
        }
    }

    output
}

fn fallback_label(fallback: Fallback) -> &'static str {
    match fallback {
        Fallback::Alternative(test) => test.as_str(),
        Fallback::NoAlternativeDefined => "-",
    }
}
