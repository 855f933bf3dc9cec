//! Selection state machine
//!
//! Drives one interaction cycle: input, recommendation, selection,
//! assumption check, and at most one fallback substitution.
//!
//! States:
//! - AwaitingInput: the last input produced no recommendation
//! - Recommended: tests are on offer (from the table, or the full catalog in
//!   manual mode)
//! - AwaitingAssumptionCheck: a test is chosen and its verdict is due
//! - Blocked: the last verdict was Pending
//! - Resolved: the chosen test's assumptions are met
//!
//! Global invariants enforced:
//! - A Pending verdict never triggers a fallback
//! - At most one substitution per selection
//! - Every transition of the current cycle is recorded in the history;
//!   submit_input and reset start a fresh history

use crate::assumptions::{AssumptionVerdict, CheckReport, CheckerRegistry, Selections};
use crate::catalog::{Fallback, TestCatalog, TestId};
use crate::config::ResolvedConfig;
use crate::dataset::Dataset;
use crate::decision::DecisionEngine;
use crate::error::ControllerError;
use crate::fallback::FallbackResolver;
use crate::input::{Field, InputSpec};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Where the offered tests came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Output of the decision table
    Recommendation,
    /// The full catalog, offered after fallback could not help
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SelectionState {
    AwaitingInput {
        pending_fields: Vec<Field>,
    },
    Recommended {
        tests: Vec<TestId>,
        mode: SelectionMode,
    },
    AwaitingAssumptionCheck {
        test: TestId,
        #[serde(skip_serializing_if = "Option::is_none")]
        substituted_from: Option<TestId>,
    },
    Blocked {
        test: TestId,
        #[serde(skip_serializing_if = "Option::is_none")]
        substituted_from: Option<TestId>,
    },
    Resolved {
        test: TestId,
    },
}

impl SelectionState {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionState::AwaitingInput { .. } => "awaiting-input",
            SelectionState::Recommended { .. } => "recommended",
            SelectionState::AwaitingAssumptionCheck { .. } => "awaiting-assumption-check",
            SelectionState::Blocked { .. } => "blocked",
            SelectionState::Resolved { .. } => "resolved",
        }
    }

    /// Test whose assumptions are being or have been checked
    pub fn current_test(&self) -> Option<TestId> {
        match self {
            SelectionState::AwaitingAssumptionCheck { test, .. }
            | SelectionState::Blocked { test, .. }
            | SelectionState::Resolved { test } => Some(*test),
            SelectionState::AwaitingInput { .. } | SelectionState::Recommended { .. } => None,
        }
    }
}

/// Recorded transition cause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    InputSubmitted {
        recommended: Vec<TestId>,
    },
    Selected {
        test: TestId,
        manual: bool,
    },
    Verdict {
        test: TestId,
        verdict: AssumptionVerdict,
    },
    Substituted {
        from: TestId,
        to: TestId,
    },
    NoAlternative {
        test: TestId,
    },
    /// The substituted test failed too
    FallbackExhausted {
        test: TestId,
        original: TestId,
    },
    Reset,
}

/// Controller behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerPolicy {
    /// Permit choosing any catalog test, and offer the catalog when fallback fails
    pub allow_manual_selection: bool,
}

impl Default for ControllerPolicy {
    fn default() -> Self {
        ControllerPolicy {
            allow_manual_selection: true,
        }
    }
}

/// Orchestrates one selection cycle at a time
#[derive(Debug, Clone)]
pub struct SelectionController {
    engine: DecisionEngine,
    catalog: TestCatalog,
    policy: ControllerPolicy,
    state: SelectionState,
    input: Option<InputSpec>,
    history: Vec<Event>,
}

impl SelectionController {
    pub fn new(engine: DecisionEngine, catalog: TestCatalog, policy: ControllerPolicy) -> Self {
        SelectionController {
            engine,
            catalog,
            policy,
            state: initial_state(),
            input: None,
            history: Vec::new(),
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            DecisionEngine::new(config.multi_recommendations),
            config.catalog.clone(),
            config.controller,
        )
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn history(&self) -> &[Event] {
        &self.history
    }

    /// InputSpec of the current cycle
    pub fn input(&self) -> Option<&InputSpec> {
        self.input.as_ref()
    }

    pub fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }

    /// Start a new cycle from any state
    pub fn submit_input(&mut self, spec: InputSpec) -> &SelectionState {
        for issue in spec.validate() {
            warn!(%issue, "input issue");
        }

        let recommendation = self.engine.recommend(&spec);
        self.input = Some(spec);
        self.history.clear();
        let event = Event::InputSubmitted {
            recommended: recommendation.tests.clone(),
        };
        let next = if recommendation.is_empty() {
            SelectionState::AwaitingInput {
                pending_fields: recommendation.pending_fields,
            }
        } else {
            SelectionState::Recommended {
                tests: recommendation.tests,
                mode: SelectionMode::Recommendation,
            }
        };
        self.transition(next, event)
    }

    /// Choose one of the offered tests
    pub fn select(&mut self, test: TestId) -> Result<&SelectionState, ControllerError> {
        let SelectionState::Recommended { tests, mode } = &self.state else {
            return Err(self.invalid("select a test"));
        };
        if !tests.contains(&test) {
            return Err(ControllerError::NotRecommended(test));
        }
        let manual = *mode == SelectionMode::Manual;
        let next = SelectionState::AwaitingAssumptionCheck {
            test,
            substituted_from: None,
        };
        Ok(self.transition(next, Event::Selected { test, manual }))
    }

    /// Choose any catalog test, bypassing the recommendation
    pub fn select_manual(&mut self, test: TestId) -> Result<&SelectionState, ControllerError> {
        if !self.policy.allow_manual_selection {
            return Err(ControllerError::ManualSelectionDisabled);
        }
        if !matches!(
            self.state,
            SelectionState::AwaitingInput { .. } | SelectionState::Recommended { .. }
        ) {
            return Err(self.invalid("select a test manually"));
        }
        let next = SelectionState::AwaitingAssumptionCheck {
            test,
            substituted_from: None,
        };
        Ok(self.transition(next, Event::Selected { test, manual: true }))
    }

    /// Feed a verdict for the current test
    pub fn apply_verdict(
        &mut self,
        verdict: AssumptionVerdict,
    ) -> Result<&SelectionState, ControllerError> {
        let (test, substituted_from) = match self.state {
            SelectionState::AwaitingAssumptionCheck {
                test,
                substituted_from,
            }
            | SelectionState::Blocked {
                test,
                substituted_from,
            } => (test, substituted_from),
            _ => return Err(self.invalid("apply a verdict")),
        };
        self.history.push(Event::Verdict { test, verdict });

        let (next, event) = match verdict {
            AssumptionVerdict::Met => {
                let next = SelectionState::Resolved { test };
                return Ok(self.transition_silent(next));
            }
            AssumptionVerdict::Pending => {
                let next = SelectionState::Blocked {
                    test,
                    substituted_from,
                };
                return Ok(self.transition_silent(next));
            }
            AssumptionVerdict::NotMet => match substituted_from {
                Some(original) => {
                    let event = Event::FallbackExhausted { test, original };
                    (self.after_failed_fallback(), event)
                }
                None => match FallbackResolver::new(&self.catalog).resolve(test) {
                    Fallback::Alternative(alternative) => (
                        SelectionState::AwaitingAssumptionCheck {
                            test: alternative,
                            substituted_from: Some(test),
                        },
                        Event::Substituted {
                            from: test,
                            to: alternative,
                        },
                    ),
                    Fallback::NoAlternativeDefined => {
                        (self.after_failed_fallback(), Event::NoAlternative { test })
                    }
                },
            },
        };
        Ok(self.transition(next, event))
    }

    /// Run the registered checker for the current test and apply its verdict
    pub fn run_check(
        &mut self,
        registry: &CheckerRegistry,
        dataset: &Dataset,
        selections: &Selections,
    ) -> Result<CheckReport, ControllerError> {
        let test = match self.state {
            SelectionState::AwaitingAssumptionCheck { test, .. }
            | SelectionState::Blocked { test, .. } => test,
            _ => return Err(self.invalid("run an assumption check")),
        };
        let report = registry.check(test, dataset, selections);
        self.apply_verdict(report.verdict)?;
        Ok(report)
    }

    /// Drop the current cycle
    pub fn reset(&mut self) -> &SelectionState {
        self.input = None;
        self.history.clear();
        self.transition(initial_state(), Event::Reset)
    }

    fn after_failed_fallback(&self) -> SelectionState {
        if self.policy.allow_manual_selection {
            SelectionState::Recommended {
                tests: self.catalog.ids(),
                mode: SelectionMode::Manual,
            }
        } else {
            SelectionState::AwaitingInput {
                pending_fields: Vec::new(),
            }
        }
    }

    fn invalid(&self, action: &'static str) -> ControllerError {
        ControllerError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }

    fn transition(&mut self, next: SelectionState, event: Event) -> &SelectionState {
        self.history.push(event);
        self.transition_silent(next)
    }

    fn transition_silent(&mut self, next: SelectionState) -> &SelectionState {
        info!(
            from = self.state.name(),
            to = next.name(),
            test = ?next.current_test(),
            "selection state changed"
        );
        self.state = next;
        &self.state
    }
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(
            DecisionEngine::default(),
            TestCatalog::standard(),
            ControllerPolicy::default(),
        )
    }
}

fn initial_state() -> SelectionState {
    SelectionState::AwaitingInput {
        pending_fields: vec![Field::HypothesisType],
    }
}
