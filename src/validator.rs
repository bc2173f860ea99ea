//! Formula finalization: name checks, structural checks and the external
//! syntax-check collaborator.
//!
//! The syntax check is an injected capability behind [`SyntaxChecker`]; the
//! backend contract (JSON request/response and endpoint path) is documented
//! by the wire types so any transport implementation can plug in. The save
//! flow is two-phase — [`Finalizer::prepare`] captures a snapshot of the
//! expression and [`Finalizer::resolve`] applies the verdict — so a verdict
//! that arrives after the user kept editing is detected and discarded as
//! stale instead of finalizing the wrong text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::ExpressionBuilder;
use crate::config::FieldCatalog;
use crate::formula::{CustomDataSet, NamedFormula};

/// Backend endpoint performing the formula syntax check.
pub const TESTFORMULA_ENDPOINT: &str = "/visuanalytics/testformula";

/// Request body for the syntax-check endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFormulaRequest {
    pub formula: String,
}

/// Response body of the syntax-check endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFormulaResponse {
    pub accepted: bool,
}

/// Transport failure while talking to the syntax backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax backend unavailable: {0}")]
pub struct BackendError(pub String);

/// The external syntax-check collaborator. Implementations decide the
/// transport; `Ok(true)` means the backend accepted the formula.
pub trait SyntaxChecker {
    fn check(&self, formula: &str) -> Result<bool, BackendError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// A local check failed; nothing was submitted to the backend.
    #[error("validation error: {0}")]
    Validation(String),
    /// Transport failure; the expression is preserved so the user can retry.
    #[error("syntax backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The backend rejected the formula; the expression is preserved.
    #[error("formula rejected by syntax check")]
    Rejected,
    /// A previous save has not been resolved or abandoned yet.
    #[error("another save is already in flight")]
    SaveInFlight,
}

/// A prepared save: the name plus the exact expression snapshot that will be
/// (or was) submitted for the syntax check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    name: String,
    formula: String,
}

impl SaveRequest {
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// The request body to POST to [`TESTFORMULA_ENDPOINT`].
    pub fn to_wire(&self) -> TestFormulaRequest {
        TestFormulaRequest {
            formula: self.formula.clone(),
        }
    }
}

/// Result of resolving a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Accepted; the formula was appended and the builder reset.
    Saved(NamedFormula),
    /// The backend said no; nothing changed.
    Rejected,
    /// The expression changed between prepare and resolve; verdict discarded,
    /// nothing changed.
    Stale,
}

/// Drives formula finalization and guards against duplicate in-flight saves.
#[derive(Debug, Default)]
pub struct Finalizer {
    in_flight: bool,
}

impl Finalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Runs every local check and captures the expression snapshot. On
    /// success the finalizer is marked in-flight until the request is
    /// resolved or abandoned.
    pub fn prepare(
        &mut self,
        name: &str,
        builder: &ExpressionBuilder,
        set: &CustomDataSet,
        catalog: &FieldCatalog,
    ) -> Result<SaveRequest, SaveError> {
        if self.in_flight {
            return Err(SaveError::SaveInFlight);
        }
        let name = name.trim();
        if name.is_empty() || builder.is_empty() {
            return Err(SaveError::Validation(
                "empty name or empty expression".to_string(),
            ));
        }
        if catalog.contains(name) {
            return Err(SaveError::Validation(format!(
                "name collision with data field '{}'",
                name
            )));
        }
        if set.contains_formula(name) {
            return Err(SaveError::Validation(format!(
                "name collision with formula '{}'",
                name
            )));
        }
        if !builder.is_balanced() {
            return Err(SaveError::Validation(
                "parentheses are not balanced".to_string(),
            ));
        }
        if !builder.can_save() {
            return Err(SaveError::Validation(
                "expression ends on an operator".to_string(),
            ));
        }

        self.in_flight = true;
        Ok(SaveRequest {
            name: name.to_string(),
            formula: builder.render(),
        })
    }

    /// Applies a backend verdict to whatever state exists now. A verdict for
    /// an expression that has been edited in the meantime is discarded.
    pub fn resolve(
        &mut self,
        request: SaveRequest,
        accepted: bool,
        builder: &mut ExpressionBuilder,
        set: &mut CustomDataSet,
    ) -> SaveOutcome {
        self.in_flight = false;

        if request.formula != builder.render() {
            tracing::info!(name = %request.name, "discarding stale syntax verdict");
            return SaveOutcome::Stale;
        }
        if !accepted {
            tracing::info!(name = %request.name, formula = %request.formula, "formula rejected");
            return SaveOutcome::Rejected;
        }

        let formula = NamedFormula::new(request.name, request.formula);
        tracing::info!(name = %formula.name, formula = %formula.expression_text, "formula saved");
        set.push_formula(formula.clone());
        builder.clear();
        SaveOutcome::Saved(formula)
    }

    /// Drops an in-flight request without applying a verdict, e.g. after a
    /// transport failure. The expression is left untouched.
    pub fn abandon(&mut self) {
        self.in_flight = false;
    }

    /// Convenience driver for a synchronous checker: prepare, submit,
    /// resolve. A stale outcome cannot occur on this path.
    pub fn save_with(
        &mut self,
        checker: &dyn SyntaxChecker,
        name: &str,
        builder: &mut ExpressionBuilder,
        set: &mut CustomDataSet,
        catalog: &FieldCatalog,
    ) -> Result<NamedFormula, SaveError> {
        let request = self.prepare(name, builder, set, catalog)?;
        let accepted = match checker.check(request.formula()) {
            Ok(accepted) => accepted,
            Err(BackendError(message)) => {
                self.abandon();
                return Err(SaveError::BackendUnavailable(message));
            }
        };
        match self.resolve(request, accepted, builder, set) {
            SaveOutcome::Saved(formula) => Ok(formula),
            SaveOutcome::Rejected => Err(SaveError::Rejected),
            SaveOutcome::Stale => unreachable!("builder cannot change during a synchronous save"),
        }
    }
}

/// Local syntax check over the rendered formula string: paren balance plus a
/// value/operator alternation scan. Used by the REPL and tests; a remote
/// checker replaces it wherever the real backend is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleChecker;

impl RuleChecker {
    fn accepts(formula: &str) -> bool {
        let mut depth: u32 = 0;
        // A value (field name or number) or an opening paren is expected
        // next; false means an operator or a closing paren is expected.
        let mut expect_value = true;
        let mut chars = formula.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '(' if expect_value => depth += 1,
                ')' if !expect_value && depth > 0 => depth -= 1,
                '+' | '-' | '*' | '/' | '%' if !expect_value => expect_value = true,
                c if expect_value && (c.is_alphanumeric() || c == '_' || c == '.') => {
                    while matches!(chars.peek(), Some(p) if p.is_alphanumeric() || *p == '_' || *p == '.')
                    {
                        chars.next();
                    }
                    expect_value = false;
                }
                _ => return false,
            }
        }

        depth == 0 && !expect_value
    }
}

impl SyntaxChecker for RuleChecker {
    fn check(&self, formula: &str) -> Result<bool, BackendError> {
        Ok(Self::accepts(formula))
    }
}
