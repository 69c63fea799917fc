//! One user's form: the values being edited and where the last submission
//! stands.
//!
//! Submissions run synchronously inside [`FormSession::submit`], so
//! `Submitted` and `Computing` are only ever observed through the transition
//! log or [`FormSession::history`]. Taking `&mut self` is what rules out two
//! submissions in flight for the same session.
//!
//! `Displayed` and `Failed` always go back to `Idle` before anything else
//! happens: editing or resubmitting from a terminal state records `Idle`
//! first, then `Collecting` or `Submitted`.

use std::collections::VecDeque;

use log::debug;

use crate::classifier::{PredictionError, RiskModel};
use crate::features::FormInputs;
use crate::handler::{InferenceHandler, PredictionResult};

const HISTORY_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    /// Inputs are being edited.
    Collecting,
    /// The submit trigger fired.
    Submitted,
    /// Vector assembled, model call in flight.
    Computing,
    Displayed(PredictionResult),
    /// The submission failed; holds the message shown instead of a result.
    Failed(String),
}

impl SubmissionState {
    /// `Displayed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Displayed(_) | Self::Failed(_))
    }
}

pub struct FormSession<M: RiskModel> {
    handler: InferenceHandler<M>,
    inputs: FormInputs,
    state: SubmissionState,
    history: VecDeque<SubmissionState>,
}

impl<M: RiskModel> FormSession<M> {
    /// A fresh session with the form defaults filled in.
    pub fn new(handler: InferenceHandler<M>) -> Self {
        Self {
            handler,
            inputs: FormInputs::default(),
            state: SubmissionState::Idle,
            history: VecDeque::from([SubmissionState::Idle]),
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn inputs(&self) -> &FormInputs {
        &self.inputs
    }

    /// The most recent states, oldest first, ending with the current one.
    pub fn history(&self) -> impl Iterator<Item = &SubmissionState> {
        self.history.iter()
    }

    /// Changes form values. Any previous result or failure is cleared.
    pub fn edit(&mut self, change: impl FnOnce(&mut FormInputs)) {
        change(&mut self.inputs);
        self.transition(SubmissionState::Collecting);
    }

    /// Replaces all form values at once.
    pub fn fill(&mut self, inputs: FormInputs) {
        self.edit(|current| *current = inputs);
    }

    /// Runs the current inputs through the handler and settles in
    /// `Displayed` or `Failed`. Out-of-range inputs fail the submission
    /// without reaching the model.
    pub fn submit(&mut self) -> Result<PredictionResult, PredictionError> {
        self.transition(SubmissionState::Submitted);

        let outcome = match self.inputs.validate() {
            Ok(()) => {
                self.transition(SubmissionState::Computing);
                self.handler.handle(&self.inputs)
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(result) => self.transition(SubmissionState::Displayed(*result)),
            Err(e) => self.transition(SubmissionState::Failed(format!(
                "The prediction could not be computed: {}",
                e
            ))),
        }
        outcome
    }

    /// Dismisses the current result or failure.
    pub fn reset(&mut self) {
        self.transition(SubmissionState::Idle);
    }

    fn transition(&mut self, next: SubmissionState) {
        if self.state.is_terminal() && next != SubmissionState::Idle {
            self.enter(SubmissionState::Idle);
        }
        self.enter(next);
    }

    fn enter(&mut self, next: SubmissionState) {
        debug!("Submission state {:?} -> {:?}", self.state, next);
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(next.clone());
        self.state = next;
    }
}
