//! Action labels and the operator-facing trace of an invocation

use crate::domain::Result;
use std::fmt;

/// Engine step that may raise an error
///
/// The label of the failing step is written into the error audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LoadParameters,
    IsSampleReceived,
    GetSample,
    IsSkipLoteSample,
    LockBatch,
    GetWorkId,
    GetWorkSampleCount,
    IsSampleAttached,
    CreateWork,
    AttachSample,
    AdvanceWorkFlowStep,
    SendMessage,
    ChangeSampleIdentification,
    AddAnalysesGroupAnalyses,
    UnlockBatch,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::LoadParameters => "LoadParameters",
            Action::IsSampleReceived => "IsSampleReceived",
            Action::GetSample => "GetSample",
            Action::IsSkipLoteSample => "IsSkipLoteSample",
            Action::LockBatch => "LockBatch",
            Action::GetWorkId => "GetWorkId",
            Action::GetWorkSampleCount => "GetWorkSampleCount",
            Action::IsSampleAttached => "IsSampleAttached",
            Action::CreateWork => "CreateWork",
            Action::AttachSample => "AttachSample",
            Action::AdvanceWorkFlowStep => "AdvanceWorkFlowStep",
            Action::SendMessage => "SendMessage",
            Action::ChangeSampleIdentification => "ChangeSampleIdentification",
            Action::AddAnalysesGroupAnalyses => "AddAnalysesGroupAnalyses",
            Action::UnlockBatch => "UnlockBatch",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels the error of a fallible step with the action it belongs to
pub trait ActionContext<T> {
    fn in_action(self, action: Action) -> Result<T>;
}

impl<T> ActionContext<T> for Result<T> {
    fn in_action(self, action: Action) -> Result<T> {
        self.map_err(|e| e.in_action(action.as_str()))
    }
}

/// Human-readable lines describing what an invocation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTrace {
    lines: Vec<String>,
}

impl ActionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines joined the way the host event log displays them
    pub fn friendly_message(&self) -> String {
        self.lines.join("<br>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SkipLotError;

    #[test]
    fn test_friendly_message_joins_with_br() {
        let mut trace = ActionTrace::new();
        trace.push("Sample Id: 4<br>Sample type: Water");
        trace.push("Aggregate found Id: 9");
        assert_eq!(
            trace.friendly_message(),
            "Sample Id: 4<br>Sample type: Water<br>Aggregate found Id: 9"
        );
    }

    #[test]
    fn test_in_action_labels_error() {
        let result: Result<()> = Err(SkipLotError::Notification("down".to_string()));
        let err = result.in_action(Action::SendMessage).unwrap_err();
        assert_eq!(err.action(), Some("SendMessage"));
    }
}
