use serde::{Deserialize, Serialize};

use crate::capabilities::EditOutcome;
use crate::config::ConfigUpdate;
use crate::encoder::SelectedFile;
use crate::model::RequestId;

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub enum Event {
    #[default]
    Noop,

    /// Endpoint settings and credential from the shell.
    Configure(ConfigUpdate),

    // --- Upload control ---
    FileSelected(SelectedFile),
    /// The shell could not read the file the user picked.
    FileReadFailed {
        name: String,
        reason: String,
    },

    // --- Instruction / submit ---
    InstructionChanged {
        text: String,
    },
    SubmitRequested,
    DismissError,

    // --- Capability responses (boxed to keep enum size small) ---
    #[serde(skip)]
    EditResponse {
        request_id: RequestId,
        result: Box<EditOutcome>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Configure(_) => "configure",
            Self::FileSelected(_) => "file_selected",
            Self::FileReadFailed { .. } => "file_read_failed",
            Self::InstructionChanged { .. } => "instruction_changed",
            Self::SubmitRequested => "submit_requested",
            Self::DismissError => "dismiss_error",
            Self::EditResponse { .. } => "edit_response",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::FileSelected(_)
                | Self::FileReadFailed { .. }
                | Self::InstructionChanged { .. }
                | Self::SubmitRequested
                | Self::DismissError
        )
    }
}
