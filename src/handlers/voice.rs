//! Voice input lifecycle: recognizer start/stop and the silence timeout

use crate::state_machine::shell::ListeningState;
use crate::state_machine::{Action, ChatState, Effect, RecognitionRequest};

pub(super) fn handle(action: &Action, state: &ChatState) -> Vec<Effect> {
    let listening = state.shell.listening;
    match action {
        Action::ListeningStarting if listening == ListeningState::Starting => {
            let grammars = state
                .history
                .last_message()
                .map(|a| a.listen_for.clone())
                .unwrap_or_default();
            vec![Effect::StartRecognizing(RecognitionRequest {
                locale: state.locale().to_string(),
                grammars,
                user: state.connection.user.clone(),
            })]
        }
        Action::ListeningStart if listening == ListeningState::Started => {
            vec![Effect::ArmSilenceTimeout]
        }
        Action::UpdateInput { .. } => vec![Effect::CancelSilenceTimeout],
        Action::ListeningStopping if listening == ListeningState::Stopping => {
            vec![Effect::CancelSilenceTimeout, Effect::StopRecognizing]
        }
        Action::CardActionClicked if listening.is_active() => vec![Effect::StopRecognizing],
        _ => vec![],
    }
}
