use crate::CoreError;
use berth_store::SubsystemState;

/// `NotCreated -> Stopped <-> Running -> Removed`. Starting a running
/// subsystem or stopping a stopped one is allowed; `Removed` is terminal.
pub fn validate_transition(from: SubsystemState, to: SubsystemState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (SubsystemState::NotCreated, SubsystemState::Stopped)
            | (
                SubsystemState::Stopped | SubsystemState::Running,
                SubsystemState::Stopped | SubsystemState::Running
            )
            | (
                SubsystemState::NotCreated | SubsystemState::Stopped | SubsystemState::Running,
                SubsystemState::Removed
            )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use SubsystemState as S;
        assert!(validate_transition(S::NotCreated, S::Stopped).is_ok());
        assert!(validate_transition(S::Stopped, S::Running).is_ok());
        assert!(validate_transition(S::Running, S::Stopped).is_ok());
        assert!(validate_transition(S::Running, S::Running).is_ok());
        assert!(validate_transition(S::Stopped, S::Stopped).is_ok());
        assert!(validate_transition(S::Stopped, S::Removed).is_ok());
        assert!(validate_transition(S::Running, S::Removed).is_ok());
        assert!(validate_transition(S::NotCreated, S::Removed).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        use SubsystemState as S;
        assert!(validate_transition(S::NotCreated, S::Running).is_err());
        assert!(validate_transition(S::Stopped, S::NotCreated).is_err());
        assert!(validate_transition(S::Removed, S::Stopped).is_err());
        assert!(validate_transition(S::Removed, S::Running).is_err());
        assert!(validate_transition(S::Removed, S::Removed).is_err());
        assert!(validate_transition(S::Running, S::NotCreated).is_err());
    }

    #[test]
    fn error_names_both_states() {
        let err = validate_transition(SubsystemState::Removed, SubsystemState::Running)
            .unwrap_err()
            .to_string();
        assert!(err.contains("removed"));
        assert!(err.contains("running"));
    }
}
