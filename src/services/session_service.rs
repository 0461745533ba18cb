use crate::{
    dto::session::{ModeSummary, SessionSummary},
    error::ServiceError,
    state::SharedState,
};

/// Modes players can pick when opening a room.
pub fn list_modes(state: &SharedState) -> Vec<ModeSummary> {
    let config = state.config();
    config
        .modes()
        .map(|mode| ModeSummary {
            is_default: mode.id == config.default_mode(),
            ..ModeSummary::from(mode.as_ref())
        })
        .collect()
}

/// Summaries of every live session, sorted by room code.
pub fn list_sessions(state: &SharedState) -> Vec<SessionSummary> {
    let mut summaries: Vec<_> = state
        .sessions()
        .into_iter()
        .map(|(_, handle)| SessionSummary::from(&handle.snapshot()))
        .collect();
    summaries.sort_by(|a, b| a.room.cmp(&b.room));
    summaries
}

/// Summary of the session running in `room`.
pub fn session_summary(state: &SharedState, room: &str) -> Result<SessionSummary, ServiceError> {
    let handle = state
        .session(room)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{room}` not found")))?;
    Ok(SessionSummary::from(&handle.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[test]
    fn lists_builtin_modes() {
        let state = AppState::new(AppConfig::default());
        let modes = list_modes(&state);
        let ids: Vec<_> = modes.iter().map(|mode| mode.id.as_str()).collect();
        assert_eq!(ids, ["countries", "us-states"]);
        assert!(modes.iter().all(|mode| mode.entities > 0));
        let defaults: Vec<_> = modes
            .iter()
            .filter(|mode| mode.is_default)
            .map(|mode| mode.id.as_str())
            .collect();
        assert_eq!(defaults, ["countries"]);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let state = AppState::new(AppConfig::default());
        assert!(list_sessions(&state).is_empty());
        assert!(matches!(
            session_summary(&state, "nowhere"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
