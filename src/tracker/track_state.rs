use serde::Serialize;

/// Track lifecycle state.
///
/// Transitions only move forward along
/// `Tentative -> Confirmed -> {Lost -> Terminated | Terminated}`, with the single
/// exception of `Lost -> Confirmed` when a lost track is re-acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TrackState {
    /// Newly created track, not yet confirmed
    #[default]
    Tentative,
    /// Actively tracked object
    Confirmed,
    /// Temporarily lost track, still re-acquirable
    Lost,
    /// Finished; the trajectory is frozen
    Terminated,
}

impl TrackState {
    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition_to(self, next: TrackState) -> bool {
        use TrackState::*;
        matches!(
            (self, next),
            (Tentative, Confirmed)
                | (Confirmed, Lost)
                | (Confirmed, Terminated)
                | (Lost, Confirmed)
                | (Lost, Terminated)
        )
    }

    pub fn is_live(self) -> bool {
        self != TrackState::Terminated
    }
}
