use crate::quiz::ParticipantId;
use alloc::string::String;
use serde::Serialize;

/// Number of answers a participant has on record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub participant: ParticipantId,
    pub name: String,
    pub surname: Option<String>,
    pub answers: u64,
}

/// Orders standings by answer count, highest first. The sort is stable, so ties keep the order
/// in which the participants were given (registration order, as provided by the store).
pub fn rank(standings: &mut [Standing]) {
    standings.sort_by(|a, b| b.answers.cmp(&a.answers));
}
