mod competition;
mod entry;
mod participant;
mod score;
mod setup;
#[cfg(test)]
pub mod test_fixtures;
mod token;
mod user;

pub use competition::{Competition, CompetitionId, CompetitionStatus};
pub use entry::{Entry, EntryId, FullEntry};
pub use participant::{Participant, ParticipantId};
pub use token::TokenStatus;
pub use user::{User, UserId};
