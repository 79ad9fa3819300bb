pub mod review_card;
pub mod review_session;
pub mod scheduler;
pub mod scheduling_state;
pub mod word;

pub use review_card::ReviewCard;
pub use review_session::ReviewSession;
pub use scheduling_state::SchedulingState;
pub use word::{NewWord, Stats, Word, WordPage, WordUpdate};
