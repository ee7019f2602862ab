mod dish;
mod vote;

pub use dish::{Dish, DishReplacement, NewDish, MAX_COUNTER};
pub use vote::{Ballot, UserVotes, VoteChange, VoteRequest, VoteTally, VoteValue};
