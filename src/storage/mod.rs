//! JSON file persistence: post history and the community store

mod community;
mod history;

pub use community::{CommunityStore, SeenUser, UserProfile};
pub use history::{PostHistory, MAX_HISTORY};
