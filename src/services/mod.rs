pub mod ai;
pub mod booking;
pub mod conversation;
pub mod dialogue;
pub mod ledger;
pub mod sessions;
