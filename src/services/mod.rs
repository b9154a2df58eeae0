pub mod ai;
pub mod booking;
pub mod conversation;
pub mod dates;
pub mod documents;
pub mod hybrid;
pub mod web;
