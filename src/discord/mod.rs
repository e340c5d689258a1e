pub mod audit;
pub mod client;
pub mod interactions;
pub mod messages;
pub mod verify;
