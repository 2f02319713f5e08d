pub mod delivery;
pub mod orders;
pub mod payments;
pub mod settlement;
pub mod users;
pub mod wallet;
