pub mod hub;
pub mod score;
pub mod treasure;
