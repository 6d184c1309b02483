pub mod accounts;
pub mod delivery;
pub mod packages;
pub mod photos;
