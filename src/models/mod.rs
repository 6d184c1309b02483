pub mod location;
pub mod package;
pub mod user;
