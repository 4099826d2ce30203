pub mod extraction;
pub mod user;
