pub mod assets;
pub mod health;
pub mod offers;
pub mod reports;
pub mod visits;
