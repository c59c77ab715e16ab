pub mod health;
pub mod wizard;
