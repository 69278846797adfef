pub mod health;
pub mod music;
