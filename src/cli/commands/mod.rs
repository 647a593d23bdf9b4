pub mod capabilities;
pub mod config;
pub mod generate;
pub mod health;
pub mod run;
