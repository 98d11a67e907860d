pub mod campaigns;
pub mod config;
pub mod credentials;
pub mod cycles;
pub mod health;
pub mod items;
