pub mod delivery_dates;
pub mod health;
pub mod kitchen;
pub mod metrics;
pub mod orders;
