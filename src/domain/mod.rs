pub mod coins;
pub mod models;
pub mod money;
pub mod period;
pub mod summary;
