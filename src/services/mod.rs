pub mod access;
pub mod cash;
pub mod employees;
pub mod errors;
pub mod movements;
pub mod payments;
pub mod registers;
pub mod reports;
pub mod units;
