pub mod jwt;
pub mod calendar;
