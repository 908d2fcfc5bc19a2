pub mod dtr;
pub mod nap;
pub mod team;
pub mod users;
