pub mod dtr;
pub mod nap_report;
pub mod role;
pub mod team_status;
pub mod user;
