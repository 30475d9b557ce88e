pub mod audit;
pub mod failure;
pub mod record;
pub mod report;
pub mod snapshot;
pub mod user;
