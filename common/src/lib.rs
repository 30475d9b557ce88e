//! Types shared between the daybook server and its clients.

pub mod jobs;
pub mod model;
pub mod requests;
