pub mod canonical;
pub mod job;
