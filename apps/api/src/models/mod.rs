pub mod candidate;
pub mod job;
pub mod prediction;
