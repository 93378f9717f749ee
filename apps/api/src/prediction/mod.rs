// Shortlist prediction: validation, request tracking, candidate strength,
// job matching, calibration and the engine that orchestrates them.
// The engine never surfaces an error; failures become fallback predictions.

pub mod calibration;
pub mod engine;
pub mod handlers;
pub mod job_match;
pub mod skills;
pub mod strength;
pub mod tracker;
pub mod validation;
pub mod what_if;
