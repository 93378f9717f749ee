// Market statistics: role categorization and per-category demand,
// competition and trend scores over the job corpus.

pub mod aggregator;
pub mod categories;
pub mod handlers;
