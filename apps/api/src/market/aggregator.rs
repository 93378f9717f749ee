//! Market statistics over the job corpus.
//!
//! A pure function of its input: every call is a full recompute, grouped by
//! normalized role category. `aggregate_at` takes the clock explicitly.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::categories::categorize;
use crate::models::job::JobPosting;

const RECENT_WINDOW_DAYS: f64 = 7.0;
const OLDER_WINDOW_DAYS: f64 = 14.0;
const MAX_SAMPLE_COMPANIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandTrend {
    Rising,
    Stable,
    Falling,
}

impl DemandTrend {
    fn bonus(self) -> f64 {
        match self {
            DemandTrend::Rising => 0.10,
            DemandTrend::Stable => 0.0,
            DemandTrend::Falling => -0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStat {
    pub role_category: String,
    pub total_active_jobs: usize,
    pub average_applicants_per_job: f64,
    pub demand_trend: DemandTrend,
    /// 0.0 – 1.0
    pub market_demand_score: f64,
    /// 0.0 – 1.0
    pub competition_score: f64,
    pub sample_companies: Vec<String>,
}

pub fn aggregate(jobs: &[JobPosting]) -> Vec<MarketStat> {
    aggregate_at(jobs, Utc::now())
}

pub fn aggregate_at(jobs: &[JobPosting], now: DateTime<Utc>) -> Vec<MarketStat> {
    let mut groups: BTreeMap<&'static str, Vec<&JobPosting>> = BTreeMap::new();
    for job in jobs {
        groups.entry(categorize(&job.title)).or_default().push(job);
    }

    let mut stats: Vec<MarketStat> = groups
        .into_iter()
        .map(|(category, group)| category_stat(category, &group, now))
        .collect();

    stats.sort_by(|a, b| {
        b.total_active_jobs
            .cmp(&a.total_active_jobs)
            .then_with(|| a.role_category.cmp(&b.role_category))
    });
    stats
}

fn category_stat(category: &str, jobs: &[&JobPosting], now: DateTime<Utc>) -> MarketStat {
    let count = jobs.len();
    let count_f = count as f64;

    let average_applicants =
        jobs.iter().map(|j| j.applicants.unwrap_or(0) as f64).sum::<f64>() / count_f;

    // Postings dated in the future count as brand new
    let ages: Vec<f64> = jobs
        .iter()
        .map(|j| ((now - j.posted_at).num_seconds() as f64 / 86_400.0).max(0.0))
        .collect();
    let recent = ages.iter().filter(|&&d| d < RECENT_WINDOW_DAYS).count();
    let older = ages
        .iter()
        .filter(|&&d| (RECENT_WINDOW_DAYS..OLDER_WINDOW_DAYS).contains(&d))
        .count();
    let demand_trend = trend(recent, older);

    let average_age_days = ages.iter().sum::<f64>() / count_f;
    let volume = (count_f / 50.0).min(1.0);
    let recency = 1.0 - (average_age_days / 45.0).min(1.0);
    let market_demand_score =
        (0.2 + 0.45 * volume + 0.35 * recency + demand_trend.bonus()).clamp(0.0, 1.0);

    let competition_score =
        (0.7 * (average_applicants / 400.0).min(1.0) + 0.3 * (count_f / 80.0).min(1.0))
            .clamp(0.0, 1.0);

    MarketStat {
        role_category: category.to_string(),
        total_active_jobs: count,
        average_applicants_per_job: average_applicants,
        demand_trend,
        market_demand_score,
        competition_score,
        sample_companies: sample_companies(jobs),
    }
}

fn trend(recent: usize, older: usize) -> DemandTrend {
    if older == 0 {
        return if recent > 0 {
            DemandTrend::Rising
        } else {
            DemandTrend::Stable
        };
    }

    let ratio = recent as f64 / older as f64;
    if ratio >= 1.15 {
        DemandTrend::Rising
    } else if ratio <= 0.85 {
        DemandTrend::Falling
    } else {
        DemandTrend::Stable
    }
}

fn sample_companies(jobs: &[&JobPosting]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for company in jobs.iter().filter_map(|j| j.company.as_deref()) {
        let company = company.trim();
        if !company.is_empty() {
            *counts.entry(company).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_SAMPLE_COMPANIES)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::job_posted;
    use chrono::Duration;

    fn with_company(mut job: JobPosting, company: &str) -> JobPosting {
        job.company = Some(company.to_string());
        job
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_recent_burst_is_rising() {
        let now = Utc::now();
        let mut jobs: Vec<JobPosting> = (0..10)
            .map(|i| job_posted("Data Analyst", now - Duration::minutes(i), Some(50)))
            .collect();
        jobs.push(job_posted("Data Analyst", now - Duration::days(10), Some(50)));
        jobs.push(job_posted(
            "Data Analyst",
            now - Duration::days(10) - Duration::hours(1),
            Some(50),
        ));

        let stats = aggregate_at(&jobs, now);
        assert_eq!(stats.len(), 1);
        let stat = &stats[0];
        assert_eq!(stat.role_category, "Data Analyst");
        assert_eq!(stat.total_active_jobs, 12);
        assert_eq!(stat.demand_trend, DemandTrend::Rising);
        assert!((stat.average_applicants_per_job - 50.0).abs() < 1e-9);
        // 0.2 + 0.45·0.24 + 0.35·(1 − avg_age/45) + 0.1 with avg_age ≈ 1.67 days
        assert!(stat.market_demand_score > 0.7 && stat.market_demand_score < 0.8);
    }

    #[test]
    fn test_trend_rules() {
        assert_eq!(trend(0, 0), DemandTrend::Stable);
        assert_eq!(trend(3, 0), DemandTrend::Rising);
        assert_eq!(trend(2, 4), DemandTrend::Falling);
        assert_eq!(trend(10, 10), DemandTrend::Stable);
        assert_eq!(trend(23, 20), DemandTrend::Rising);
        assert_eq!(trend(17, 20), DemandTrend::Falling);
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        let now = Utc::now();
        let mut jobs = Vec::new();
        for i in 0..200 {
            jobs.push(job_posted("Backend Developer", now - Duration::hours(i), Some(5_000)));
        }
        for i in 0..3 {
            jobs.push(job_posted("QA Engineer", now - Duration::days(300 + i), None));
        }
        jobs.push(job_posted("Product Manager", now + Duration::days(3), Some(0)));

        for stat in aggregate_at(&jobs, now) {
            assert!((0.0..=1.0).contains(&stat.market_demand_score), "{stat:?}");
            assert!((0.0..=1.0).contains(&stat.competition_score), "{stat:?}");
            assert!(stat.average_applicants_per_job >= 0.0);
        }
    }

    #[test]
    fn test_missing_applicants_count_as_zero() {
        let now = Utc::now();
        let jobs = vec![
            job_posted("Data Scientist", now, Some(100)),
            job_posted("Data Scientist", now - Duration::hours(1), None),
        ];
        let stats = aggregate_at(&jobs, now);
        assert!((stats[0].average_applicants_per_job - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_output_sorted_by_volume_then_name() {
        let now = Utc::now();
        let jobs = vec![
            job_posted("QA Engineer", now, None),
            job_posted("Data Analyst", now - Duration::hours(1), None),
            job_posted("Frontend Developer", now - Duration::hours(2), None),
            job_posted("Frontend Developer", now - Duration::hours(3), None),
        ];
        let names: Vec<String> = aggregate_at(&jobs, now)
            .into_iter()
            .map(|s| s.role_category)
            .collect();
        assert_eq!(names, vec!["Frontend Developer", "Data Analyst", "QA Engineer"]);
    }

    #[test]
    fn test_sample_companies_most_frequent_first() {
        let now = Utc::now();
        let mut jobs = Vec::new();
        for (i, company) in ["Zeta", "Acme", "Acme", "Beta", "Gamma", "Delta", "Eps", "Acme", "Zeta"]
            .iter()
            .enumerate()
        {
            jobs.push(with_company(
                job_posted("Backend Developer", now - Duration::minutes(i as i64), None),
                company,
            ));
        }
        let stats = aggregate_at(&jobs, now);
        let companies = &stats[0].sample_companies;
        assert_eq!(companies.len(), 5);
        assert_eq!(companies[0], "Acme");
        assert_eq!(companies[1], "Zeta");
    }
}
