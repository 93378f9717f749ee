/// Catch-all category for titles no rule recognises.
pub const DEFAULT_CATEGORY: &str = "Software Engineer";

/// (category, keywords). Keywords are matched as whole words against the
/// normalized title; the longest matching keyword decides the category.
const RULES: &[(&str, &[&str])] = &[
    (
        "Machine Learning Engineer",
        &["machine learning", "ml engineer", "ai engineer", "deep learning", "mlops", "nlp engineer"],
    ),
    ("Data Scientist", &["data scientist", "data science", "research scientist"]),
    (
        "Data Analyst",
        &["data analyst", "business analyst", "analytics", "bi analyst", "business intelligence"],
    ),
    ("Data Engineer", &["data engineer", "etl", "big data"]),
    (
        "Frontend Developer",
        &["frontend", "front end", "react developer", "ui developer", "angular developer"],
    ),
    ("Backend Developer", &["backend", "back end", "api developer", "server side"]),
    ("Full Stack Developer", &["full stack", "fullstack", "mern", "mean stack"]),
    ("Mobile Developer", &["mobile", "android", "ios", "flutter", "react native"]),
    (
        "DevOps Engineer",
        &["devops", "site reliability", "sre", "platform engineer", "cloud engineer", "infrastructure"],
    ),
    (
        "QA Engineer",
        &["qa", "quality assurance", "test engineer", "sdet", "tester", "automation testing"],
    ),
    ("Security Engineer", &["security", "cybersecurity", "penetration tester", "soc analyst"]),
    ("Product Manager", &["product manager", "product owner"]),
    ("UI/UX Designer", &["ux", "ui/ux", "product designer", "ux designer", "ui designer"]),
];

fn normalize_title(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '/' { c } else { ' ' })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(" {collapsed} ")
}

/// Maps a free-form job title to a fixed role category.
pub fn categorize(title: &str) -> &'static str {
    let haystack = normalize_title(title);

    let mut best: Option<(&'static str, usize)> = None;
    for (category, keywords) in RULES {
        for keyword in *keywords {
            if !haystack.contains(&normalize_title(keyword)) {
                continue;
            }
            let len = keyword.chars().count();
            if best.map_or(true, |(_, best_len)| len > best_len) {
                best = Some((category, len));
            }
        }
    }

    best.map(|(category, _)| category)
        .unwrap_or(DEFAULT_CATEGORY)
}
