//! Skill name normalization and vocabulary-based extraction.
//!
//! Matching is case-insensitive and alias-aware: `k8s`, `K8S` and
//! `Kubernetes` all normalize to `kubernetes`.

use std::collections::BTreeSet;

use regex::Regex;

/// Surface forms recognised in free text. Each hit is normalized before use.
const VOCABULARY: &[&str] = &[
    // Programming languages
    "python", "javascript", "java", "c++", "c#", "ruby", "php", "go", "golang", "rust",
    "kotlin", "swift", "typescript", "scala", "perl", "r", "matlab", "sql", "html", "css",
    "xml", "json", "yaml", "groovy", "haskell", "lisp",
    // Frameworks & libraries
    "react", "reactjs", "react.js", "angular", "vue", "vue.js", "django", "flask", "fastapi",
    "express", "nodejs", "node.js", "spring", "hibernate", "dotnet", ".net", "asp.net",
    "tensorflow", "pytorch", "keras", "sklearn", "scikit-learn", "pandas", "numpy", "spark",
    "hadoop", "kafka", "rabbitmq", "graphql",
    // Databases
    "postgres", "postgresql", "mysql", "mongodb", "redis", "elasticsearch", "cassandra",
    "dynamodb", "oracle", "sql server", "firestore", "mariadb", "neo4j", "couchdb", "influxdb",
    // DevOps & cloud
    "docker", "kubernetes", "k8s", "jenkins", "gitlab", "github", "git", "aws", "azure", "gcp",
    "terraform", "ansible", "docker-compose", "ci/cd", "linux", "unix", "bash", "shell",
    "nginx", "apache",
    // Tools
    "jira", "confluence", "bitbucket", "maven", "gradle", "npm", "excel", "tableau", "power bi",
    "figma",
    // ML & AI
    "machine learning", "deep learning", "nlp", "computer vision", "reinforcement learning",
    "neural networks", "neural network", "data analysis", "statistics",
];

const ALIASES: &[(&str, &str)] = &[
    ("k8s", "kubernetes"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("golang", "go"),
    ("cpp", "c++"),
    ("c sharp", "c#"),
    ("postgres", "postgresql"),
    ("psql", "postgresql"),
    ("mongo", "mongodb"),
    ("sqlserver", "sql server"),
    ("mssql", "sql server"),
    ("node", "node.js"),
    ("nodejs", "node.js"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("vuejs", "vue"),
    ("vue.js", "vue"),
    ("dotnet", ".net"),
    ("ml", "machine learning"),
    ("dl", "deep learning"),
    ("sklearn", "scikit-learn"),
    ("scikit learn", "scikit-learn"),
    ("neural network", "neural networks"),
    ("amazon web services", "aws"),
    ("google cloud", "gcp"),
    ("google cloud platform", "gcp"),
    ("natural language processing", "nlp"),
    ("cicd", "ci/cd"),
    ("ci-cd", "ci/cd"),
    ("powerbi", "power bi"),
];

/// Canonical lowercase form of a skill name.
pub fn normalize_skill(name: &str) -> String {
    let collapsed = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    ALIASES
        .iter()
        .find(|(alias, _)| *alias == collapsed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(collapsed)
}

/// Compiled word-boundary matchers for the fixed skill vocabulary.
pub struct SkillVocabulary {
    matchers: Vec<(String, Regex)>,
}

impl SkillVocabulary {
    pub fn new() -> Result<Self, regex::Error> {
        let matchers = VOCABULARY
            .iter()
            .map(|surface| {
                // `\b` does not treat `+`, `#` or `.` as word characters, so
                // boundaries are spelled out to keep `c++` and `c#` matchable.
                let pattern = format!(
                    r"(?:^|[^a-z0-9+#]){}(?:$|[^a-z0-9+#])",
                    regex::escape(surface)
                );
                Regex::new(&pattern).map(|re| (normalize_skill(surface), re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    /// Canonical skills mentioned in `text`, deduplicated and sorted.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let found: BTreeSet<&str> = self
            .matchers
            .iter()
            .filter(|(_, re)| re.is_match(&lower))
            .map(|(canonical, _)| canonical.as_str())
            .collect();
        found.into_iter().map(str::to_string).collect()
    }
}
