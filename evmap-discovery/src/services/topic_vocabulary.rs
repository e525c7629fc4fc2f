//! Topic vocabulary and whole-token phrase matching
//!
//! Text is tokenized on non-alphanumeric boundaries. A phrase matches when
//! its tokens occur as a contiguous run of whole tokens, so `ai` never
//! matches inside `said` and `data science` matches `Data-Science`.

/// Canonical topic and the phrases that select it
#[derive(Debug, Clone, Copy)]
pub struct TopicEntry {
    pub topic: &'static str,
    pub phrases: &'static [&'static str],
}

/// Maintained keyword vocabulary (technology and interest terms)
pub const TOPICS: &[TopicEntry] = &[
    TopicEntry { topic: "python", phrases: &["python", "django", "flask", "pydata"] },
    TopicEntry { topic: "javascript", phrases: &["javascript", "js", "node js", "nodejs", "ecmascript"] },
    TopicEntry { topic: "typescript", phrases: &["typescript"] },
    TopicEntry { topic: "react", phrases: &["react", "reactjs", "react native"] },
    TopicEntry { topic: "rust", phrases: &["rust", "rustlang", "rustaceans"] },
    TopicEntry { topic: "go", phrases: &["golang", "go lang", "gophers"] },
    TopicEntry { topic: "java", phrases: &["java", "jvm"] },
    TopicEntry { topic: "kotlin", phrases: &["kotlin"] },
    TopicEntry { topic: "swift", phrases: &["swift", "swiftui"] },
    TopicEntry { topic: "ruby", phrases: &["ruby", "rails", "ruby on rails"] },
    TopicEntry { topic: "php", phrases: &["php", "laravel"] },
    TopicEntry { topic: "data science", phrases: &["data science", "data scientist", "data scientists"] },
    TopicEntry { topic: "data engineering", phrases: &["data engineering", "data engineer", "data engineers"] },
    TopicEntry { topic: "machine learning", phrases: &["machine learning", "ml", "mlops"] },
    TopicEntry { topic: "deep learning", phrases: &["deep learning", "neural networks", "neural network"] },
    TopicEntry { topic: "ai", phrases: &["ai", "artificial intelligence", "genai", "llm", "llms"] },
    TopicEntry { topic: "analytics", phrases: &["analytics", "data analysis", "business intelligence"] },
    TopicEntry { topic: "databases", phrases: &["database", "databases", "sql", "postgres", "postgresql", "nosql"] },
    TopicEntry { topic: "blockchain", phrases: &["blockchain", "crypto", "cryptocurrency", "web3"] },
    TopicEntry { topic: "cloud", phrases: &["cloud", "cloud computing", "aws", "azure", "gcp"] },
    TopicEntry { topic: "devops", phrases: &["devops", "sre", "site reliability"] },
    TopicEntry { topic: "kubernetes", phrases: &["kubernetes", "k8s"] },
    TopicEntry { topic: "docker", phrases: &["docker", "containers"] },
    TopicEntry { topic: "linux", phrases: &["linux"] },
    TopicEntry { topic: "open source", phrases: &["open source", "opensource", "foss"] },
    TopicEntry { topic: "security", phrases: &["security", "cybersecurity", "infosec", "appsec"] },
    TopicEntry { topic: "web development", phrases: &["web development", "web dev", "frontend", "front end", "backend", "back end", "full stack", "fullstack"] },
    TopicEntry { topic: "mobile", phrases: &["mobile", "ios", "android", "mobile development"] },
    TopicEntry { topic: "design", phrases: &["design", "ux", "ui ux", "user experience", "product design"] },
    TopicEntry { topic: "product management", phrases: &["product management", "product manager", "product managers"] },
    TopicEntry { topic: "startups", phrases: &["startup", "startups", "entrepreneur", "entrepreneurs", "entrepreneurship", "founders"] },
    TopicEntry { topic: "game development", phrases: &["game development", "game dev", "gamedev", "indie games"] },
    TopicEntry { topic: "gaming", phrases: &["gaming", "board games", "video games", "esports"] },
    TopicEntry { topic: "networking", phrases: &["networking"] },
    TopicEntry { topic: "photography", phrases: &["photography", "photo walk", "photographers"] },
    TopicEntry { topic: "music", phrases: &["music", "concert", "concerts", "jam session"] },
    TopicEntry { topic: "art", phrases: &["art", "arts", "painting", "drawing"] },
    TopicEntry { topic: "writing", phrases: &["writing", "writers", "poetry"] },
    TopicEntry { topic: "book club", phrases: &["book club", "book clubs", "books", "reading group"] },
    TopicEntry { topic: "hiking", phrases: &["hiking", "hike", "hikes", "trail"] },
    TopicEntry { topic: "yoga", phrases: &["yoga"] },
    TopicEntry { topic: "fitness", phrases: &["fitness", "running", "workout", "crossfit"] },
    TopicEntry { topic: "language exchange", phrases: &["language exchange", "language learning"] },
];

/// Words marking a remote/online request
pub const REMOTE_PHRASES: &[&str] = &["remote", "remotely", "online", "virtual", "virtually"];

/// Words marking a free/no-cost request
pub const FREE_PHRASES: &[&str] = &["free", "no cost", "gratis", "free of charge", "without charge"];

/// Split normalized text into alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Whether `phrase` occurs in `tokens` as a contiguous whole-token run
pub fn contains_phrase(tokens: &[&str], phrase: &str) -> bool {
    let needle = tokenize(phrase);
    if needle.is_empty() || needle.len() > tokens.len() {
        return false;
    }
    tokens.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Whether any of `phrases` occurs in `tokens`
pub fn contains_any(tokens: &[&str], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(tokens, phrase))
}

/// Every canonical topic with at least one matching phrase
pub fn match_topics(tokens: &[&str]) -> Vec<&'static str> {
    TOPICS
        .iter()
        .filter(|entry| contains_any(tokens, entry.phrases))
        .map(|entry| entry.topic)
        .collect()
}

/// Whether `candidate` is, token for token, a topic phrase
pub fn is_topic_phrase(candidate: &str) -> bool {
    let tokens = tokenize(candidate);
    TOPICS
        .iter()
        .flat_map(|entry| entry.phrases.iter())
        .any(|phrase| tokenize(phrase) == tokens)
}
