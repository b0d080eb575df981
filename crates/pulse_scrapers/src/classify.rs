//! Keyword heuristics that assign categories and tags to news items.

use pulse_core::Category;

const TECH_KEYWORDS: &[&str] = &[
    "ai", "ml", "api", "cloud", "data", "web", "app", "mobile", "security", "crypto",
    "blockchain", "startup", "programming", "rust", "python", "javascript", "golang",
    "opensource", "github",
];

/// Checked in order; the first rule with a hit wins.
const TITLE_RULES: &[(Category, &[&str])] = &[
    (Category::Ai, &["ai", "ml", "gpt", "llm", "machine learning", "neural"]),
    (Category::Blockchain, &["blockchain", "crypto", "bitcoin", "web3"]),
    (Category::Startup, &["startup", "funding", "venture", "founder"]),
    (Category::Security, &["security", "hack", "vulnerability"]),
    (Category::Programming, &["programming", "code", "developer"]),
];

const TAG_RULES: &[(Category, &[&str])] = &[
    (Category::Ai, &["ai", "machinelearning", "artificialintelligence", "ml"]),
    (Category::Blockchain, &["blockchain", "crypto", "bitcoin", "web3"]),
    (Category::Startup, &["startup", "entrepreneurship", "business"]),
    (Category::Security, &["security", "infosec", "privacy"]),
    (Category::Programming, &["programming", "coding", "development"]),
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Single words match whole tokens, phrases match as substrings.
fn mentions(title_lower: &str, tokens: &[String], keyword: &str) -> bool {
    if keyword.contains(' ') {
        title_lower.contains(keyword)
    } else {
        tokens.iter().any(|t| t == keyword)
    }
}

pub fn categorize_title(title: &str) -> Category {
    let lower = title.to_lowercase();
    let tokens = words(title);
    TITLE_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| mentions(&lower, &tokens, k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Technology)
}

pub fn categorize_tags(tags: &[String]) -> Category {
    let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    TAG_RULES
        .iter()
        .find(|(_, keywords)| tags.iter().any(|t| keywords.contains(&t.as_str())))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Technology)
}

/// Subreddit membership decides before the title does.
pub fn categorize_reddit(title: &str, subreddit: &str) -> Category {
    match subreddit.to_lowercase().as_str() {
        "artificial" | "machinelearning" => Category::Ai,
        "startups" => Category::Startup,
        "programming" => match categorize_title(title) {
            Category::Technology => Category::Programming,
            other => other,
        },
        _ => categorize_title(title),
    }
}

/// Tech keywords present in the title, first occurrence order.
pub fn extract_tags(title: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for word in words(title) {
        if TECH_KEYWORDS.contains(&word.as_str()) && !tags.contains(&word) {
            tags.push(word);
        }
    }
    tags
}

pub fn extract_reddit_tags(title: &str, subreddit: &str, flair: Option<&str>) -> Vec<String> {
    let mut tags = vec![subreddit.to_lowercase()];
    for tag in extract_tags(title) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    if let Some(flair) = flair.map(str::trim).filter(|f| !f.is_empty()) {
        let flair = flair.to_lowercase();
        if !tags.contains(&flair) {
            tags.push(flair);
        }
    }
    tags
}

/// Order-preserving de-duplication.
pub fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_title() {
        assert_eq!(categorize_title("New GPT model released"), Category::Ai);
        assert_eq!(categorize_title("Advances in machine learning"), Category::Ai);
        assert_eq!(categorize_title("Bitcoin hits new high"), Category::Blockchain);
        assert_eq!(categorize_title("Startup raises seed funding"), Category::Startup);
        assert_eq!(categorize_title("Critical vulnerability in OpenSSH"), Category::Security);
        assert_eq!(categorize_title("Why I write code every day"), Category::Programming);
        assert_eq!(categorize_title("A new laptop from Framework"), Category::Technology);
    }

    #[test]
    fn test_short_keywords_match_whole_words() {
        // "said" and "email" contain "ai" but are not about AI
        assert_eq!(categorize_title("CEO said email is dead"), Category::Technology);
        assert_eq!(categorize_title("AI is eating the world"), Category::Ai);
    }

    #[test]
    fn test_categorize_tags() {
        let tags = vec!["webdev".to_string(), "MachineLearning".to_string()];
        assert_eq!(categorize_tags(&tags), Category::Ai);
        let tags = vec!["privacy".to_string()];
        assert_eq!(categorize_tags(&tags), Category::Security);
        assert_eq!(categorize_tags(&[]), Category::Technology);
    }

    #[test]
    fn test_categorize_reddit() {
        assert_eq!(categorize_reddit("Anything at all", "MachineLearning"), Category::Ai);
        assert_eq!(categorize_reddit("Anything at all", "startups"), Category::Startup);
        assert_eq!(categorize_reddit("Anything at all", "programming"), Category::Programming);
        assert_eq!(categorize_reddit("Crypto exchange hacked", "programming"), Category::Blockchain);
        assert_eq!(categorize_reddit("New phone announced", "technology"), Category::Technology);
    }

    #[test]
    fn test_extract_tags() {
        assert_eq!(
            extract_tags("Rust and Python: a cloud API story about AI, AI and more"),
            vec!["rust", "python", "cloud", "api", "ai"]
        );
        assert!(extract_tags("Nothing relevant here").is_empty());
    }

    #[test]
    fn test_extract_reddit_tags() {
        let tags = extract_reddit_tags("Open source AI tools", "MachineLearning", Some("Discussion"));
        assert_eq!(tags, vec!["machinelearning", "ai", "discussion"]);
    }

    #[test]
    fn test_dedup_tags() {
        let tags = dedup_tags(vec!["a".to_string(), "b".to_string(), "a".to_string(), String::new()]);
        assert_eq!(tags, vec!["a", "b"]);
    }
}
