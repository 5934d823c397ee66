use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

const TOP_KEYWORDS: usize = 10;
const SIMILARITY_THRESHOLD: f64 = 0.1;
pub const MAX_SIMILAR: usize = 3;
const SNIPPET_LEN: usize = 150;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "as", "is", "was", "are", "been", "be", "have", "has", "had", "do", "does", "did",
        "will", "would", "could", "should", "may", "might", "can", "this", "that", "these",
        "those", "it", "its", "they", "their", "them", "what", "which", "who", "when", "where",
        "why", "how", "all", "each", "every", "both", "few", "more", "most", "other", "some",
        "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very", "just",
        "now",
    ]
    .into_iter()
    .collect()
});

static PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation regex"));

/// Top frequent non-stopword terms of a text, longest-running counts first.
/// Ties keep first-seen order so repeated runs give stable results.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let cleaned = PUNCTUATION_RE.replace_all(&text.to_lowercase(), " ");

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.len() <= 3 || STOP_WORDS.contains(word) {
            continue;
        }
        let entry = counts.entry(word).or_insert(0);
        if *entry == 0 {
            order.push(word);
        }
        *entry += 1;
    }

    let mut ranked: Vec<(&str, usize)> = order.into_iter().map(|w| (w, counts[w])).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(w, _)| w.to_string())
        .collect()
}

/// Jaccard similarity of two keyword sets.
pub fn similarity(keywords_a: &[String], keywords_b: &[String]) -> f64 {
    let set_a: HashSet<&str> = keywords_a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = keywords_b.iter().map(String::as_str).collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// One candidate article in the pairwise scan.
#[derive(Debug, Clone)]
pub struct SimilarCandidate {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub date: String,
}

impl SimilarCandidate {
    fn text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

#[derive(Debug, Clone)]
pub struct SimilarHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub date: String,
    pub score: f64,
}

fn snippet(summary: &str) -> String {
    let truncated: String = summary.chars().take(SNIPPET_LEN).collect();
    format!("{}...", truncated)
}

/// Pairwise keyword scan over all candidates; O(n²) overall, which is fine
/// at digest-page scale. Returns the top matches above the threshold,
/// best first.
pub fn find_similar(target: usize, candidates: &[SimilarCandidate]) -> Vec<SimilarHit> {
    let Some(target_candidate) = candidates.get(target) else {
        return Vec::new();
    };
    let target_keywords = extract_keywords(&target_candidate.text());

    let mut hits: Vec<SimilarHit> = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .filter_map(|(_, candidate)| {
            let keywords = extract_keywords(&candidate.text());
            let score = similarity(&target_keywords, &keywords);
            if score > SIMILARITY_THRESHOLD {
                Some(SimilarHit {
                    title: candidate.title.clone(),
                    snippet: snippet(&candidate.summary),
                    url: candidate.url.clone(),
                    date: candidate.date.clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(MAX_SIMILAR);
    hits
}
