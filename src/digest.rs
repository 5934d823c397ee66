use anyhow::{Context, Result};
use chrono::NaiveDate;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use log::{debug, warn};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Content classification for a digest section, derived from its heading
/// text once at load time and looked up afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Tech,
    Hn,
    Research,
    /// Heading matched none of the known section vocabularies. These
    /// sections never pass the type filter.
    Other,
}

impl SectionKind {
    pub fn classify(heading: &str) -> Self {
        let heading = heading.to_lowercase();
        if heading.contains("world tech") || heading.contains("tech news") {
            SectionKind::Tech
        } else if heading.contains("hacker news") {
            SectionKind::Hn
        } else if heading.contains("research") {
            SectionKind::Research
        } else {
            SectionKind::Other
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SectionKind::Tech => "World Tech News",
            SectionKind::Hn => "Hacker News",
            SectionKind::Research => "Research Papers",
            SectionKind::Other => "Other",
        }
    }

    /// The three kinds a user can filter on.
    pub fn filterable() -> &'static [SectionKind] {
        &[SectionKind::Tech, SectionKind::Hn, SectionKind::Research]
    }
}

#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub summary: String,
}

impl Article {
    /// Text used for keyword matching, mirrors matching against the whole
    /// rendered article body.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }

    /// Text handed to the speech engine.
    pub fn speech_text(&self) -> String {
        format!("{}. {}", self.title, self.summary)
    }

    pub fn word_count(&self) -> usize {
        self.combined_text().split_whitespace().count()
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub heading: String,
    pub kind: SectionKind,
    pub articles: Vec<Article>,
}

/// One day's worth of rendered digest content. The shape is fixed after
/// parsing; filtering only projects visibility on top of it.
#[derive(Debug, Clone)]
pub struct DigestDay {
    pub date: NaiveDate,
    pub date_str: String,
    pub label: String,
    pub sections: Vec<Section>,
}

impl DigestDay {
    pub fn new(date: NaiveDate, sections: Vec<Section>) -> Self {
        Self {
            date,
            date_str: date.format("%Y-%m-%d").to_string(),
            label: date.format("%B %d, %Y").to_string(),
            sections,
        }
    }

    pub fn article_count(&self) -> usize {
        self.sections.iter().map(|s| s.articles.len()).sum()
    }
}

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").to_string()
}

/// Load every digest file from the archive directory, newest first.
///
/// Files are named `YYYY-MM-DD.html` by the generator; anything else is
/// skipped with a warning. A file that fails to read or parse degrades to
/// being skipped rather than failing the whole archive.
pub fn load_archive(dir: &Path) -> Result<Vec<DigestDay>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read archive directory {}", dir.display()))?;

    let mut days = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => continue,
        };
        let date = match NaiveDate::parse_from_str(stem, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                warn!("Skipping archive file with non-date name: {}", path.display());
                continue;
            }
        };
        match fs::read_to_string(&path) {
            Ok(html) => {
                let day = parse_digest_html(date, &html);
                debug!(
                    "Loaded digest {} ({} sections, {} articles)",
                    day.date_str,
                    day.sections.len(),
                    day.article_count()
                );
                days.push(day);
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
            }
        }
    }

    days.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(days)
}

/// Parse one rendered digest page into the content model. Classification of
/// each section happens here, once, so filter passes only look the tag up.
pub fn parse_digest_html(date: NaiveDate, html: &str) -> DigestDay {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);

    let mut sections = Vec::new();
    collect_sections(&dom.document, &mut sections);
    DigestDay::new(date, sections)
}

fn collect_sections(node: &Handle, out: &mut Vec<Section>) {
    if has_class(node, "section") {
        out.push(parse_section(node));
        return;
    }
    for child in node.children.borrow().iter() {
        collect_sections(child, out);
    }
}

fn parse_section(node: &Handle) -> Section {
    let heading = find_first(node, |n| is_element(n, "h2"))
        .map(|h| collapse_whitespace(&text_content(&h)))
        .unwrap_or_default();
    let kind = if heading.is_empty() {
        SectionKind::Other
    } else {
        SectionKind::classify(&heading)
    };

    let mut article_nodes = Vec::new();
    collect_by_class(node, "article", &mut article_nodes);
    let articles = article_nodes.iter().map(parse_article).collect();

    Section {
        heading,
        kind,
        articles,
    }
}

fn parse_article(node: &Handle) -> Article {
    let title_anchor = find_first(node, |n| has_class(n, "article-title"))
        .and_then(|t| find_first(&t, |n| is_element(n, "a")));

    let title = title_anchor
        .as_ref()
        .map(|a| collapse_whitespace(&text_content(a)))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let url = title_anchor
        .as_ref()
        .and_then(|a| attribute(a, "href"))
        .unwrap_or_else(|| "#".to_string());
    let summary = find_first(node, |n| has_class(n, "article-summary"))
        .map(|s| collapse_whitespace(&text_content(&s)))
        .unwrap_or_default();

    Article {
        title,
        url,
        summary,
    }
}

fn is_element(node: &Handle, tag: &str) -> bool {
    match &node.data {
        NodeData::Element { name, .. } => &*name.local == tag,
        _ => false,
    }
}

fn attribute(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr_name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn has_class(node: &Handle, class: &str) -> bool {
    attribute(node, "class")
        .map(|v| v.split_whitespace().any(|token| token == class))
        .unwrap_or(false)
}

fn find_first<F>(node: &Handle, predicate: F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool + Copy,
{
    for child in node.children.borrow().iter() {
        if predicate(child) {
            return Some(child.clone());
        }
        if let Some(found) = find_first(child, predicate) {
            return Some(found);
        }
    }
    None
}

fn collect_by_class(node: &Handle, class: &str, out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if has_class(child, class) {
            out.push(child.clone());
            // Articles do not nest.
            continue;
        }
        collect_by_class(child, class, out);
    }
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    append_text(node, &mut text);
    text
}

fn append_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => {
            out.push_str(&contents.borrow());
        }
        _ => {
            for child in node.children.borrow().iter() {
                append_text(child, out);
            }
        }
    }
}
