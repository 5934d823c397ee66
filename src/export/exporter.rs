use crate::digest::DigestDay;
use crate::filters::ApplyOutcome;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Lines per exported page; a break is inserted whenever the next block
/// would not fit in the space remaining on the current page.
const PAGE_HEIGHT: usize = 54;
const PAGE_WIDTH: usize = 88;
/// Summaries longer than this many wrapped lines are cut with a marker.
const MAX_SUMMARY_LINES: usize = 15;

#[derive(Debug)]
pub enum ExportError {
    ExportDirNotFound,
    WriteError(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::ExportDirNotFound => write!(f, "Export directory not found"),
            ExportError::WriteError(msg) => write!(f, "Failed to write export: {}", msg),
        }
    }
}

impl std::error::Error for ExportError {}

/// Accumulates output lines while tracking the space left on the current
/// page. Pages are separated with a form feed, the classic plain-text
/// pagination marker.
struct PageComposer {
    lines: Vec<String>,
    line_in_page: usize,
    pages: usize,
}

impl PageComposer {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            line_in_page: 0,
            pages: 1,
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        if self.line_in_page >= PAGE_HEIGHT {
            self.break_page();
        }
        self.lines.push(line.into());
        self.line_in_page += 1;
    }

    fn blank(&mut self) {
        self.push(String::new());
    }

    /// Start a new page unless the next block of `needed` lines still fits.
    fn ensure_room(&mut self, needed: usize) {
        if self.line_in_page + needed > PAGE_HEIGHT && self.line_in_page > 0 {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        self.lines.push("\u{0C}".to_string());
        self.line_in_page = 0;
        self.pages += 1;
    }

    fn into_document(self) -> String {
        let mut doc = self.lines.join("\n");
        doc.push('\n');
        doc
    }
}

/// Walks the currently visible content tree and writes it out as one
/// paginated plain-text document.
pub struct DigestExporter;

impl DigestExporter {
    pub fn export(
        days: &[DigestDay],
        outcome: &ApplyOutcome,
        export_dir: &Path,
        today: NaiveDate,
    ) -> Result<PathBuf> {
        if !export_dir.exists() {
            return Err(ExportError::ExportDirNotFound.into());
        }

        let filepath = export_dir.join(format!("tech-digest-{}.txt", today.format("%Y-%m-%d")));

        let article_count: usize = outcome
            .days
            .iter()
            .flat_map(|d| d.sections.iter())
            .filter(|s| s.visibility.is_visible())
            .flat_map(|s| s.articles.iter())
            .filter(|a| a.visible)
            .count();

        let mut composer = PageComposer::new();
        composer.push("Tech Digest Export");
        composer.push("==================");
        composer.push(format!(
            "Generated on {} ({} days, {} articles)",
            today.format("%Y-%m-%d"),
            outcome.visible_days,
            article_count
        ));
        composer.blank();

        if outcome.visible_days == 0 {
            composer.push("No articles to export. Try adjusting your filters.");
        } else {
            Self::compose_days(&mut composer, days, outcome);
        }

        let pages = composer.pages;
        let document = composer.into_document();
        fs::write(&filepath, document)
            .map_err(|e| ExportError::WriteError(e.to_string()))
            .with_context(|| format!("Failed to write to {}", filepath.display()))?;

        info!(
            "Exported {} articles over {} pages to {}",
            article_count,
            pages,
            filepath.display()
        );
        Ok(filepath)
    }

    fn compose_days(composer: &mut PageComposer, days: &[DigestDay], outcome: &ApplyOutcome) {
        for (day, view) in days.iter().zip(&outcome.days) {
            if !view.visibility.is_visible() {
                continue;
            }

            composer.ensure_room(6);
            composer.push(day.label.clone());
            composer.push("-".repeat(day.label.len()));
            composer.blank();

            for (section, section_view) in day.sections.iter().zip(&view.sections) {
                if !section_view.visibility.is_visible() {
                    continue;
                }
                let visible_articles: Vec<usize> = section_view
                    .articles
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.visible)
                    .map(|(i, _)| i)
                    .collect();
                if visible_articles.is_empty() {
                    continue;
                }

                composer.ensure_room(4);
                composer.push(format!("## {}", section.heading));
                composer.blank();

                for idx in visible_articles {
                    let article = &section.articles[idx];
                    let title_lines = textwrap::wrap(&article.title, PAGE_WIDTH);
                    composer.ensure_room(title_lines.len() + 3);
                    for line in &title_lines {
                        composer.push(format!("* {}", line));
                    }
                    composer.push(format!("  {}", article.url));

                    let summary_lines = textwrap::wrap(&article.summary, PAGE_WIDTH);
                    let shown = summary_lines.len().min(MAX_SUMMARY_LINES);
                    for line in &summary_lines[..shown] {
                        composer.push(format!("  {}", line));
                    }
                    if summary_lines.len() > MAX_SUMMARY_LINES {
                        composer.push("  [...]");
                    }
                    composer.blank();
                }
                composer.blank();
            }
        }
    }
}
