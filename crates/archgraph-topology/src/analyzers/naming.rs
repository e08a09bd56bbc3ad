// ABOUTME: Slug and display-name helpers shared by the flow and journey builders
// ABOUTME: Keeps slugs lower-kebab and unique within one build via numeric suffixes

use std::collections::HashSet;

const LEADING_ARTICLES: &[&str] = &["the ", "a ", "an "];

/// Lower-kebab slug: ASCII alphanumerics kept, every other run collapses to `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "flow".to_string()
    } else {
        slug
    }
}

/// Hands out unique slugs: the first claim of `base` gets `base`, later ones `base-2`, `base-3`...
#[derive(Debug, Default, Clone)]
pub struct SlugRegistry {
    taken: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reserved<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: reserved.into_iter().map(Into::into).collect(),
        }
    }

    pub fn claim(&mut self, name: &str) -> String {
        let base = slugify(name);
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Truncate on a char boundary, trimming trailing whitespace and punctuation.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    cut.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == ':')
        .to_string()
}

/// Strip one leading article and upper-case the first letter.
pub fn clean_sentence(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches('.');
    let lowered = trimmed.to_lowercase();
    let rest = LEADING_ARTICLES
        .iter()
        .find(|article| lowered.starts_with(*article))
        .map(|article| &trimmed[article.len()..])
        .unwrap_or(trimmed)
        .trim_start();
    capitalize(rest)
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
