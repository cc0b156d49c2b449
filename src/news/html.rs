use std::collections::HashSet;

use scraper::element_ref::ElementRef;
use scraper::{Html, Selector};

use crate::engine::models::FeedArticle;

const MAX_ARTICLES: usize = 6;
const TITLE_LIMIT: usize = 80;
const DESCRIPTION_LIMIT: usize = 160;

const CARD_SELECTORS: [&str; 6] = [
    "article",
    ".news-card",
    ".news-item",
    ".post",
    ".post-card",
    ".card",
];
const TITLE_SELECTORS: [&str; 6] = ["h1", "h2", "h3", ".title", ".card-title", ".post-title"];
const SUMMARY_SELECTORS: [&str; 4] = ["p", ".summary", ".excerpt", ".card-excerpt"];

/// Extract news cards from an HTML page. Relative links and images resolve against
/// `origin` (scheme and host of the page).
pub fn parse_feed_articles(body: &str, origin: &str) -> Vec<FeedArticle> {
    let document = Html::parse_document(body);
    let mut articles = Vec::new();
    let mut seen = HashSet::new();

    for selector in CARD_SELECTORS {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for card in document.select(&selector) {
            let Some(url) = first_attr(card, "a[href]", "href")
                .and_then(|href| absolutize(&href, origin))
            else {
                continue;
            };
            if !seen.insert(url.clone()) {
                continue;
            }

            let title = first_text(card, &TITLE_SELECTORS).unwrap_or_else(|| element_text(card));
            if title.is_empty() {
                continue;
            }
            let description = first_text(card, &SUMMARY_SELECTORS)
                .filter(|summary| summary != &title)
                .unwrap_or_default();
            let image_url =
                first_attr(card, "img[src]", "src").and_then(|src| absolutize(&src, origin));

            articles.push(FeedArticle {
                id: url.clone(),
                title: truncate_text(&title, TITLE_LIMIT),
                description: truncate_text(&description, DESCRIPTION_LIMIT),
                image_url,
                dest_url: Some(url),
            });
            if articles.len() >= MAX_ARTICLES {
                return articles;
            }
        }
    }

    articles
}

fn first_text(card: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        Selector::parse(sel)
            .ok()
            .and_then(|selector| card.select(&selector).next())
            .map(element_text)
            .filter(|text| !text.is_empty())
    })
}

fn first_attr(card: ElementRef<'_>, selector: &str, attr: &str) -> Option<String> {
    if let Some(value) = card.value().attr(attr) {
        return Some(value.to_owned());
    }
    let selector = Selector::parse(selector).ok()?;
    card.select(&selector)
        .find_map(|el| el.value().attr(attr))
        .map(str::to_owned)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn absolutize(href: &str, origin: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_owned());
    }
    if href.starts_with('/') && !href.starts_with("//") {
        return Some(format!("{}{href}", origin.trim_end_matches('/')));
    }
    None
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(3)).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str("...");
    cut
}
