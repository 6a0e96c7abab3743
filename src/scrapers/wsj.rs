//! Wall Street Journal article scraper.
//!
//! Indexes article links from a WSJ section page (business, markets,
//! economy) and extracts headline plus paragraph text from each
//! article. Article links share the `/articles/` path segment, which is
//! what the index selector keys on.

use itertools::Itertools;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use crate::errors::PipelineError;
use crate::models::FetchedArticle;

/// Paragraphs shorter than this are treated as navigation/boilerplate
/// when falling back to the page-wide paragraph scan.
const MIN_PARAGRAPH_CHARS: usize = 50;

/// Index a section page to extract article URLs.
///
/// Relative links are resolved against the section URL; duplicates are
/// dropped while preserving first-seen order.
#[instrument(level = "info", skip(client))]
pub async fn index_articles(
    client: &reqwest::Client,
    section_url: &str,
) -> Result<Vec<String>, PipelineError> {
    let base_url =
        Url::parse(section_url).map_err(|e| PipelineError::FetchFailure(e.to_string()))?;

    let response = client
        .get(section_url)
        .send()
        .await
        .map_err(|e| PipelineError::FetchFailure(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::FetchFailure(format!(
            "section page returned status {status}"
        )));
    }
    let html = response
        .text()
        .await
        .map_err(|e| PipelineError::FetchFailure(e.to_string()))?;

    let document = Html::parse_document(&html);
    let link_selector = Selector::parse(r#"a[href*="/articles/"]"#).unwrap();

    let article_urls: Vec<String> = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base_url.join(href).ok())
        .map(|resolved| resolved.to_string())
        .unique()
        .collect();

    info!(
        count = article_urls.len(),
        source = section_url,
        "Indexed article URLs"
    );
    debug!(urls = ?article_urls, "Article URLs");

    Ok(article_urls)
}

/// Fetch a single article: headline plus body paragraphs.
///
/// Tries the article body container first; if nothing matches, falls
/// back to every paragraph on the page longer than the boilerplate
/// cutoff. An article without both a title and content is a fetch
/// failure, not a partial result.
#[instrument(level = "info", skip(client), fields(%url))]
pub async fn fetch_article(
    client: &reqwest::Client,
    url: &str,
) -> Result<FetchedArticle, PipelineError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PipelineError::FetchFailure(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::FetchFailure(format!(
            "article returned status {status}"
        )));
    }
    let body = response
        .text()
        .await
        .map_err(|e| PipelineError::FetchFailure(e.to_string()))?;

    let document = Html::parse_document(&body);

    let title_selector = Selector::parse("h1").unwrap();
    let title = document
        .select(&title_selector)
        .next()
        .map(|e| e.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_default();

    let body_selector = Selector::parse("article p").unwrap();
    let mut paragraphs: Vec<String> = document
        .select(&body_selector)
        .map(|p| p.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if paragraphs.is_empty() {
        let any_p = Selector::parse("p").unwrap();
        paragraphs = document
            .select(&any_p)
            .map(|p| p.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|t| t.chars().count() > MIN_PARAGRAPH_CHARS)
            .collect();
    }

    let content = paragraphs.join("\n\n");
    if title.is_empty() || content.is_empty() {
        return Err(PipelineError::FetchFailure(
            "could not extract title and content".into(),
        ));
    }

    info!(bytes = content.len(), "Parsed article");
    Ok(FetchedArticle {
        title,
        content,
        url: url.to_string(),
    })
}
