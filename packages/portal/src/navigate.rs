//! Discovery of the next page to load when the grades URL answers with an
//! intermediate page instead of the grades themselves.
//!
//! Older portals bounce through `<meta http-equiv="refresh">` pages or wrap
//! the real content in a frameset.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};

use crate::{PortalError, resolve_url};

/// The `url=` part of a meta refresh `content` attribute.
static REFRESH_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\s*=\s*['"]?\s*([^'"\s]+)"#).expect("valid regex")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| unreachable!())
}

/// Returns the raw target of the first meta refresh in the document.
#[must_use]
pub fn meta_refresh_target(document: &Html) -> Option<String> {
    let meta_sel = selector("meta[http-equiv][content]");
    document
        .select(&meta_sel)
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .find_map(|m| {
            let content = m.value().attr("content")?;
            REFRESH_URL_RE
                .captures(content)
                .map(|caps| caps[1].to_owned())
        })
}

/// Returns the raw `src` of the frame most likely to hold the grades.
///
/// A frame whose source mentions `nota` is preferred; otherwise the first
/// frame with a usable source is returned.
#[must_use]
pub fn frame_target(document: &Html) -> Option<String> {
    let frame_sel = selector("frame[src], iframe[src]");
    let sources: Vec<&str> = document
        .select(&frame_sel)
        .filter_map(|f| f.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.eq_ignore_ascii_case("about:blank"))
        .collect();

    sources
        .iter()
        .find(|src| src.to_ascii_lowercase().contains("nota"))
        .or_else(|| sources.first())
        .map(|src| (*src).to_owned())
}

/// Returns `true` if the document contains at least one `<table>`.
#[must_use]
pub fn has_table(document: &Html) -> bool {
    document.select(&selector("table")).next().is_some()
}

/// Decides where to go after loading `html` from `current`.
///
/// A meta refresh is always followed. A frame is followed only when the
/// page has no table of its own. Returns `None` when `html` is the final
/// page.
///
/// # Errors
///
/// * [`PortalError::InvalidUrl`] if the target cannot be resolved
pub fn next_hop(html: &str, current: &Url) -> Result<Option<Url>, PortalError> {
    let document = Html::parse_document(html);
    let target = meta_refresh_target(&document).or_else(|| {
        if has_table(&document) {
            None
        } else {
            frame_target(&document)
        }
    });

    target
        .map(|target| resolve_url(current, &target))
        .transpose()
}
