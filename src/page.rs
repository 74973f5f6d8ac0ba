//! Page metadata extraction from HTML responses

use scraper::{Html, Selector};

use crate::context::RequestContext;
use crate::types::PageInfo;

/// Derive page metadata from the context's response.
///
/// Returns None unless the response is `text/html` with a non-empty,
/// synchronously available body; a streaming or bodyless response is a
/// deliberate skip, not an error. `page_location` is the request's
/// absolute URL including the query string; `page_title` is the trimmed
/// text of the first `<title>` under `<head>`, empty when no title
/// element exists.
pub fn extract_page_info(ctx: &RequestContext) -> Option<PageInfo> {
    let response = ctx.response.as_ref()?;
    if !response.is_html() {
        return None;
    }
    let body = response.body.as_deref().filter(|b| !b.is_empty())?;

    let document = Html::parse_document(body);
    let selector = Selector::parse("head > title").ok()?;
    let page_title = document
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    Some(PageInfo {
        page_location: ctx.request.url.clone(),
        page_title,
    })
}
