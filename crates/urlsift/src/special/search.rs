//! Search result pages
//!
//! Result links on the HTML search page are wrapped in a redirect
//! (`//duckduckgo.com/l/?uddg=<encoded target>&rut=<tracking>`). They are
//! unwrapped here; the fan-out over the targets happens in the processor.

use crate::extractors::dedup;
use crate::extractors::webpage::extract_links;
use percent_encoding::percent_decode_str;

/// HTML search endpoint
pub const SEARCH_ENDPOINT: &str = "https://duckduckgo.com/html/";

const REDIRECT_HOST: &str = "//duckduckgo.com";
const REDIRECT_PATH: &str = "/l/?uddg=";
const TRACKING_PARAM: &str = "&rut";

/// Links on the results page that are not results
const NON_RESULT_PATHS: &[&str] = &["/html/", "/feedback.html"];

/// Build the results page URL for a query
pub fn search_url(query: &str) -> String {
    format!("{SEARCH_ENDPOINT}?q={}", query.replace(' ', "+"))
}

/// Strip the redirect wrapper from a result link
///
/// Returns `None` for links that are navigation rather than results.
pub fn unwrap_result_href(href: &str) -> Option<String> {
    let stripped = href.replace(REDIRECT_HOST, "").replace(REDIRECT_PATH, "");
    let decoded = percent_decode_str(&stripped).decode_utf8_lossy();
    let target = decoded.split(TRACKING_PARAM).next().unwrap_or_default();

    if NON_RESULT_PATHS.contains(&target) {
        return None;
    }
    Some(target.to_string())
}

/// Unwrapped result URLs of a results page, in page order
pub fn result_urls(html: &str) -> Vec<String> {
    dedup(extract_links(html))
        .iter()
        .filter_map(|href| unwrap_result_href(href))
        .collect()
}
