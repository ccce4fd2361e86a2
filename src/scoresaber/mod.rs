use url::Url;

pub mod markup;
pub mod parser;
pub mod play_log;
pub mod schema;
pub mod scrape;

/// The `page`-th page of the top scores of the profile at `base`.
pub fn page_url(base: &Url, page: u32) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("page", &page.to_string())
        .append_pair("sort", "top");
    url
}
