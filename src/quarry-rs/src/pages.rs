//! Page sources for browsing objects, rules and synonyms

use async_trait::async_trait;
use quarry_core::{
    api_path, ApiWrapper, Method, Page, PageSource, Record, RequestOptions, Result,
    SearchResponse,
};
use serde::Deserialize;
use std::sync::Arc;

/// Hits requested per page when paging through rules or synonyms
pub const DEFAULT_HITS_PER_PAGE: u32 = 1000;

/// Pages through indexed objects with the browse endpoint's cursor
pub struct ObjectPages {
    api: Arc<dyn ApiWrapper>,
    index_name: String,
}

impl ObjectPages {
    pub fn new(api: Arc<dyn ApiWrapper>, index_name: impl Into<String>) -> Self {
        Self {
            api,
            index_name: index_name.into(),
        }
    }
}

#[derive(Deserialize)]
struct BrowseResponse {
    #[serde(default)]
    hits: Vec<Record>,
    #[serde(default)]
    cursor: Option<String>,
}

#[async_trait]
impl PageSource for ObjectPages {
    type Item = Record;
    type Cursor = String;

    async fn fetch_page(
        &self,
        cursor: Option<&String>,
        options: &RequestOptions,
    ) -> Result<Page<Record, String>> {
        let mut defaults = RequestOptions::new();
        if let Some(cursor) = cursor {
            defaults.set_body_parameter("cursor", cursor.as_str());
        }
        let options = options.merged_over(defaults);

        let path = api_path("/1/indexes/{}/browse", &[self.index_name.as_str()]);
        let response: BrowseResponse =
            serde_json::from_value(self.api.read(Method::Post, &path, &options).await?)?;

        Ok(Page {
            items: response.hits,
            next: response.cursor.filter(|c| !c.is_empty()),
        })
    }
}

/// Resources paged with `page`/`nbPages` through their search endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagedResource {
    Rules,
    Synonyms,
}

impl PagedResource {
    fn search_path(&self, index_name: &str) -> String {
        match self {
            PagedResource::Rules => api_path("/1/indexes/{}/rules/search", &[index_name]),
            PagedResource::Synonyms => api_path("/1/indexes/{}/synonyms/search", &[index_name]),
        }
    }
}

/// Pages through rules or synonyms; the cursor is the next page number
pub struct SearchPages {
    api: Arc<dyn ApiWrapper>,
    index_name: String,
    resource: PagedResource,
}

impl SearchPages {
    pub fn new(
        api: Arc<dyn ApiWrapper>,
        index_name: impl Into<String>,
        resource: PagedResource,
    ) -> Self {
        Self {
            api,
            index_name: index_name.into(),
            resource,
        }
    }
}

#[async_trait]
impl PageSource for SearchPages {
    type Item = Record;
    type Cursor = u32;

    async fn fetch_page(
        &self,
        cursor: Option<&u32>,
        options: &RequestOptions,
    ) -> Result<Page<Record, u32>> {
        let page = cursor.copied().unwrap_or(0);

        let defaults = RequestOptions::new()
            .with_body_parameter("query", "")
            .with_body_parameter("hitsPerPage", DEFAULT_HITS_PER_PAGE);
        let mut options = options.merged_over(defaults);
        options.set_body_parameter("page", page);

        let path = self.resource.search_path(&self.index_name);
        let response: SearchResponse =
            serde_json::from_value(self.api.read(Method::Post, &path, &options).await?)?;

        let items = response
            .hits
            .into_iter()
            .map(|mut hit| {
                hit.remove("_highlightResult");
                hit
            })
            .collect();
        let next = (page + 1 < response.nb_pages).then_some(page + 1);

        Ok(Page { items, next })
    }
}
