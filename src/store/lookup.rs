//! iTunes lookup through the request pipeline.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::config::StoreConfig;
use crate::pipeline::{Pipeline, RequestOptions};
use crate::store::app::{clean_app, App, RawApp};
use crate::store::markets::store_id;
use crate::upstream::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("malformed lookup response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("App not found (404)")]
    NotFound,

    #[error("Developer not found (404)")]
    DeveloperNotFound,
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        match self {
            LookupError::NotFound | LookupError::DeveloperNotFound => true,
            LookupError::Fetch(e) => e.is_not_found(),
            LookupError::Parse(_) => false,
        }
    }
}

/// What to look up and where.
#[derive(Debug, Clone)]
pub struct LookupQuery {
    pub ids: Vec<String>,
    /// Query parameter the ids are sent as: `id` for track ids, `bundleId`
    /// for bundle identifiers.
    pub id_field: String,
    pub country: String,
    pub lang: Option<String>,
    /// Per-call throttle window.
    pub limit: Option<usize>,
}

impl LookupQuery {
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            id_field: "id".to_string(),
            country: "us".to_string(),
            lang: None,
            limit: None,
        }
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn lang(mut self, lang: Option<String>) -> Self {
        self.lang = lang;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<RawApp>,
}

/// Storefront header matching the queried country.
fn storefront_headers(country: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let front = format!("{}-1,29", store_id(Some(country)));
    if let Ok(value) = HeaderValue::from_str(&front) {
        headers.insert("x-apple-store-front", value);
    }
    headers
}

/// App metadata client on top of a shared [`Pipeline`].
#[derive(Clone)]
pub struct StoreClient {
    pipeline: Arc<Pipeline>,
    lookup_url: Url,
}

impl StoreClient {
    pub fn new(pipeline: Arc<Pipeline>, config: &StoreConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            pipeline,
            lookup_url: Url::parse(&config.lookup_url)?,
        })
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Lookup URL for `query`.
    pub fn lookup_url(&self, query: &LookupQuery) -> String {
        let mut url = self.lookup_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair(&query.id_field, &query.ids.join(","))
                .append_pair("country", &query.country)
                .append_pair("entity", "software");
            if let Some(lang) = &query.lang {
                pairs.append_pair("lang", lang);
            }
        }
        url.into()
    }

    /// Software records matching `query`, cleaned.
    pub async fn lookup(&self, query: &LookupQuery) -> Result<Vec<App>, LookupError> {
        let url = self.lookup_url(query);
        let body = self
            .pipeline
            .request(&url, storefront_headers(&query.country), RequestOptions::default(), query.limit)
            .await?;

        let response: LookupResponse = serde_json::from_str(&body)?;
        Ok(response
            .results
            .into_iter()
            .filter(RawApp::is_software)
            .map(clean_app)
            .collect())
    }

    /// A single app by track id (numeric) or bundle id.
    pub async fn app(
        &self,
        id: &str,
        country: Option<&str>,
        lang: Option<&str>,
    ) -> Result<App, LookupError> {
        let id_field = if id.bytes().all(|b| b.is_ascii_digit()) {
            "id"
        } else {
            "bundleId"
        };
        let query = LookupQuery::new([id])
            .id_field(id_field)
            .country(country.unwrap_or("us"))
            .lang(lang.map(str::to_string));

        self.lookup(&query)
            .await?
            .into_iter()
            .next()
            .ok_or(LookupError::NotFound)
    }

    /// Every app published under the developer (artist) id `dev_id`.
    pub async fn developer(
        &self,
        dev_id: &str,
        country: Option<&str>,
        lang: Option<&str>,
    ) -> Result<Vec<App>, LookupError> {
        let query = LookupQuery::new([dev_id])
            .country(country.unwrap_or("us"))
            .lang(lang.map(str::to_string));

        let apps = self.lookup(&query).await?;
        if apps.is_empty() {
            return Err(LookupError::DeveloperNotFound);
        }
        Ok(apps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::fallback::FallbackChain;
    use crate::upstream::testing::ScriptedTransport;
    use reqwest::StatusCode;

    const RESULTS: &str = r#"{
        "resultCount": 2,
        "results": [
            {"wrapperType": "artist", "artistId": 7},
            {"wrapperType": "software", "trackId": 42, "bundleId": "test.app", "price": 0}
        ]
    }"#;

    fn client(transport: std::sync::Arc<ScriptedTransport>) -> StoreClient {
        let pipeline = Pipeline::new(transport, FallbackChain::new(), PipelineConfig::default());
        StoreClient::new(Arc::new(pipeline), &StoreConfig::default()).unwrap()
    }

    #[test]
    fn test_lookup_url() {
        let store = client(ScriptedTransport::fixed(StatusCode::OK, "{}"));
        let query = LookupQuery::new(["1", "2"])
            .country("gb")
            .lang(Some("en_gb".into()));
        assert_eq!(
            store.lookup_url(&query),
            "https://itunes.apple.com/lookup?id=1%2C2&country=gb&entity=software&lang=en_gb"
        );
    }

    #[tokio::test]
    async fn test_lookup_filters_non_software() {
        let transport = ScriptedTransport::fixed(StatusCode::OK, RESULTS);
        let store = client(transport.clone());

        let apps = store.lookup(&LookupQuery::new(["42"])).await.unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, Some(42));
        assert_eq!(apps[0].free, Some(true));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_app_picks_id_field() {
        let transport = ScriptedTransport::fixed(StatusCode::OK, RESULTS);
        let store = client(transport.clone());

        store.app("test.app", None, None).await.unwrap();
        assert!(transport.seen()[0].request.url.contains("bundleId=test.app"));

        store.app("42", Some("jp"), None).await.unwrap();
        let seen = transport.seen()[1].request.clone();
        assert!(seen.url.contains("?id=42&country=jp"));
        assert_eq!(seen.headers["x-apple-store-front"], "143462-1,29");
    }

    #[tokio::test]
    async fn test_empty_results_not_found() {
        let store = client(ScriptedTransport::fixed(StatusCode::OK, r#"{"results":[]}"#));
        let err = store.app("1", None, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upstream_not_found_propagates() {
        let store = client(ScriptedTransport::fixed(StatusCode::NOT_FOUND, ""));
        let err = store.app("1", None, None).await.unwrap_err();
        assert!(matches!(err, LookupError::Fetch(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_developer_lists_software_only() {
        let transport = ScriptedTransport::fixed(StatusCode::OK, RESULTS);
        let store = client(transport.clone());

        let apps = store.developer("7", Some("gb"), None).await.unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].app_id.as_deref(), Some("test.app"));
        assert!(transport.seen()[0].request.url.contains("?id=7&country=gb&entity=software"));
    }

    #[tokio::test]
    async fn test_developer_without_apps_not_found() {
        let store = client(ScriptedTransport::fixed(
            StatusCode::OK,
            r#"{"results":[{"wrapperType":"artist","artistId":7}]}"#,
        ));
        let err = store.developer("7", None, None).await.unwrap_err();
        assert!(matches!(err, LookupError::DeveloperNotFound));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error() {
        let store = client(ScriptedTransport::fixed(StatusCode::OK, "<html>"));
        let err = store.lookup(&LookupQuery::new(["1"])).await.unwrap_err();
        assert!(matches!(err, LookupError::Parse(_)));
    }
}
