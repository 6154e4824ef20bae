//! PostgREST record client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{RestBackend, record_api_error, retry_after};
use crate::backend::{AccessTokenProvider, BackendError, Collection, DataService, Filter, Query};

/// [`DataService`] over the PostgREST API.
#[derive(Clone)]
pub struct RestDataService {
    backend: RestBackend,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
}

impl RestDataService {
    pub(super) fn new(backend: RestBackend, tokens: Option<Arc<dyn AccessTokenProvider>>) -> Self {
        Self { backend, tokens }
    }

    /// Send one request to `/rest/v1/{table}` and return the affected rows.
    #[instrument(skip(self, params, body), fields(collection = %collection, method = %method))]
    async fn execute(
        &self,
        method: Method,
        collection: Collection,
        params: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<Vec<Value>, BackendError> {
        let mut url = self.backend.endpoint(&["rest", "v1", collection.table()])?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        let user_token = match &self.tokens {
            Some(tokens) => tokens.access_token().await,
            None => None,
        };
        let bearer = user_token
            .as_ref()
            .map_or_else(|| self.backend.anon_key(), |token| token.expose_secret());

        let mut request = self
            .backend
            .http()
            .request(method, url)
            .header("apikey", self.backend.anon_key())
            .header("Authorization", format!("Bearer {bearer}"))
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited(retry_after(&response)));
        }

        let text = response.text().await?;

        // Check for unauthorized
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized(
                record_api_error(status.as_u16(), &text).to_string(),
            ));
        }

        if !status.is_success() {
            return Err(record_api_error(status.as_u16(), &text));
        }

        let rows = parse_rows(&text)?;
        debug!(rows = rows.len(), "Record request completed");
        Ok(rows)
    }
}

/// Successful bodies are an array of rows, a single object, or empty.
fn parse_rows(text: &str) -> Result<Vec<Value>, BackendError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        row => Ok(vec![row]),
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_param).collect()
}

#[async_trait]
impl DataService for RestDataService {
    async fn insert(
        &self,
        collection: Collection,
        records: Vec<Value>,
    ) -> Result<Vec<Value>, BackendError> {
        self.execute(
            Method::POST,
            collection,
            vec![("select".to_string(), "*".to_string())],
            Some(Value::Array(records)),
        )
        .await
    }

    async fn update(
        &self,
        collection: Collection,
        filters: &[Filter],
        fields: Value,
    ) -> Result<Vec<Value>, BackendError> {
        if filters.is_empty() {
            return Err(BackendError::InvalidQuery(
                "refusing to update without filters".to_string(),
            ));
        }
        self.execute(
            Method::PATCH,
            collection,
            filter_params(filters),
            Some(fields),
        )
        .await
    }

    async fn select(
        &self,
        collection: Collection,
        query: &Query,
    ) -> Result<Vec<Value>, BackendError> {
        self.execute(Method::GET, collection, query.to_params(), None)
            .await
    }

    async fn delete(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, BackendError> {
        if filters.is_empty() {
            return Err(BackendError::InvalidQuery(
                "refusing to delete without filters".to_string(),
            ));
        }
        self.execute(Method::DELETE, collection, filter_params(filters), None)
            .await
    }
}
