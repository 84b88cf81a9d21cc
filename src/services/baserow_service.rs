use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::baserow::RowPage;

const PAGE_SIZE: u32 = 200;

/// A `filter__<field>__<kind>=<value>` query parameter.
#[derive(Debug, Clone)]
pub struct RowFilter {
    field: String,
    kind: &'static str,
    value: String,
}

impl RowFilter {
    pub fn equal(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            kind: "equal",
            value: value.to_string(),
        }
    }

    pub fn link_row_has(field: &str, row_id: i64) -> Self {
        Self {
            field: field.to_string(),
            kind: "link_row_has",
            value: row_id.to_string(),
        }
    }

    fn as_param(&self) -> (String, String) {
        (
            format!("filter__{}__{}", self.field, self.kind),
            self.value.clone(),
        )
    }
}

#[derive(Clone)]
pub struct BaserowService {
    client: Client,
    base_url: String,
    token: String,
}

impl BaserowService {
    pub fn new(base_url: String, token: String, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn rows_url(&self, table_id: u64) -> String {
        format!("{}/api/database/rows/table/{}/", self.base_url, table_id)
    }

    fn row_url(&self, table_id: u64, row_id: i64) -> String {
        format!(
            "{}/api/database/rows/table/{}/{}/",
            self.base_url, table_id, row_id
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token))
            .query(&[("user_field_names", "true")])
    }

    #[instrument(skip(self, filters), fields(filters = filters.len()))]
    pub async fn list_rows<T: DeserializeOwned>(
        &self,
        table_id: u64,
        filters: &[RowFilter],
    ) -> Result<Vec<T>> {
        let params: Vec<(String, String)> = filters.iter().map(RowFilter::as_param).collect();
        let mut rows = Vec::new();
        let mut page = 1u32;

        loop {
            let request = self
                .authorized(self.client.get(self.rows_url(table_id)))
                .query(&params)
                .query(&[("size", PAGE_SIZE), ("page", page)]);
            let batch: RowPage<T> = Self::read_json(request.send().await?).await?;
            let has_next = batch.next.is_some();
            rows.extend(batch.results);
            if !has_next {
                break;
            }
            page += 1;
        }

        debug!(count = rows.len(), "Fetched Baserow rows");
        Ok(rows)
    }

    /// First row matching all filters, if any.
    pub async fn find_row<T: DeserializeOwned>(
        &self,
        table_id: u64,
        filters: &[RowFilter],
    ) -> Result<Option<T>> {
        let params: Vec<(String, String)> = filters.iter().map(RowFilter::as_param).collect();
        let request = self
            .authorized(self.client.get(self.rows_url(table_id)))
            .query(&params)
            .query(&[("size", 1u32)]);
        let page: RowPage<T> = Self::read_json(request.send().await?).await?;
        Ok(page.results.into_iter().next())
    }

    #[instrument(skip(self))]
    pub async fn get_row<T: DeserializeOwned>(&self, table_id: u64, row_id: i64) -> Result<T> {
        let request = self.authorized(self.client.get(self.row_url(table_id, row_id)));
        Self::read_json(request.send().await?).await
    }

    #[instrument(skip(self, fields))]
    pub async fn create_row<T, B>(&self, table_id: u64, fields: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self
            .authorized(self.client.post(self.rows_url(table_id)))
            .json(fields);
        Self::read_json(request.send().await?).await
    }

    #[instrument(skip(self, fields))]
    pub async fn update_row<T, B>(&self, table_id: u64, row_id: i64, fields: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self
            .authorized(self.client.patch(self.row_url(table_id, row_id)))
            .json(fields);
        Self::read_json(request.send().await?).await
    }

    #[instrument(skip(self))]
    pub async fn delete_row(&self, table_id: u64, row_id: i64) -> Result<()> {
        let request = self.authorized(self.client.delete(self.row_url(table_id, row_id)));
        let response = request.send().await?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<JsonValue>(&body)
            .ok()
            .and_then(|json| {
                json.get("detail")
                    .or_else(|| json.get("error"))
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            })
            .unwrap_or_else(|| format!("Baserow responded with {}", status));

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(message));
        }
        Err(Error::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, serde::Deserialize)]
    struct Row {
        id: i64,
    }

    fn service(server: &MockServer) -> BaserowService {
        BaserowService::new(server.uri(), "tkn".into(), Client::new())
    }

    #[tokio::test]
    async fn list_rows_follows_pagination_with_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/database/rows/table/10/"))
            .and(header("Authorization", "Token tkn"))
            .and(query_param("filter__usuario__link_row_has", "3"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "next": "http://baserow/next",
                "results": [{ "id": 1 }, { "id": 2 }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/database/rows/table/10/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "next": null,
                "results": [{ "id": 3 }]
            })))
            .mount(&server)
            .await;

        let rows: Vec<Row> = service(&server)
            .list_rows(10, &[RowFilter::link_row_has("usuario", 3)])
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn missing_row_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/database/rows/table/10/99/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "ERROR_ROW_DOES_NOT_EXIST",
                "detail": "The row 99 does not exist."
            })))
            .mount(&server)
            .await;

        let result = service(&server).get_row::<Row>(10, 99).await;
        match result {
            Err(Error::NotFound(message)) => assert_eq!(message, "The row 99 does not exist."),
            other => panic!("unexpected result: {:?}", other.map(|r| r.id)),
        }
    }

    #[tokio::test]
    async fn server_errors_become_upstream_errors() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/database/rows/table/10/4/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = service(&server).delete_row(10, 4).await;
        assert!(matches!(result, Err(Error::Upstream { status: 500, .. })));
    }
}
