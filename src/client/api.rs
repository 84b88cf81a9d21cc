use std::sync::Arc;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::config::ClientConfig;
use super::error::ClientError;
use super::token_store::TokenStore;

/// HTTP access to the gateway. Every response goes through one decoding path
/// so transport, format and domain failures are classified the same way.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl GatewayClient {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        self.execute(self.http.get(self.url(path)).query(query)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.http.post(self.url(path)).json(body)).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.http.patch(self.url(path)).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.http.delete(self.url(path))).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match self.tokens.load() {
            Some(session) => request.bearer_auth(session.token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Gateway responded");

        decode_body(status.as_u16(), &body)
    }
}

pub(crate) fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    let json: JsonValue =
        serde_json::from_str(body).map_err(|_| ClientError::UnexpectedResponse { status })?;

    let message = json
        .get("error")
        .or_else(|| json.get("message"))
        .and_then(JsonValue::as_str)
        .map(str::to_string);

    if !(200..300).contains(&status) {
        return Err(match message {
            Some(message) => ClientError::Domain { status, message },
            None => ClientError::UnexpectedResponse { status },
        });
    }

    if json.get("success").and_then(JsonValue::as_bool) == Some(false) {
        return Err(ClientError::Domain {
            status,
            message: message.unwrap_or_else(|| "Request failed".to_string()),
        });
    }

    serde_json::from_value(json).map_err(|_| ClientError::UnexpectedResponse { status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::job_dto::Acknowledgement;

    #[test]
    fn html_body_is_an_unexpected_response() {
        let result = decode_body::<Acknowledgement>(200, "<html>oops</html>");
        assert_eq!(result.unwrap_err(), ClientError::UnexpectedResponse { status: 200 });
    }

    #[test]
    fn structured_error_is_surfaced_verbatim() {
        let result = decode_body::<Acknowledgement>(400, r#"{"error":"Email is already registered"}"#);
        let err = result.unwrap_err();
        assert_eq!(err.user_message(), "Email is already registered");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn error_status_without_message_is_generic() {
        let err = decode_body::<Acknowledgement>(500, r#"{"detail":[1,2]}"#).unwrap_err();
        assert_eq!(err, ClientError::UnexpectedResponse { status: 500 });
        assert_eq!(err.user_message(), "Unexpected server response");
    }

    #[test]
    fn success_false_is_a_domain_error() {
        let err = decode_body::<Acknowledgement>(200, r#"{"success":false,"message":"Nope"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Domain {
                status: 200,
                message: "Nope".into()
            }
        );
    }
}
