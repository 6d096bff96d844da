use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::client::{decode_snapshot, Endpoint, PositionUpdate, SyncError, Transport};
use crate::core::chat::ChatMessage;
use crate::core::registry::RemoteSnapshot;
use crate::core::session::SessionIdentity;

/// `Transport` over plain HTTP against the plaza server.
///
/// The server tells sessions apart by cookie, so the client keeps a cookie
/// store for its whole lifetime.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: Url) -> reqwest::Result<Self> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, endpoint: Endpoint) -> Url {
        let mut url = self.base.clone();
        url.set_path(endpoint.path());
        url
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, SyncError> {
        trace!(%endpoint, "request");
        let response = request
            .send()
            .await
            .map_err(|source| SyncError::Transport { endpoint, source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn body(&self, endpoint: Endpoint, response: Response) -> Result<String, SyncError> {
        response
            .text()
            .await
            .map_err(|source| SyncError::Transport { endpoint, source })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, SyncError> {
        let response = self.send(endpoint, self.client.get(self.url(endpoint))).await?;
        let body = self.body(endpoint, response).await?;
        serde_json::from_str(&body).map_err(|source| SyncError::Decode { endpoint, source })
    }

    async fn post_form<F: serde::Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        form: &F,
    ) -> Result<(), SyncError> {
        let request = self.client.post(self.url(endpoint)).form(form);
        self.send(endpoint, request).await.map(|_| ())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_session(&self) -> Result<SessionIdentity, SyncError> {
        // Only the cookie matters here; /api/session decides success.
        let landing = Endpoint::Landing;
        if let Err(error) = self.send(landing, self.client.get(self.url(landing))).await {
            debug!(%error, "landing visit failed; asking for the session anyway");
        }
        self.get_json(Endpoint::Session).await
    }

    async fn fetch_positions(&self) -> Result<RemoteSnapshot, SyncError> {
        let endpoint = Endpoint::PullPositions;
        let response = self.send(endpoint, self.client.get(self.url(endpoint))).await?;
        let body = self.body(endpoint, response).await?;
        decode_snapshot(&body).map_err(|source| SyncError::Decode { endpoint, source })
    }

    async fn push_position(&self, update: PositionUpdate) -> Result<(), SyncError> {
        self.post_form(Endpoint::PushPosition, &update).await
    }

    async fn fetch_messages(&self) -> Result<Vec<ChatMessage>, SyncError> {
        self.get_json(Endpoint::PullMessages).await
    }

    async fn post_message(&self, message: ChatMessage) -> Result<(), SyncError> {
        self.post_form(Endpoint::PostMessage, &message).await
    }

    async fn clear_messages(&self) -> Result<(), SyncError> {
        let endpoint = Endpoint::ClearMessages;
        self.send(endpoint, self.client.post(self.url(endpoint)))
            .await
            .map(|_| ())
    }
}
