//! Keyhole API client with transparent access-token refresh.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ApiFailure, ClientError};
use crate::models::{
    ErrorBody, HealthStatus, LoginRequest, LoginResponse, MessageResponse, ProfileResponse,
    RefreshResponse, RegisterRequest, RegisterResponse, UserProfile,
};
use crate::session::{Session, SessionStore};

pub struct AuthClient {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn SessionStore>,
}

impl AuthClient {
    pub fn new(base_url: &str, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            store,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The stored session, if any.
    pub fn session(&self) -> Result<Option<Session>, ClientError> {
        self.store.load()
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let resp = self
            .http
            .post(self.url("api/auth/register")?)
            .json(&RegisterRequest {
                username,
                email,
                password,
            })
            .send()
            .await?;
        let body: RegisterResponse = handle_response(resp).await?;
        info!(user_id = body.user.id, "registered");
        Ok(body.user)
    }

    /// Log in and store the new session, replacing any previous one.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let resp = self
            .http
            .post(self.url("api/auth/login")?)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let body: LoginResponse = handle_response(resp).await?;
        self.store.save(&Session {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            user: body.user.clone(),
        })?;
        info!(user_id = body.user.id, "logged in");
        Ok(body.user)
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let body: ProfileResponse = self.authorized(Method::GET, "api/auth/profile").await?;
        Ok(body.user)
    }

    /// Log out on the server, then clear local session data whatever the
    /// server said. An expired session counts as logged out.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self
            .authorized::<MessageResponse>(Method::POST, "api/auth/logout")
            .await;
        self.store.clear()?;
        match result {
            Ok(body) => {
                debug!(message = %body.message, "logged out");
                Ok(())
            }
            Err(ClientError::SessionExpired) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Server health. A degraded server answers 503 with the same body.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let resp = self.http.get(self.url("health")?).send().await?;
        if resp.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(resp.json().await?);
        }
        handle_response(resp).await
    }

    /// Send with the stored access token. On `token_expired`, refresh once
    /// and replay once; the replay's outcome is final.
    async fn authorized<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ClientError> {
        let session = self.store.load()?.ok_or(ClientError::NotLoggedIn)?;
        let mut access_token = session.access_token.clone();
        let mut retried = false;
        loop {
            match self.dispatch(method.clone(), path, &access_token).await {
                Err(ClientError::Api(failure)) if failure.needs_refresh() && !retried => {
                    debug!(path, "access token rejected, refreshing");
                    retried = true;
                    access_token = self.exchange_refresh(&session).await?;
                }
                result => return result,
            }
        }
    }

    async fn dispatch<T: DeserializeOwned>(&self, method: Method, path: &str, token: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .request(method, self.url(path)?)
            .bearer_auth(token)
            .send()
            .await?;
        handle_response(resp).await
    }

    /// Trade the refresh token for a new access token and store it. Any
    /// failure ends the session.
    async fn exchange_refresh(&self, session: &Session) -> Result<String, ClientError> {
        match self
            .dispatch::<RefreshResponse>(Method::POST, "api/auth/refresh", &session.refresh_token)
            .await
        {
            Ok(body) => {
                self.store.save(&Session {
                    access_token: body.access_token.clone(),
                    ..session.clone()
                })?;
                Ok(body.access_token)
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, clearing session");
                self.store.clear()?;
                Err(ClientError::SessionExpired)
            }
        }
    }
}

async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let text = resp.text().await.unwrap_or_default();
    let failure = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ApiFailure {
            status: status.as_u16(),
            error: body.error,
            message: body.message,
        },
        Err(_) => ApiFailure {
            status: status.as_u16(),
            error: status
                .canonical_reason()
                .unwrap_or("unknown")
                .to_lowercase()
                .replace(' ', "_"),
            message: text,
        },
    };
    Err(ClientError::Api(failure))
}
