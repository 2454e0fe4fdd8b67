//! HTTP client for the user service.

use std::collections::BTreeMap;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl ClientError {
    /// Status code of a non-success response, if that is what this is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    #[serde(rename = "_links", default)]
    pub links: BTreeMap<String, Link>,
}

#[derive(Debug, Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

pub struct UserClient {
    client: Client,
    base_url: String,
}

impl UserClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_user(&self, email: &str) -> Result<UserResponse, ClientError> {
        let resp = self
            .client
            .post(format!("{}/users", self.base_url))
            .json(&EmailBody { email })
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Look a user up by email. A 404 is `Ok(None)`.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserResponse>, ClientError> {
        let resp = self
            .client
            .get(format!("{}/users", self.base_url))
            .query(&[("email", email)])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp).await?.json().await?))
    }

    pub async fn update_user_email(&self, id: u64, email: &str) -> Result<UserResponse, ClientError> {
        let resp = self
            .client
            .put(format!("{}/users/{}/email", self.base_url, id))
            .json(&EmailBody { email })
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn delete_user(&self, id: u64) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(format!("{}/users/{}", self.base_url, id))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}
