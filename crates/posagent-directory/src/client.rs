// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Auth/printer-directory HTTP client.
//
//   POST {base_url}/auth/login      {password}        -> {access_token}
//   GET  {base_url}/printers/       Bearer <token>    -> [{name, type, connection_data}]
//   GET  {base_url}/auth/rabbitmq   Bearer <token>    -> {url, queue_name}
//
// Every call is a single best-effort attempt. The only retry is one re-login
// when the printers endpoint rejects a cached token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use posagent_core::error::{AgentError, Result};
use posagent_core::types::{BrokerEndpoint, PrinterProfile};

use crate::cache::PrinterSource;

/// Timeout for each directory request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct LoginRequest<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Client for the directory service. Caches the access token between calls.
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl DirectoryClient {
    pub fn new(base_url: &str, password: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgentError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            password: password.to_string(),
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and cache the access token.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn login(&self) -> Result<String> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| AgentError::Authentication(format!("login request: {e}")))?
            .error_for_status()
            .map_err(|e| AgentError::Authentication(format!("login rejected: {e}")))?;

        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Authentication(format!("login response: {e}")))?;

        *self.token.lock().await = Some(body.access_token.clone());
        info!("logged in to printer directory");
        Ok(body.access_token)
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = self.token.lock().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    /// Broker URL and queue name published by the directory service.
    #[instrument(skip(self))]
    pub async fn broker_endpoint(&self) -> Result<BrokerEndpoint> {
        let token = self.token().await?;
        let endpoint: BrokerEndpoint = self
            .http
            .get(self.url("/auth/rabbitmq"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AgentError::Configuration(format!("broker info request: {e}")))?
            .error_for_status()
            .map_err(|e| AgentError::Configuration(format!("broker info rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AgentError::Configuration(format!("broker info response: {e}")))?;

        info!(queue = %endpoint.queue_name, "broker endpoint fetched from directory");
        Ok(endpoint)
    }

    /// One `GET /printers/`. `Ok(None)` means the token was rejected.
    async fn get_printers(&self, token: &str) -> Result<Option<Vec<PrinterProfile>>> {
        let resp = self
            .http
            .get(self.url("/printers/"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AgentError::DirectoryFetch(format!("printers request: {e}")))?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        let entries = resp
            .error_for_status()
            .map_err(|e| AgentError::DirectoryFetch(format!("printers rejected: {e}")))?
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|e| AgentError::DirectoryFetch(format!("printers response: {e}")))?;
        Ok(Some(parse_entries(entries)))
    }
}

/// Convert directory entries one at a time. An entry without a usable name
/// is skipped with a warning and the rest still load.
fn parse_entries(entries: Vec<serde_json::Value>) -> Vec<PrinterProfile> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<PrinterProfile>(entry) {
            Ok(profile) if !profile.name.trim().is_empty() => Some(profile),
            Ok(_) => {
                warn!(index, "directory entry has an empty name; skipped");
                None
            }
            Err(e) => {
                warn!(index, error = %e, "unreadable directory entry; skipped");
                None
            }
        })
        .collect()
}

#[async_trait]
impl PrinterSource for DirectoryClient {
    async fn fetch_printers(&self) -> Result<Vec<PrinterProfile>> {
        let token = self
            .token()
            .await
            .map_err(|e| AgentError::DirectoryFetch(e.to_string()))?;

        if let Some(printers) = self.get_printers(&token).await? {
            debug!(count = printers.len(), "printers fetched");
            return Ok(printers);
        }

        warn!("directory rejected access token; logging in again");
        *self.token.lock().await = None;
        let token = self
            .login()
            .await
            .map_err(|e| AgentError::DirectoryFetch(e.to_string()))?;

        self.get_printers(&token)
            .await?
            .ok_or_else(|| AgentError::DirectoryFetch("token rejected after re-login".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    const PRINTERS: &str = r#"[
        {"name": "counter-1", "type": "network", "connection_data": {"ip_address": "10.0.0.5"}},
        {"name": "kitchen", "type": "bluetooth", "connection_data": {"mac_address": "AA:BB:CC:DD:EE:FF"}}
    ]"#;

    async fn login_mock(server: &mut ServerGuard, token: &str, hits: usize) -> mockito::Mock {
        server
            .mock("POST", "/auth/login")
            .match_body(Matcher::Json(serde_json::json!({"password": "s3cret"})))
            .expect(hits)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"access_token": "{token}"}}"#))
            .create_async()
            .await
    }

    #[tokio::test]
    async fn login_then_fetch_printers() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server, "tok-1", 1).await;
        let printers = server
            .mock("GET", "/printers/")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PRINTERS)
            .create_async()
            .await;

        let client = DirectoryClient::new(&server.url(), "s3cret").expect("client");
        assert_eq!(client.login().await.expect("login"), "tok-1");

        let fetched = client.fetch_printers().await.expect("fetch");
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[1].kind, "bluetooth");

        login.assert_async().await;
        printers.assert_async().await;
    }

    #[tokio::test]
    async fn wrong_password_is_authentication_error() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"detail": "bad password"}"#)
            .create_async()
            .await;

        let client = DirectoryClient::new(&server.url(), "wrong").expect("client");
        let err = client.login().await.expect_err("login fails");
        assert!(matches!(err, AgentError::Authentication(_)));
    }

    #[tokio::test]
    async fn stale_token_is_replaced_by_one_relogin() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server, "tok-2", 1).await;
        let rejected = server
            .mock("GET", "/printers/")
            .match_header("authorization", "Bearer stale")
            .with_status(401)
            .create_async()
            .await;
        let accepted = server
            .mock("GET", "/printers/")
            .match_header("authorization", "Bearer tok-2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PRINTERS)
            .create_async()
            .await;

        let client = DirectoryClient::new(&server.url(), "s3cret").expect("client");
        *client.token.lock().await = Some("stale".into());

        let fetched = client.fetch_printers().await.expect("fetch after re-login");
        assert_eq!(fetched.len(), 2);

        login.assert_async().await;
        rejected.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn relogin_happens_at_most_once_per_fetch() {
        let mut server = Server::new_async().await;
        let login = login_mock(&mut server, "tok-1", 2).await;
        let printers = server
            .mock("GET", "/printers/")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;

        let client = DirectoryClient::new(&server.url(), "s3cret").expect("client");
        client.login().await.expect("login");

        let err = client.fetch_printers().await.expect_err("token never accepted");
        assert!(matches!(err, AgentError::DirectoryFetch(_)));

        login.assert_async().await;
        printers.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_directory_fetch_error() {
        let mut server = Server::new_async().await;
        let _login = login_mock(&mut server, "tok", 1).await;
        let _printers = server
            .mock("GET", "/printers/")
            .with_status(503)
            .create_async()
            .await;

        let client = DirectoryClient::new(&server.url(), "s3cret").expect("client");
        let err = client.fetch_printers().await.expect_err("503");
        assert!(matches!(err, AgentError::DirectoryFetch(_)));
    }

    #[tokio::test]
    async fn bad_entry_does_not_hide_the_rest_of_the_directory() {
        let mut server = Server::new_async().await;
        let _login = login_mock(&mut server, "tok", 1).await;
        let _printers = server
            .mock("GET", "/printers/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"name": "counter-1", "type": "network", "connection_data": {"ip_address": "10.0.0.5"}},
                    {"type": "usb", "connection_data": {"vendor_id": "0x0416"}},
                    {"name": "  ", "type": "network"},
                    {"name": "half-set-up", "connection_data": null}
                ]"#,
            )
            .create_async()
            .await;

        let client = DirectoryClient::new(&server.url(), "s3cret").expect("client");
        let fetched = client.fetch_printers().await.expect("fetch");

        let names: Vec<&str> = fetched.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["counter-1", "half-set-up"]);
        assert_eq!(fetched[0].connection_str("ip_address"), Some("10.0.0.5"));
        assert!(fetched[1].transport_kind().is_none());
    }

    #[tokio::test]
    async fn broker_endpoint_from_directory() {
        let mut server = Server::new_async().await;
        let _login = login_mock(&mut server, "tok", 1).await;
        let _broker = server
            .mock("GET", "/auth/rabbitmq")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"url": "amqp://agent:pw@mq.local:5672/%2f", "queue_name": "store-42"}"#)
            .create_async()
            .await;

        let client = DirectoryClient::new(&format!("{}/", server.url()), "s3cret").expect("client");
        let endpoint = client.broker_endpoint().await.expect("endpoint");
        assert_eq!(endpoint.queue_name, "store-42");
    }
}
