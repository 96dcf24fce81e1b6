//! vSphere API client
//!
//! Implements the vSphere Automation REST API client.
//! Based on the API structure: /api/session and /api/vcenter/vm/{vm}

use crate::error::VsphereError;
use crate::models::*;
use crate::vsphere_trait::VsphereClientTrait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Header carrying the session token on every authenticated request
const SESSION_HEADER: &str = "vmware-api-session-id";

const SESSION_PATH: &str = "/api/session";

/// vSphere API client
pub struct VsphereClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    poll_interval: Duration,
    session: RwLock<Option<String>>,
}

impl std::fmt::Debug for VsphereClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VsphereClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl VsphereClient {
    /// Create a new vSphere client
    ///
    /// # Arguments
    /// * `base_url` - vCenter base URL (e.g., "https://vcenter.lab.local")
    /// * `username` - SSO user name
    /// * `password` - SSO password
    /// * `insecure` - Accept self-signed vCenter certificates
    /// * `poll_interval` - Interval between guest identity reads in `wait_for_ip`
    pub fn new(
        base_url: String,
        username: String,
        password: String,
        insecure: bool,
        poll_interval: Duration,
    ) -> Result<Self, VsphereError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(VsphereError::Http)?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&base_url),
            username,
            password,
            poll_interval,
            session: RwLock::new(None),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn session_id(&self) -> Result<String, VsphereError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| VsphereError::Authentication("no active session, login first".to_string()))
    }

    /// Make an authenticated GET request and return the raw response
    async fn get_response(&self, path: &str) -> Result<Response, VsphereError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let session_id = self.session_id().await?;
        let response = self
            .client
            .get(&url)
            .header(SESSION_HEADER, session_id)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(VsphereError::Http)?;

        Ok(response)
    }

    /// Map a non-success response to an error
    async fn error_for(method: &str, path: &str, response: Response) -> VsphereError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = ApiErrorBody::describe(&body);

        match status {
            StatusCode::NOT_FOUND => VsphereError::NotFound(format!("{} - {}", path, detail)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                VsphereError::Authentication(format!("{} {} rejected: {} - {}", method, path, status, detail))
            }
            _ => VsphereError::Api(format!("{} {} failed: {} - {}", method, path, status, detail)),
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn vm_path(vm: &VmRef) -> Result<String, VsphereError> {
    if vm.type_tag != VIRTUAL_MACHINE_TYPE {
        return Err(VsphereError::InvalidRequest(format!(
            "unsupported managed object type {}",
            vm.type_tag
        )));
    }
    if vm.value.is_empty() {
        return Err(VsphereError::InvalidRequest("empty managed object id".to_string()));
    }
    Ok(format!("/api/vcenter/vm/{}", urlencoding::encode(&vm.value)))
}

#[async_trait::async_trait]
impl VsphereClientTrait for VsphereClient {
    fn server(&self) -> &str {
        &self.base_url
    }

    /// Log in with basic auth and keep the returned session token.
    async fn login(&self) -> Result<(), VsphereError> {
        let url = self.build_url(SESSION_PATH);
        debug!("Creating vSphere session at {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(VsphereError::Authentication(format!(
                "login as {} rejected: {} - {}",
                self.username,
                status,
                ApiErrorBody::describe(&body)
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VsphereError::Api(format!(
                "login failed: {} - {}",
                status,
                ApiErrorBody::describe(&body)
            )));
        }

        // The body is a bare JSON string
        let body = response.text().await?;
        let token: String = serde_json::from_str(&body)?;
        *self.session.write().await = Some(token);

        debug!("vSphere session established");
        Ok(())
    }

    /// Delete the server-side session. A no-op when not logged in.
    async fn logout(&self) -> Result<(), VsphereError> {
        let Some(session_id) = self.session.write().await.take() else {
            return Ok(());
        };

        let url = self.build_url(SESSION_PATH);
        debug!("Deleting vSphere session at {}", url);

        let response = self
            .client
            .delete(&url)
            .header(SESSION_HEADER, session_id)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        // Already expired on the server side
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::error_for("DELETE", SESSION_PATH, response).await)
    }

    async fn retrieve_vm(&self, vm: &VmRef) -> Result<VmInfo, VsphereError> {
        let path = vm_path(vm)?;
        let response = self.get_response(&path).await?;
        if !response.status().is_success() {
            return Err(Self::error_for("GET", &path, response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            VsphereError::Api(format!(
                "error decoding VM {}: {} - Response (first 500 chars): {}",
                vm,
                e,
                body.chars().take(500).collect::<String>()
            ))
        })
    }

    async fn guest_identity(&self, vm: &VmRef) -> Result<Option<GuestIdentity>, VsphereError> {
        let path = format!("{}/guest/identity", vm_path(vm)?);
        let response = self.get_response(&path).await?;

        // VMware Tools not running (yet): nothing to report. The VM itself was
        // already read, so a 404 here is the same condition.
        if matches!(response.status(), StatusCode::SERVICE_UNAVAILABLE | StatusCode::NOT_FOUND) {
            debug!("Guest identity for {} not available yet", vm);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_for("GET", &path, response).await);
        }

        let identity: GuestIdentity = response.json().await?;
        Ok(Some(identity))
    }

    /// Polls the guest identity every `poll_interval` until an address shows up.
    async fn wait_for_ip(&self, vm: &VmRef) -> Result<String, VsphereError> {
        loop {
            if let Some(identity) = self.guest_identity(vm).await? {
                if let Some(ip) = identity.ip() {
                    debug!("Guest {} reported IP {}", vm, ip);
                    return Ok(ip.to_string());
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
