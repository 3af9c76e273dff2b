//! JSON-over-HTTP implementation of [`CameraApi`].

use super::wire::{decode_reply, ConnectReply, DiscoveryReply, SettingReply, StatusReply};
use super::{ActiveSessionStatus, CameraApi, CaptureReply, RemoteError};
use crate::camera::{CameraDescriptor, CameraSetting, SettingValue};
use crate::config::{ConfigError, ServiceConfig};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::IgnoredAny;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Service routes, relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET` camera discovery.
    Detect,
    /// `POST` session open.
    Connect,
    /// `POST` session close.
    Disconnect,
    /// `POST` capture.
    Capture,
    /// `POST` setting write.
    SetSetting,
    /// `GET` setting read.
    GetSetting,
    /// `GET` open sessions.
    Status,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Detect => "api/usb/cameras/detect/",
            Endpoint::Connect => "api/usb/cameras/connect/",
            Endpoint::Disconnect => "api/usb/cameras/disconnect/",
            Endpoint::Capture => "api/usb/cameras/capture/",
            Endpoint::SetSetting => "api/usb/cameras/setting/set/",
            Endpoint::GetSetting => "api/usb/cameras/setting/get/",
            Endpoint::Status => "api/usb/cameras/status/",
        }
    }
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    camera_id: &'a str,
    evento_id: Option<&'a str>,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    session_id: &'a str,
}

#[derive(Serialize)]
struct SetSettingRequest<'a> {
    session_id: &'a str,
    setting_name: &'a str,
    setting_value: &'a SettingValue,
}

/// Talks to the camera service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCameraApi {
    client: Client,
    base_url: Url,
}

impl HttpCameraApi {
    /// Creates a client for the service rooted at `base_url`.
    ///
    /// Without a timeout, requests wait as long as the service takes.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let mut base = base_url.to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| ConfigError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Creates a client from the `[service]` configuration section.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ConfigError> {
        Self::new(
            &config.base_url,
            config.request_timeout_ms.map(Duration::from_millis),
        )
    }

    /// Absolute URL of an endpoint.
    pub fn endpoint(&self, endpoint: Endpoint) -> Url {
        // Paths are static and relative, so joining onto a valid base cannot fail.
        self.base_url
            .join(endpoint.path())
            .unwrap_or_else(|_| self.base_url.clone())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, RemoteError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                RemoteError::Transport(format!("malformed response: {e}"))
            } else {
                RemoteError::Transport(format!("unexpected HTTP status {status}"))
            }
        })
    }

    async fn get(&self, endpoint: Endpoint) -> Result<Value, RemoteError> {
        let url = self.endpoint(endpoint);
        tracing::debug!(%url, "GET");
        self.send(self.client.get(url)).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<Value, RemoteError> {
        let url = self.endpoint(endpoint);
        tracing::debug!(%url, "POST");
        self.send(self.client.post(url).json(body)).await
    }
}

#[async_trait]
impl CameraApi for HttpCameraApi {
    async fn discover(&self) -> Result<Vec<CameraDescriptor>, RemoteError> {
        let reply: DiscoveryReply = decode_reply(self.get(Endpoint::Detect).await?)?;
        if let Some(count) = reply.count {
            if count != reply.cameras.len() {
                tracing::debug!(
                    count,
                    listed = reply.cameras.len(),
                    "discovery count disagrees with camera list"
                );
            }
        }
        Ok(reply.cameras)
    }

    async fn connect(
        &self,
        camera_id: &str,
        event_context: Option<&str>,
    ) -> Result<ConnectReply, RemoteError> {
        let body = ConnectRequest {
            camera_id,
            evento_id: event_context,
        };
        decode_reply(self.post(Endpoint::Connect, &body).await?)
    }

    async fn disconnect(&self, session_id: &str) -> Result<(), RemoteError> {
        let body = SessionRequest { session_id };
        decode_reply::<IgnoredAny>(self.post(Endpoint::Disconnect, &body).await?)?;
        Ok(())
    }

    async fn capture(&self, session_id: &str) -> Result<CaptureReply, RemoteError> {
        let body = SessionRequest { session_id };
        let payload: Value = decode_reply(self.post(Endpoint::Capture, &body).await?)?;
        Ok(CaptureReply::from_body(payload))
    }

    async fn set_setting(
        &self,
        session_id: &str,
        setting: CameraSetting,
        value: &SettingValue,
    ) -> Result<(), RemoteError> {
        let body = SetSettingRequest {
            session_id,
            setting_name: setting.as_str(),
            setting_value: value,
        };
        decode_reply::<IgnoredAny>(self.post(Endpoint::SetSetting, &body).await?)?;
        Ok(())
    }

    async fn get_setting(
        &self,
        session_id: &str,
        setting: CameraSetting,
    ) -> Result<SettingValue, RemoteError> {
        let url = self.endpoint(Endpoint::GetSetting);
        tracing::debug!(%url, setting = %setting, "GET");
        let request = self
            .client
            .get(url)
            .query(&[("session_id", session_id), ("setting_name", setting.as_str())]);
        let reply: SettingReply = decode_reply(self.send(request).await?)?;
        Ok(reply.value)
    }

    async fn status(&self) -> Result<Vec<ActiveSessionStatus>, RemoteError> {
        let reply: StatusReply = decode_reply(self.get(Endpoint::Status).await?)?;
        Ok(reply.active_sessions)
    }
}
