use std::{str::FromStr, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize};

use super::{Ack, Backend, BackendFailure, BackendResult};
use crate::{config::BackendConfig, telemetry::TelemetrySample};

/// Response body shared by every `/api` route.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Greeting {
    message: String,
}

/// HTTP client for the vehicle-control backend.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let mut base_url =
            reqwest::Url::from_str(&config.address).context("invalid backend url")?;

        // endpoints are joined relative to the base, so keep any path prefix
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();

        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(BackendClient {
            http: builder.build().context("failed to create http client")?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    async fn send(&self, method: Method, path: &str) -> BackendResult<reqwest::Response> {
        let endpoint = self.base_url.join(path).map_err(|err| {
            BackendFailure::Network(format!("could not create url for {}: {}", path, err))
        })?;

        trace!("{} {}", method, endpoint);

        self.http
            .request(method, endpoint)
            .send()
            .await
            .map_err(|err| BackendFailure::Network(err.to_string()))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> BackendResult<Envelope<T>> {
        let res = self.send(method, path).await?;
        let http_status = res.status();
        let body = res.json::<Envelope<T>>().await;

        match body {
            Ok(body) if http_status.is_success() && body.status.as_deref() == Some("success") => {
                Ok(body)
            }
            Ok(body) => {
                debug!("{} answered {} with status {:?}", path, http_status, body.status);

                Err(BackendFailure::protocol(
                    Some(http_status.as_u16()),
                    body.message.unwrap_or_else(|| describe(http_status)),
                ))
            }
            Err(err) if http_status.is_success() => Err(BackendFailure::protocol(
                Some(http_status.as_u16()),
                format!("malformed response from backend: {}", err),
            )),
            Err(_) => Err(BackendFailure::protocol(
                Some(http_status.as_u16()),
                describe(http_status),
            )),
        }
    }
}

fn describe(status: StatusCode) -> String {
    format!("HTTP {}", status)
}

#[async_trait]
impl Backend for BackendClient {
    async fn connect(&self) -> BackendResult<Ack> {
        let body = self.call::<IgnoredAny>(Method::POST, "api/connect").await?;
        Ok(Ack {
            message: body.message,
        })
    }

    async fn disconnect(&self) -> BackendResult<Ack> {
        let body = self.call::<IgnoredAny>(Method::POST, "api/disconnect").await?;
        Ok(Ack {
            message: body.message,
        })
    }

    async fn status(&self) -> BackendResult<TelemetrySample> {
        let body = self.call::<TelemetrySample>(Method::GET, "api/status").await?;

        // a success without data carries no connection flag, so it reads as
        // not connected
        Ok(body.data.unwrap_or_default())
    }

    async fn ping(&self) -> BackendResult<String> {
        let res = self.send(Method::GET, "").await?;
        let http_status = res.status();

        if !http_status.is_success() {
            return Err(BackendFailure::protocol(
                Some(http_status.as_u16()),
                describe(http_status),
            ));
        }

        let greeting = res.json::<Greeting>().await.map_err(|err| {
            BackendFailure::protocol(
                Some(http_status.as_u16()),
                format!("malformed response from backend: {}", err),
            )
        })?;

        Ok(greeting.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warp::{http::StatusCode as WarpStatus, Filter};

    macro_rules! serve {
        ($routes:expr) => {{
            let (addr, server) = warp::serve($routes).bind_ephemeral(([127, 0, 0, 1], 0));
            tokio::spawn(server);
            BackendClient::new(&BackendConfig {
                address: format!("http://{}", addr),
                timeout_ms: Some(2000),
            })
            .unwrap()
        }};
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let client = BackendClient::new(&BackendConfig {
            address: "http://127.0.0.1:5000/gcs".into(),
            timeout_ms: None,
        })
        .unwrap();

        assert_eq!(
            client.base_url().join("api/status").unwrap().as_str(),
            "http://127.0.0.1:5000/gcs/api/status"
        );
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(BackendClient::new(&BackendConfig {
            address: "not a url".into(),
            timeout_ms: None,
        })
        .is_err());
    }

    #[tokio::test]
    async fn connect_success_carries_message() {
        let routes = warp::path!("api" / "connect").and(warp::post()).map(|| {
            warp::reply::json(&json!({"status": "success", "message": "Connected to Vehicle"}))
        });
        let client = serve!(routes);

        let ack = client.connect().await.unwrap();
        assert_eq!(ack, Ack::with_message("Connected to Vehicle"));
    }

    #[tokio::test]
    async fn disconnect_without_data_is_acknowledged() {
        let routes = warp::path!("api" / "disconnect")
            .and(warp::post())
            .map(|| warp::reply::json(&json!({"status": "success", "message": "Disconnected"})));
        let client = serve!(routes);

        let ack = client.disconnect().await.unwrap();
        assert_eq!(ack, Ack::with_message("Disconnected"));
    }

    #[tokio::test]
    async fn silent_backend_times_out_as_network_failure() {
        let routes = warp::path!("api" / "disconnect")
            .and(warp::post())
            .then(|| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                warp::reply::json(&json!({"status": "success"}))
            });
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let client = BackendClient::new(&BackendConfig {
            address: format!("http://{}", addr),
            timeout_ms: Some(200),
        })
        .unwrap();

        assert!(matches!(
            client.disconnect().await,
            Err(BackendFailure::Network(_))
        ));
    }

    #[tokio::test]
    async fn error_status_on_http_ok_is_protocol_failure() {
        let routes = warp::path!("api" / "connect")
            .and(warp::post())
            .map(|| warp::reply::json(&json!({"status": "error", "message": "busy"})));
        let client = serve!(routes);

        let err = client.connect().await.unwrap_err();
        assert_eq!(err, BackendFailure::protocol(Some(200), "busy"));
        assert_eq!(err.to_string(), "busy");
    }

    #[tokio::test]
    async fn http_error_surfaces_backend_message() {
        let routes = warp::path!("api" / "connect").and(warp::post()).map(|| {
            warp::reply::with_status(
                warp::reply::json(&json!({
                    "status": "error",
                    "message": "Connection timed out after 60 seconds."
                })),
                WarpStatus::INTERNAL_SERVER_ERROR,
            )
        });
        let client = serve!(routes);

        let err = client.connect().await.unwrap_err();
        assert_eq!(
            err,
            BackendFailure::protocol(Some(500), "Connection timed out after 60 seconds.")
        );
    }

    #[tokio::test]
    async fn success_status_on_http_error_is_still_a_failure() {
        let routes = warp::path!("api" / "disconnect").and(warp::post()).map(|| {
            warp::reply::with_status(
                warp::reply::json(&json!({"status": "success"})),
                WarpStatus::SERVICE_UNAVAILABLE,
            )
        });
        let client = serve!(routes);

        match client.disconnect().await {
            Err(BackendFailure::Protocol { http_status, message }) => {
                assert_eq!(http_status, Some(503));
                assert!(message.contains("503"), "{}", message);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_reported() {
        let routes = warp::path!("api" / "status").map(|| "<html>oops</html>");
        let client = serve!(routes);

        match client.status().await {
            Err(BackendFailure::Protocol { message, .. }) => {
                assert!(message.starts_with("malformed response"), "{}", message)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_decodes_telemetry() {
        let routes = warp::path!("api" / "status").and(warp::get()).map(|| {
            warp::reply::json(&json!({
                "status": "success",
                "data": {
                    "is_connected": true,
                    "mode": "GUIDED",
                    "armed": false,
                    "lat": 39.0,
                    "lon": 22.0,
                    "alt": 12.5,
                    "airspeed": 0.1,
                    "groundspeed": 0.0,
                    "heading": 270,
                    "battery_voltage": null,
                }
            }))
        });
        let client = serve!(routes);

        let sample = client.status().await.unwrap();
        assert!(sample.is_connected);
        assert_eq!(sample.mode.as_deref(), Some("GUIDED"));
        assert_eq!(sample.lat, Some(39.0));
        assert_eq!(sample.heading, Some(270.0));
        assert_eq!(sample.battery_voltage, None);
    }

    #[tokio::test]
    async fn status_without_data_reads_as_disconnected() {
        let routes = warp::path!("api" / "status")
            .map(|| warp::reply::json(&json!({"status": "success"})));
        let client = serve!(routes);

        let sample = client.status().await.unwrap();
        assert!(!sample.is_connected);
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_failure() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = BackendClient::new(&BackendConfig {
            address: format!("http://127.0.0.1:{}", port),
            timeout_ms: Some(2000),
        })
        .unwrap();

        assert!(matches!(
            client.status().await,
            Err(BackendFailure::Network(_))
        ));
    }

    #[tokio::test]
    async fn ping_reads_root_greeting() {
        let routes = warp::path::end()
            .map(|| warp::reply::json(&json!({"message": "GCS Backend Running!"})));
        let client = serve!(routes);

        assert_eq!(client.ping().await.unwrap(), "GCS Backend Running!");
    }
}
