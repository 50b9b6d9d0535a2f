//! Solver directory client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use solver_core::{ControllerConfig, SolverMetadata};

use crate::error::{MetadataError, MetadataResult};

/// Resolves a solver id to its display name and worker image.
#[async_trait]
pub trait SolverDirectory: Send + Sync {
    async fn resolve(&self, solver_id: u64) -> MetadataResult<SolverMetadata>;
}

/// [`SolverDirectory`] backed by `GET {base}/{solver_id}`.
#[derive(Clone)]
pub struct HttpSolverDirectory {
    base_url: String,
    default_image: Option<String>,
    client: reqwest::Client,
}

impl HttpSolverDirectory {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> MetadataResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Client(e.to_string()))?;
        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_image: None,
            client,
        })
    }

    pub fn from_config(config: &ControllerConfig) -> MetadataResult<Self> {
        Ok(Self::new(
            &config.solver_directory_url,
            config.metadata_connect_timeout,
            config.metadata_timeout,
        )?
        .with_default_image(config.worker.default_image.clone()))
    }

    /// Image used when the directory returns an empty `image_path`.
    pub fn with_default_image(mut self, image: Option<String>) -> Self {
        self.default_image = image.filter(|i| !i.is_empty());
        self
    }

    fn solver_url(&self, solver_id: u64) -> String {
        format!("{}/{solver_id}", self.base_url)
    }
}

#[async_trait]
impl SolverDirectory for HttpSolverDirectory {
    async fn resolve(&self, solver_id: u64) -> MetadataResult<SolverMetadata> {
        let url = self.solver_url(solver_id);
        debug!(solver_id, %url, "resolving solver");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(solver_id, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(solver_id, code = status.as_u16(), "solver directory lookup failed");
            return Err(MetadataError::Status {
                solver_id,
                code: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(solver_id, e))?;
        let mut metadata: SolverMetadata =
            serde_json::from_slice(&body).map_err(|e| MetadataError::InvalidBody {
                solver_id,
                message: e.to_string(),
            })?;

        if metadata.image_ref.is_empty() {
            match &self.default_image {
                Some(image) => {
                    debug!(solver_id, image = %image, "no image in directory, using default");
                    metadata.image_ref = image.clone();
                }
                None => return Err(MetadataError::MissingImage { solver_id }),
            }
        }

        Ok(metadata)
    }
}

fn transport_error(solver_id: u64, err: reqwest::Error) -> MetadataError {
    if err.is_timeout() {
        MetadataError::Timeout { solver_id }
    } else {
        MetadataError::Transport {
            solver_id,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    async fn spawn_directory(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route(
            "/solvers/{id}",
            get(move || async move {
                (status, [("content-type", "application/json")], body)
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}/solvers")
    }

    fn client(base: String) -> HttpSolverDirectory {
        HttpSolverDirectory::new(base, Duration::from_secs(5), Duration::from_secs(10)).unwrap()
    }

    #[tokio::test]
    async fn resolves_name_and_image() {
        let base = spawn_directory(
            StatusCode::OK,
            r#"{"name":"chuffed","image_path":"registry/chuffed:1.2"}"#,
        )
        .await;

        let meta = client(base).resolve(42).await.unwrap();
        assert_eq!(meta.name, "chuffed");
        assert_eq!(meta.image_ref, "registry/chuffed:1.2");
    }

    #[tokio::test]
    async fn server_error_is_status() {
        let base = spawn_directory(StatusCode::INTERNAL_SERVER_ERROR, "{}").await;

        let err = client(base).resolve(42).await.unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Status {
                solver_id: 42,
                code: 500
            }
        ));
    }

    #[tokio::test]
    async fn unexpected_shape_is_invalid_body() {
        let base = spawn_directory(StatusCode::OK, r#"{"title":"chuffed"}"#).await;

        let err = client(base).resolve(42).await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidBody { .. }));
    }

    #[tokio::test]
    async fn empty_image_uses_default() {
        let base = spawn_directory(StatusCode::OK, r#"{"name":"gecode","image_path":""}"#).await;

        let directory = client(base).with_default_image(Some("registry/generic:3".to_string()));
        let meta = directory.resolve(9).await.unwrap();
        assert_eq!(meta.image_ref, "registry/generic:3");
    }

    #[tokio::test]
    async fn empty_image_without_default_fails() {
        let base = spawn_directory(StatusCode::OK, r#"{"name":"gecode","image_path":""}"#).await;

        let err = client(base).resolve(9).await.unwrap_err();
        assert!(matches!(err, MetadataError::MissingImage { solver_id: 9 }));
    }

    #[tokio::test]
    async fn slow_directory_times_out() {
        let app = Router::new().route(
            "/solvers/{id}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let directory = HttpSolverDirectory::new(
            format!("http://{addr}/solvers"),
            Duration::from_secs(1),
            Duration::from_millis(200),
        )
        .unwrap();
        let err = directory.resolve(1).await.unwrap_err();
        assert!(matches!(err, MetadataError::Timeout { solver_id: 1 }));
    }

    #[tokio::test]
    async fn closed_port_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}")).resolve(1).await.unwrap_err();
        assert!(matches!(err, MetadataError::Transport { .. }));
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let directory = client("http://directory/solvers/".to_string());
        assert_eq!(directory.solver_url(42), "http://directory/solvers/42");
    }
}
