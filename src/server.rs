use crate::{
    error::AppError,
    metrics::Metrics,
};
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
    Router,
};
use eyre::{
    Context as _,
    Result,
};
use std::{
    net::SocketAddr,
    sync::Arc,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
}

pub fn create_router(metrics: Arc<Metrics>) -> Router {
    let state = AppState { metrics };

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

async fn healthz() -> &'static str {
    "OK"
}

/// Serves the metrics on `addr` until `cancel` fires.
pub async fn serve(addr: SocketAddr, metrics: Arc<Metrics>, cancel: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind metrics endpoint to {addr}"))?;
    let local_addr = listener.local_addr()?;
    let host = if local_addr.ip().is_unspecified() {
        "localhost".to_string()
    } else {
        local_addr.ip().to_string()
    };
    info!("Started Prometheus exporter (http://{host}:{}/metrics)", local_addr.port());

    axum::serve(listener, create_router(metrics))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .wrap_err("Metrics endpoint failed")
}

#[cfg(test)]
mod test {
    use super::*;
    use ch7465lg_client::Downstream;
    use pretty_assertions::assert_eq;

    async fn spawn_server(metrics: Arc<Metrics>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            axum::serve(listener, create_router(metrics)).await.expect("server");
        });
        addr
    }

    #[tokio::test]
    async fn serves_metrics_in_text_format() {
        let metrics = Arc::new(Metrics::new().expect("metrics"));
        metrics.record_downstreams(&[Downstream {
            channel_id: 5,
            power: 42,
            ..Default::default()
        }]);
        let addr = spawn_server(metrics).await;

        let response = reqwest::get(format!("http://{addr}/metrics")).await.expect("request");
        assert!(response.status().is_success());
        assert_eq!(
            response.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some(prometheus::TEXT_FORMAT)
        );
        let body = response.text().await.expect("body");
        assert!(body.contains(r#"ch7465lg_ds_power_dbmv{channel_id="5"} 42"#), "{body}");
    }

    #[tokio::test]
    async fn health_check() {
        let addr = spawn_server(Arc::new(Metrics::new().expect("metrics"))).await;
        let body = reqwest::get(format!("http://{addr}/healthz"))
            .await
            .expect("request")
            .text()
            .await
            .expect("body");
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve(
            "127.0.0.1:0".parse().expect("valid address"),
            Arc::new(Metrics::new().expect("metrics")),
            cancel.clone(),
        ));
        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .expect("server stops")
            .expect("task")
            .expect("clean shutdown");
    }
}
