// barometer_logger - Barometric pressure logger for router admin pages
//
// Copyright 2026 barometer_logger contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const TEXT_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// State shared by every request to the metrics server.
#[derive(Debug)]
pub struct RequestContext {
    registry: Registry,
}

impl RequestContext {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

/// Build the router serving `/metrics` in Prometheus text format.
pub fn router(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/metrics", get(text_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();

    match encode(&mut buf, &context.registry) {
        Ok(()) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, TEXT_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{router, RequestContext};
    use crate::metrics::CollectorMetrics;
    use crate::reading::Reading;
    use chrono::DateTime;
    use prometheus_client::registry::Registry;
    use reqwest::StatusCode;
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Arc;

    async fn serve(registry: Registry) -> SocketAddr {
        let app = router(Arc::new(RequestContext::new(registry)));
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::Server::from_tcp(listener).unwrap().serve(app.into_make_service()));
        addr
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_registry() {
        let mut registry = Registry::default();
        let metrics = CollectorMetrics::new(&mut registry);
        let ts = DateTime::parse_from_rfc3339("2026-10-18T12:00:00Z").unwrap();
        metrics.stored(&Reading::ok(ts, 96231.5));

        let addr = serve(registry).await;
        let res = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();

        assert_eq!(StatusCode::OK, res.status());
        assert!(res.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/openmetrics-text"));

        let body = res.text().await.unwrap();
        assert!(body.contains("barometer_pressure_pascals 96231"));
        assert!(body.contains("barometer_collections_total{outcome=\"ok\"} 1"));
    }

    #[tokio::test]
    async fn unknown_paths_and_methods() {
        let addr = serve(Registry::default()).await;
        let client = reqwest::Client::new();

        let res = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert_eq!(StatusCode::NOT_FOUND, res.status());

        let res = client.post(format!("http://{}/metrics", addr)).send().await.unwrap();
        assert_eq!(StatusCode::METHOD_NOT_ALLOWED, res.status());
    }
}
