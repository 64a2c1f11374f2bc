//! HTTP endpoint for a running candidate.
//!
//! Served by `rollcall start` when `server.listen` is set.
//!
//! # Endpoints
//!
//! | Function    | Type | Endpoint   | Description                                                   |
//! |-------------|------|------------|---------------------------------------------------------------|
//! | [`health`]  | GET  | `/health`  | Health report as JSON; 503 when any check fails.              |
//! | [`metrics`] | GET  | `/metrics` | Election and heartbeat metrics in the Prometheus text format. |

use actix_web::dev::Server;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use log::{error, info};

use crate::health::HealthChecker;
use crate::shutdown::Shutdown;

/// Runs every health check and returns the report.
async fn health(checker: web::Data<HealthChecker>) -> impl Responder {
    let report = checker.check().await;
    if report.healthy {
        HttpResponse::Ok().json(report)
    } else {
        HttpResponse::ServiceUnavailable().json(report)
    }
}

/// Exposes the Prometheus metrics of this process.
async fn metrics() -> impl Responder {
    match crate::metrics::render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            error!("failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

/// Registers the routes on an app.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics));
}

/// Binds the endpoint. Fails right away when the address is unusable.
pub fn bind(listen: &str, checker: HealthChecker) -> std::io::Result<Server> {
    let checker = web::Data::new(checker);
    let server = HttpServer::new(move || App::new().app_data(checker.clone()).configure(routes))
        .workers(1)
        .disable_signals()
        .bind(listen)?
        .run();
    info!("serving /health and /metrics on {}", listen);
    Ok(server)
}

/// Drives `server` until shutdown is requested, then stops it gracefully.
///
/// A server that fails on its own requests shutdown so the candidate
/// doesn't run unobservable.
pub async fn serve_until_shutdown(server: Server, shutdown: &Shutdown) -> std::io::Result<()> {
    let handle = server.handle();
    tokio::select! {
        result = server => {
            shutdown.initiate_shutdown();
            result
        }
        _ = shutdown.wait_for_shutdown() => {
            handle.stop(true).await;
            Ok(())
        }
    }
}
