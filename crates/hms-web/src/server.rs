//! Web服务器

use axum::{
    routing::{get, patch, post},
    Router,
};
use hms_core::Result;
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{
    admit, alarm_history, bed_census, health, intake, list_beds, list_queue, mark_bed_available,
    overview, silence, update_vitals, AppState,
};

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, desk: AppState) -> Self {
        Self {
            addr,
            app: create_app(desk),
        }
    }

    /// 运行直到 `shutdown` 完成
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Web server stopped");
        Ok(())
    }
}

pub fn create_app(desk: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health))
        // API路由
        .nest("/api/v1", api_routes())
        .with_state(desk)
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

/// API v1 路由
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/queue", get(list_queue).post(intake))
        .route("/queue/:id/admit", post(admit))
        .route("/queue/:id/vitals", patch(update_vitals))
        .route("/queue/:id/silence", post(silence))
        .route("/beds", get(list_beds))
        .route("/beds/census", get(bed_census))
        .route("/beds/:id/available", post(mark_bed_available))
        .route("/overview", get(overview))
        .route("/alarms/history", get(alarm_history))
}
