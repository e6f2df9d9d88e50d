use std::net::SocketAddr;

pub mod adapters;
pub mod config;
pub mod notify;
pub mod ports;
pub mod session;
pub mod types;

mod app;
mod assets;
mod feed;
mod state;
mod templates;

pub use app::app;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(config)).await.expect("server error");
}
