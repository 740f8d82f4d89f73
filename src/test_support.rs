//! Helpers shared by async tests

use axum::Router;

/// Serves `app` on a random loopback port and returns its base URL
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}:{}", addr.ip(), addr.port())
}
