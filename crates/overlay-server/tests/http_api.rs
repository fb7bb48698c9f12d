use jamdeck_core::{NowPlayingSnapshot, NowPlayingSource};
use jamdeck_overlay_server::{create_router, AppState};
use std::time::Duration;

/// Source that replays a fixed snapshot on every poll.
struct FixedSource(NowPlayingSnapshot);

impl NowPlayingSource for FixedSource {
    fn poll(&mut self) -> NowPlayingSnapshot {
        self.0.clone()
    }
}

/// Source that never answers within the poll budget.
struct StuckSource;

impl NowPlayingSource for StuckSource {
    fn poll(&mut self) -> NowPlayingSnapshot {
        std::thread::sleep(Duration::from_secs(6));
        NowPlayingSnapshot::idle("should have timed out before this")
    }
}

/// Serve the router on an ephemeral loopback port, returning the base URL.
async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn state_with_source(
    source: Box<dyn NowPlayingSource>,
    dir: &tempfile::TempDir,
) -> AppState {
    AppState::new(
        source,
        dir.path().join("cover.jpg"),
        dir.path().join("assets"),
    )
}

#[tokio::test]
async fn nowplaying_returns_full_snapshot_with_headers() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = NowPlayingSnapshot {
        playing: true,
        title: "Song".into(),
        artist: "Artist".into(),
        album: "Album".into(),
        status: "playing".into(),
        app_id: Some("spotify".into()),
        artwork_ref: Some("/artwork?t=1700000000".into()),
        error: None,
    };
    let base = spawn_server(state_with_source(Box::new(FixedSource(snapshot)), &dir)).await;

    let resp = reqwest::get(format!("{base}/nowplaying")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-store, no-cache, must-revalidate"
    );
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["playing"], true);
    assert_eq!(body["title"], "Song");
    assert_eq!(body["appId"], "spotify");
    assert_eq!(body["artworkRef"], "/artwork?t=1700000000");
}

#[tokio::test]
async fn nowplaying_idle_still_carries_playing_key() {
    let dir = tempfile::tempdir().unwrap();
    let source = FixedSource(NowPlayingSnapshot::idle("No active media session"));
    let base = spawn_server(state_with_source(Box::new(source), &dir)).await;

    let resp = reqwest::get(format!("{base}/nowplaying")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["playing"], false);
    assert_eq!(body["error"], "No active media session");
}

#[tokio::test]
async fn nowplaying_minimal_payload_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let source = FixedSource(NowPlayingSnapshot {
        playing: true,
        status: "playing".into(),
        app_id: Some("player.exe".into()),
        ..Default::default()
    });
    let base = spawn_server(state_with_source(Box::new(source), &dir)).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/nowplaying"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["playing"], true);
    assert_eq!(body["title"], "");
    assert_eq!(body["artist"], "");
    assert_eq!(body["status"], "playing");
}

#[tokio::test]
async fn nowplaying_stuck_provider_times_out_with_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = spawn_server(state_with_source(Box::new(StuckSource), &dir)).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/nowplaying"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["playing"], false);
    assert_eq!(body["error"], "timeout");
}

#[tokio::test]
async fn artwork_is_404_until_extracted_then_serves_latest_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let artwork_path = dir.path().join("cover.jpg");
    let state = AppState::new(
        Box::new(FixedSource(NowPlayingSnapshot::idle("idle"))),
        artwork_path.clone(),
        dir.path().join("assets"),
    );
    let base = spawn_server(state).await;

    let resp = reqwest::get(format!("{base}/artwork")).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "Artwork not found");

    std::fs::write(&artwork_path, b"jpeg v1").unwrap();
    let resp = reqwest::get(format!("{base}/artwork?t=123")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "image/jpeg");
    assert_eq!(resp.headers().get("cache-control").unwrap(), "no-cache");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"jpeg v1");

    // Overwritten wholesale by the next extraction.
    std::fs::write(&artwork_path, b"jpeg v2").unwrap();
    let resp = reqwest::get(format!("{base}/artwork?t=456")).await.unwrap();
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"jpeg v2");
}

#[tokio::test]
async fn overlay_document_and_assets_are_served() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir_all(assets.join("fonts")).unwrap();
    std::fs::write(assets.join("overlay.html"), "<html>overlay</html>").unwrap();
    std::fs::write(assets.join("overlay.js"), "// script").unwrap();
    std::fs::write(assets.join("fonts/display.woff2"), b"font bytes").unwrap();

    let state = AppState::new(
        Box::new(FixedSource(NowPlayingSnapshot::idle("idle"))),
        dir.path().join("cover.jpg"),
        assets,
    );
    let base = spawn_server(state).await;

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-store, no-cache, must-revalidate"
    );
    assert_eq!(resp.text().await.unwrap(), "<html>overlay</html>");

    // The scene query parameter is accepted and does not change routing.
    let resp = reqwest::get(format!("{base}/?scene=gaming")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<html>overlay</html>");

    let resp = reqwest::get(format!("{base}/overlay.js")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/javascript"
    );

    let resp = reqwest::get(format!("{base}/fonts/display.woff2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "public, max-age=31536000"
    );
}

#[tokio::test]
async fn missing_assets_and_unknown_routes_are_plain_404() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir_all(&assets).unwrap();
    let state = AppState::new(
        Box::new(FixedSource(NowPlayingSnapshot::idle("idle"))),
        dir.path().join("cover.jpg"),
        assets,
    );
    let base = spawn_server(state).await;

    for path in ["/missing.css", "/no/such/thing", "/../etc/passwd"] {
        let resp = reqwest::get(format!("{base}{path}")).await.unwrap();
        assert_eq!(resp.status(), 404, "expected 404 for {path}");
        assert!(resp
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }
}
