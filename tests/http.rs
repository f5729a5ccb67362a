//! Router-level tests for the HTTP consumer surface.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use obscura::capture::{FramePool, SyntheticSensor};
use obscura::pipeline::{FrameTransport, PipelineStats};
use obscura::server::{create_router, AppContext, STREAM_BOUNDARY};

const FRAME_LEN: usize = 64;

fn test_pool(buffers: usize) -> FramePool {
    FramePool::new(
        Box::new(SyntheticSensor::with_payload_len(320, 240, FRAME_LEN)),
        buffers,
        128,
    )
}

fn test_ctx(transport: &FrameTransport, pool: &FramePool) -> AppContext {
    AppContext::new(
        transport.clone(),
        Arc::new(PipelineStats::default()),
        pool.sensor_info(),
        2,
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Frame counter the synthetic sensor embeds after the SOI marker.
fn embedded_counter(payload: &[u8]) -> u64 {
    u64::from_be_bytes(payload[2..10].try_into().unwrap())
}

// Two queued frames serve two captures in production order; a third
// request times out with a server error and releases nothing.
#[tokio::test(start_paused = true)]
async fn capture_drains_frames_then_times_out() {
    let mut pool = test_pool(4);
    let transport = FrameTransport::new(2);
    for _ in 0..2 {
        transport
            .push(Some(pool.capture_frame().unwrap()))
            .await
            .unwrap();
    }

    let app = create_router(test_ctx(&transport, &pool));

    for expected in [1u64, 2] {
        let resp = app.clone().oneshot(get("/capture")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "image/jpeg");
        assert_eq!(
            resp.headers()["content-disposition"],
            "inline; filename=capture.jpg"
        );
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), FRAME_LEN);
        assert_eq!(embedded_counter(&body), expected);
    }

    let resp = app.clone().oneshot(get("/capture")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Both served buffers are back in the pool.
    assert_eq!(pool.available(), 4);
}

#[tokio::test(start_paused = true)]
async fn capture_reports_null_frame_as_server_error() {
    let pool = test_pool(1);
    let transport = FrameTransport::new(2);
    transport.push(None).await.unwrap();

    let app = create_router(test_ctx(&transport, &pool));
    let resp = app.oneshot(get("/capture")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test(start_paused = true)]
async fn stream_response_carries_multipart_parts() {
    let mut pool = test_pool(4);
    let transport = FrameTransport::new(2);
    transport
        .push(Some(pool.capture_frame().unwrap()))
        .await
        .unwrap();

    let app = create_router(test_ctx(&transport, &pool));
    let resp = app.oneshot(get("/stream")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"],
        format!("multipart/x-mixed-replace;boundary={STREAM_BOUNDARY}")
    );

    let mut body = resp.into_body();

    let head = body.frame().await.unwrap().unwrap().into_data().unwrap();
    let head = std::str::from_utf8(&head).unwrap();
    assert!(head.starts_with(&format!("--{STREAM_BOUNDARY}\r\n")));
    assert!(head.contains(&format!("Content-Length: {FRAME_LEN}\r\n")));

    let payload = body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert_eq!(payload.len(), FRAME_LEN);
    assert_eq!(embedded_counter(&payload), 1);

    let tail = body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert_eq!(&tail[..], b"\r\n");

    // Disconnect; the pump ends on its next pop timeout and the frame
    // buffer is already back in the pool.
    drop(body);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(pool.available(), 4);
}

// A stream and a capture competing for the transport split the frames
// between them; nothing is delivered twice.
#[tokio::test(start_paused = true)]
async fn stream_and_capture_compete_for_frames() {
    let mut pool = test_pool(8);
    let transport = FrameTransport::new(2);
    let app = create_router(test_ctx(&transport, &pool));

    let resp = app.clone().oneshot(get("/stream")).await.unwrap();
    let mut body = resp.into_body();

    transport
        .push(Some(pool.capture_frame().unwrap()))
        .await
        .unwrap();
    let head = body.frame().await.unwrap().unwrap().into_data().unwrap();
    assert!(head.starts_with(b"--"));
    let streamed = body.frame().await.unwrap().unwrap().into_data().unwrap();
    let _tail = body.frame().await.unwrap().unwrap().into_data().unwrap();

    // Disconnect and let the stream pump time out before the next
    // frame arrives, so only the capture request can claim it.
    drop(body);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    transport
        .push(Some(pool.capture_frame().unwrap()))
        .await
        .unwrap();
    let resp = app.clone().oneshot(get("/capture")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let captured = resp.into_body().collect().await.unwrap().to_bytes();

    let a = embedded_counter(&streamed);
    let b = embedded_counter(&captured);
    assert_ne!(a, b);
    assert_eq!([a, b].iter().min(), Some(&1));
    assert_eq!([a, b].iter().max(), Some(&2));
}

// With both connection slots held by live streams, a capture request
// cannot even start its pop.
#[tokio::test(start_paused = true)]
async fn saturated_slots_starve_new_consumers() {
    let mut pool = test_pool(8);
    let transport = FrameTransport::new(2);
    let app = create_router(test_ctx(&transport, &pool));

    // Keep the streams fed so they outlive the assertion window.
    for _ in 0..2 {
        transport
            .push(Some(pool.capture_frame().unwrap()))
            .await
            .unwrap();
    }

    let resp_a = app.clone().oneshot(get("/stream")).await.unwrap();
    let resp_b = app.clone().oneshot(get("/stream")).await.unwrap();
    assert_eq!(resp_a.status(), StatusCode::OK);
    assert_eq!(resp_b.status(), StatusCode::OK);

    let capture = app.clone().oneshot(get("/capture"));
    assert!(tokio::time::timeout(Duration::from_millis(400), capture)
        .await
        .is_err());

    drop(resp_a);
    drop(resp_b);
}

#[tokio::test]
async fn status_and_hardware_report_pipeline_state() {
    let pool = test_pool(2);
    let transport = FrameTransport::new(2);
    let app = create_router(test_ctx(&transport, &pool));

    let resp = app.clone().oneshot(get("/status")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let status: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status["queue_depth"], 0);
    assert_eq!(status["slots_available"], 2);
    assert_eq!(status["frames_served"], 0);

    let resp = app.clone().oneshot(get("/hardware")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let hw: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(hw["model"], "synthetic test pattern");
    assert_eq!(hw["width"], 320);

    let resp = app.oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
