//! Request handlers for the camera endpoints.
//!
//! `/capture` and `/stream` are the two consumers of the frame
//! transport. Both bound their waits with [`POP_TIMEOUT`] and treat an
//! expired wait as a definitive failure rather than retrying; the
//! client decides whether to come back.

use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::OwnedSemaphorePermit;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use super::AppContext;
use crate::capture::SensorInfo;

/// Fixed multipart boundary of the `/stream` response.
pub const STREAM_BOUNDARY: &str = "123456789000000000000987654321";

/// How long a consumer waits on the transport before giving up.
pub const POP_TIMEOUT: Duration = Duration::from_millis(1000);

pub async fn root() -> Html<&'static str> {
    Html(concat!(
        "<h1>Obscura Camera Server</h1>",
        "<p><a href='/capture'>Take Photo</a></p>",
        "<p><a href='/stream'>Start Stream</a></p>",
        "<p><a href='/status'>System Status</a></p>",
        "<p><a href='/hardware'>Hardware Info</a></p>",
    ))
}

/// One-shot capture: pop a single frame and serve it whole.
///
/// Exactly one pool release happens per successful pop (the handle
/// drops when this function returns); a timeout or a null slot
/// releases nothing because nothing was owned.
pub async fn capture(State(ctx): State<AppContext>) -> Response {
    let _slot = match ctx.slots.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
    };

    match ctx.transport.pop(POP_TIMEOUT).await {
        Ok(Some(frame)) => {
            let meta = *frame.meta();
            info!(
                width = meta.width,
                height = meta.height,
                len = frame.len(),
                "serving capture"
            );
            ctx.stats.frames_served.fetch_add(1, Ordering::Relaxed);
            let body = frame.to_bytes();
            (
                [
                    (header::CONTENT_TYPE, meta.format.mime()),
                    (header::CONTENT_DISPOSITION, "inline; filename=capture.jpg"),
                ],
                body,
            )
                .into_response()
        }
        Ok(None) => {
            error!("capture failed upstream: null frame");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!("no frame for capture: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Continuous live stream: `multipart/x-mixed-replace` parts until the
/// client goes away or the transport runs dry.
pub async fn stream(State(ctx): State<AppContext>) -> Result<Response, StatusCode> {
    let slot = ctx
        .slots
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    ctx.stats.streams_opened.fetch_add(1, Ordering::Relaxed);
    info!("stream opened");

    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(1);
    tokio::spawn(run_stream(ctx, slot, tx));

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace;boundary={STREAM_BOUNDARY}"),
        )
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Pump frames into the chunked response body.
///
/// Each frame goes out as three sends: part header, raw bytes,
/// trailing CRLF. A failed send means the client is gone and ends the
/// stream mid-part. The popped handle drops at the end of every path
/// through the loop, so its buffer returns to the pool exactly once
/// whether the part completed or not. The connection slot is held
/// until this task returns.
async fn run_stream(
    ctx: AppContext,
    _slot: OwnedSemaphorePermit,
    out: mpsc::Sender<Result<Bytes, Infallible>>,
) {
    loop {
        let frame = match ctx.transport.pop(POP_TIMEOUT).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                error!("stream ending: null frame from producer");
                break;
            }
            Err(e) => {
                warn!("stream ending: {e}");
                break;
            }
        };

        let meta = *frame.meta();
        debug!(seq = meta.sequence, len = frame.len(), "streaming frame");

        let head = Bytes::from(format!(
            "--{STREAM_BOUNDARY}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            meta.format.mime(),
            frame.len(),
        ));
        if out.send(Ok(head)).await.is_err() {
            warn!("stream ending: client gone before part header");
            break;
        }
        if out.send(Ok(frame.to_bytes())).await.is_err() {
            warn!("stream ending: client gone mid-frame");
            break;
        }
        if out.send(Ok(Bytes::from_static(b"\r\n"))).await.is_err() {
            warn!("stream ending: client gone at part tail");
            break;
        }

        ctx.stats.frames_served.fetch_add(1, Ordering::Relaxed);
        // frame drops here, returning its buffer to the pool
    }
    info!("stream closed");
}

pub async fn status(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let config = crate::CONFIG.load();
    Json(json!({
        "uptime_secs": ctx.started.elapsed().as_secs(),
        "frames_captured": ctx.stats.frames_captured.load(Ordering::Relaxed),
        "cycles_skipped": ctx.stats.cycles_skipped.load(Ordering::Relaxed),
        "frames_served": ctx.stats.frames_served.load(Ordering::Relaxed),
        "streams_opened": ctx.stats.streams_opened.load(Ordering::Relaxed),
        "queue_depth": ctx.transport.len(),
        "slots_available": ctx.slots.available_permits(),
        "capture_interval_ms": config.capture.interval_ms,
    }))
}

pub async fn hardware(State(ctx): State<AppContext>) -> Json<SensorInfo> {
    Json(ctx.sensor.as_ref().clone())
}
