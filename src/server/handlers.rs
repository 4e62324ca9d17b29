use super::types::ErrorResponse;
use crate::relay::{EventStream, Relay, RelayErrorStatus, RelayOutcome};
use axum::{
    body::{Body, Bytes},
    extract::{State, rejection::BytesRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
};
use futures_util::StreamExt;
use std::{convert::Infallible, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const OPENAPI_SPEC: &str = include_str!("openapi.json");

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

pub async fn extract_image_info(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    // An over-limit body can only hold an over-length blob
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("INVALID_PAYLOAD: request body rejected: {}", rejection.body_text());
            let status = RelayErrorStatus::placeholder(format!(
                "Invalid payload: blob: request body rejected: {}",
                rejection.body_text()
            ));
            return (StatusCode::BAD_REQUEST, Json(status)).into_response();
        }
    };

    info!("Received image info request ({} bytes)", body.len());

    match state.relay.handle(&body, CancellationToken::new()).await {
        Ok(RelayOutcome::Answered(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(RelayOutcome::Rejected(status)) | Ok(RelayOutcome::Failed(status)) => {
            (StatusCode::BAD_REQUEST, Json(status)).into_response()
        }
        Ok(RelayOutcome::Streaming(events)) => event_stream_response(events),
        Err(e) => internal_error(e.to_string()),
    }
}

fn event_stream_response(events: EventStream) -> Response {
    let body = Body::from_stream(events.map(|event| Ok::<_, Infallible>(event.encode())));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS")
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
        .body(body)
        .unwrap_or_else(|e| internal_error(format!("Failed to build event stream: {}", e)))
}

fn internal_error(message: String) -> Response {
    error!("Failed to relay request: {}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Processing error: {}", message),
        }),
    )
        .into_response()
}

pub async fn openapi_spec() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], OPENAPI_SPEC)
}

pub async fn docs() -> Html<&'static str> {
    Html(SWAGGER_TEMPLATE)
}

const SWAGGER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <title>API Documentation</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui.css">
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui-bundle.js"></script>
    <script>
      window.onload = function() {
        window.ui = SwaggerUIBundle({
          url: '/openapi.json',
          dom_id: '#swagger-ui',
          deepLinking: true,
          presets: [
            SwaggerUIBundle.presets.apis,
            SwaggerUIBundle.SwaggerUIStandalonePreset
          ],
        });
      };
    </script>
  </body>
</html>
"#;
