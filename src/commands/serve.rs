use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::clock::RequestTime;
use crate::config::Config;
use crate::controllers::paste;
use crate::error::ApiError;
use crate::storage::{AnyStore, PasteStore};
use crate::types::api::{CreatePaste, CreatedPaste, Health, PasteBody};
use crate::types::{ConsumeResult, NewPaste};
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::new(app.config.address, app.config.port);
    if app.config.test_mode {
        info!("test mode enabled, honoring time overrides");
    }

    let router = router(app);

    info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/api/pastes", post(create_paste))
        .route("/api/pastes/:id", get(get_paste))
        .route("/api/healthz", get(healthz))
        .route("/p/:id", get(get_paste_raw))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            app.config.limits.max_upload_size,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn create_paste(
    State(config): State<Config>,
    State(store): State<AnyStore>,
    body: Result<Json<CreatePaste>, JsonRejection>,
) -> crate::ApiResult<impl IntoResponse> {
    let Json(body) = body?;
    let fields = body.into_fields().map_err(ApiError::Validation)?;

    let handle = paste::create(
        &store,
        &config.base_url,
        NewPaste {
            content: fields.content,
            ttl_seconds: fields.ttl_seconds,
            max_views: fields.max_views,
        },
    )
    .await
    .map_err(ApiError::on_create)?;

    let location = paste::share_path(&handle.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CreatedPaste {
            id: handle.id,
            url: handle.url,
        }),
    ))
}

async fn get_paste(
    State(store): State<AnyStore>,
    RequestTime(now): RequestTime,
    Path(id): Path<String>,
) -> crate::ApiResult<Json<PasteBody>> {
    match paste::read_and_consume(&store, &id, now)
        .await
        .map_err(ApiError::on_fetch)?
    {
        ConsumeResult::Alive(paste) => Ok(Json(PasteBody { ok: true, paste })),
        ConsumeResult::Gone(_) => Err(ApiError::NotFound),
    }
}

async fn get_paste_raw(
    State(store): State<AnyStore>,
    RequestTime(now): RequestTime,
    Path(id): Path<String>,
) -> crate::ApiResult<impl IntoResponse> {
    match paste::read_and_consume(&store, &id, now)
        .await
        .map_err(ApiError::on_fetch)?
    {
        ConsumeResult::Alive(paste) => Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            paste.content,
        )),
        ConsumeResult::Gone(_) => Err(ApiError::NotFound),
    }
}

async fn healthz(State(store): State<AnyStore>) -> impl IntoResponse {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Health {
                ok: true,
                message: Some("API is healthy and connected to database."),
                reason: None,
            }),
        ),
        Err(err) => {
            error!("health check failed: {err:?}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Health {
                    ok: false,
                    message: None,
                    reason: Some("Persistence layer unreachable"),
                }),
            )
        }
    }
}
