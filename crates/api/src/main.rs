use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use monto_core::domain::contract::RecommendationRequest;
use monto_core::domain::recommendation::Recommendation;
use monto_core::ingest::{HttpJsonDataProvider, MarketDataProvider};
use monto_core::strategy::StrategyConfig;
use monto_core::{CoreError, ErrorKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = monto_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let strategy = settings.load_strategy()?;
    strategy.validate()?;

    let provider: Option<Arc<dyn MarketDataProvider>> =
        match HttpJsonDataProvider::from_settings(&settings) {
            Ok(p) => Some(Arc::new(p)),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "data provider unavailable; starting API in degraded mode");
                None
            }
        };

    let app = router(AppState {
        provider,
        strategy: Arc::new(strategy),
    });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/config", get(get_config))
        .route("/recommendations", post(create_recommendation))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    provider: Option<Arc<dyn MarketDataProvider>>,
    strategy: Arc<StrategyConfig>,
}

#[derive(Debug, Deserialize)]
struct CreateRecommendationBody {
    monthly_amount: f64,
    /// Defaults to the latest completed session.
    as_of_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct ApiRecommendation {
    recommendation_id: Uuid,
    provider: String,
    recommendation: Recommendation,
}

#[derive(Debug, Serialize)]
struct ApiError {
    kind: Option<ErrorKind>,
    error: String,
}

struct ApiFailure(StatusCode, ApiError);

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

impl From<CoreError> for ApiFailure {
    fn from(err: CoreError) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::DataUnavailable | ErrorKind::PriceUnavailable => StatusCode::BAD_GATEWAY,
            ErrorKind::InsufficientHistory => StatusCode::SERVICE_UNAVAILABLE,
        };
        ApiFailure(
            status,
            ApiError {
                kind: Some(err.kind()),
                error: err.to_string(),
            },
        )
    }
}

async fn get_config(State(state): State<AppState>) -> Json<StrategyConfig> {
    Json(state.strategy.as_ref().clone())
}

async fn create_recommendation(
    State(state): State<AppState>,
    Json(body): Json<CreateRecommendationBody>,
) -> Result<Json<ApiRecommendation>, ApiFailure> {
    let monthly_amount = RecommendationRequest {
        monthly_amount: body.monthly_amount,
    }
    .validate(&state.strategy.amount_bounds)?;

    let Some(provider) = state.provider.clone() else {
        return Err(ApiFailure(
            StatusCode::SERVICE_UNAVAILABLE,
            ApiError {
                kind: None,
                error: "data provider is not configured".to_string(),
            },
        ));
    };

    let as_of_date = match body.as_of_date {
        Some(d) => d,
        None => resolve_today(Utc::now()).map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            ApiFailure(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError {
                    kind: None,
                    error: format!("{e:#}"),
                },
            )
        })?,
    };

    let recommendation = monto_core::pipeline::generate_recommendation(
        provider.as_ref(),
        &state.strategy,
        monthly_amount,
        as_of_date,
    )
    .await
    .map_err(|err| {
        tracing::error!(%as_of_date, kind = ?err.kind(), error = %err, "recommendation failed");
        if err.kind() != ErrorKind::Validation {
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(err.clone()));
        }
        ApiFailure::from(err)
    })?;

    let recommendation_id = Uuid::new_v4();
    tracing::info!(
        %recommendation_id,
        %as_of_date,
        regime = recommendation.plan.regime.label(),
        "recommendation generated"
    );

    Ok(Json(ApiRecommendation {
        recommendation_id,
        provider: provider.provider_name().to_string(),
        recommendation,
    }))
}

fn resolve_today(now: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    monto_core::time::market_date::resolve_as_of_date(None, now)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &monto_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use monto_core::ingest::fixture::FixtureDataProvider;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn app(provider: Option<FixtureDataProvider>) -> Router {
        let strategy = StrategyConfig::default();
        router(AppState {
            provider: provider.map(|p| Arc::new(p) as Arc<dyn MarketDataProvider>),
            strategy: Arc::new(strategy),
        })
    }

    fn fixture() -> FixtureDataProvider {
        FixtureDataProvider::new(StrategyConfig::default().assets, as_of())
    }

    async fn post(app: Router, body: Value) -> (StatusCode, Value) {
        let res = app
            .oneshot(
                Request::post("/recommendations")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let res = app(None)
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn config_exposes_regime_table() {
        let res = app(None)
            .oneshot(Request::get("/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["regime_bands"][0]["regime"], "EXTREME_FEAR");
        assert_eq!(v["risk"]["max_kelly_fraction"], 0.25);
    }

    #[tokio::test]
    async fn creates_recommendation_from_fixture() {
        let (status, v) = post(
            app(Some(fixture().with_sentiment(Some(70), Some(15)))),
            json!({"monthly_amount": 1500, "as_of_date": "2026-10-16"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(v["provider"], "fixture");
        assert_eq!(v["recommendation"]["plan"]["regime"], "EXTREME_FEAR");
        assert_eq!(v["recommendation"]["plan"]["crypto"]["target_amount"], 1000.0);
        assert_eq!(v["recommendation"]["ladders"]["crypto"]["orders"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn out_of_range_amount_is_unprocessable() {
        let (status, v) = post(app(Some(fixture())), json!({"monthly_amount": 50})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(v["kind"], "validation");
    }

    #[tokio::test]
    async fn validation_runs_before_provider_check() {
        let (status, _) = post(app(None), json!({"monthly_amount": 20000})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, v) = post(app(None), json!({"monthly_amount": 1500})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(v["kind"].is_null());
    }

    #[tokio::test]
    async fn price_outage_is_bad_gateway() {
        let (status, v) = post(
            app(Some(fixture().without_prices_for("IWDA.AS"))),
            json!({"monthly_amount": 1500, "as_of_date": "2026-10-16"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(v["kind"], "data_unavailable");
    }
}
