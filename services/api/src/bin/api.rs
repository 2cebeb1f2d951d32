//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        llm::LlmContext, quiz_llm::OpenAiQuizAdapter, store::FileStoreAdapter,
        summary_llm::OpenAiSummaryAdapter,
    },
    config::Config,
    error::ApiError,
    web::{rest, state::AppState, ApiDoc},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, post},
    Router,
};
use coursewise_core::ports::ProfileRepository;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Store ---
    info!("Opening data store at {}...", config.data_dir.display());
    let store = Arc::new(FileStoreAdapter::new(config.data_dir.clone()));
    store.init().await?;
    store.ensure_default_course().await?;

    // --- 3. Initialize Service Adapters ---
    let summary_llm = LlmContext::new(
        store.clone(),
        config.openai_api_key.clone(),
        config.summary_model.clone(),
    );
    let quiz_llm = LlmContext::new(
        store.clone(),
        config.openai_api_key.clone(),
        config.quiz_model.clone(),
    );
    let summary_adapter = Arc::new(OpenAiSummaryAdapter::new(summary_llm));
    let quiz_adapter = Arc::new(OpenAiQuizAdapter::new(quiz_llm));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        history: store.clone(),
        mistakes: store.clone(),
        profile: store.clone(),
        settings: store.clone(),
        summary_service: summary_adapter,
        quiz_service: quiz_adapter,
        quiz_sessions: Default::default(),
        generations: Default::default(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .client_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CLIENT_ORIGIN: {}", e)))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/content", post(rest::process_content_handler))
        .route("/history", get(rest::list_history_handler))
        .route(
            "/history/{id}",
            get(rest::get_history_handler).delete(rest::delete_history_handler),
        )
        .route("/history/{id}/style", post(rest::generate_style_handler))
        .route("/quiz/sessions", post(rest::start_quiz_handler))
        .route(
            "/quiz/sessions/{id}",
            get(rest::get_quiz_state_handler).delete(rest::end_quiz_handler),
        )
        .route("/quiz/sessions/{id}/select", post(rest::select_option_handler))
        .route("/quiz/sessions/{id}/submit", post(rest::submit_answer_handler))
        .route("/quiz/sessions/{id}/next", post(rest::next_question_handler))
        .route("/quiz/sessions/{id}/prev", post(rest::prev_question_handler))
        .route(
            "/quiz/sessions/{id}/evaluation",
            post(rest::evaluate_answer_handler),
        )
        .route("/mistakes", get(rest::list_mistakes_handler))
        .route(
            "/mistakes/{question_id}",
            delete(rest::remove_mistake_handler),
        )
        .route(
            "/profile",
            get(rest::get_profile_handler).put(rest::update_profile_handler),
        )
        .route("/profile/courses", post(rest::create_course_handler))
        .route(
            "/profile/courses/{id}",
            delete(rest::delete_course_handler),
        )
        .route(
            "/settings",
            get(rest::get_settings_handler).put(rest::update_settings_handler),
        )
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
