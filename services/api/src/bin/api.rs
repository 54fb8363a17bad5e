//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{OpenAiGoalAssistant, PgGoalStore},
    config::Config,
    error::ApiError,
    web::{
        chat_handler, check_in_handler, create_goal_handler, create_step_handler,
        delete_goal_handler, delete_step_handler, list_goals_handler, rest::ApiDoc,
        set_step_handler, state::AppState, stats_handler, undo_check_in_handler,
        update_goal_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{HeaderName, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, patch, post},
    Router,
};
use command_centre_core::ports::GoalAssistant;
use command_centre_core::service::GoalService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
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

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgGoalStore::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Core Service & the Chat Collaborator ---
    let goals = GoalService::new(store);

    let assistant: Option<Arc<dyn GoalAssistant>> = match &config.chat_api_key {
        Some(api_key) => {
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(api_base) = &config.chat_api_base {
                openai_config = openai_config.with_api_base(api_base);
            }
            let client = Client::with_config(openai_config);
            Some(Arc::new(OpenAiGoalAssistant::new(
                client,
                config.chat_model.clone(),
            )))
        }
        None => {
            warn!("CHAT_API_KEY not set; the /chat endpoint will answer 503.");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        goals,
        assistant,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .allowed_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {}", e)))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static("x-user-id"),
        ]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/goals", get(list_goals_handler).post(create_goal_handler))
        .route(
            "/goals/{goal_id}",
            patch(update_goal_handler).delete(delete_goal_handler),
        )
        .route("/goals/{goal_id}/steps", post(create_step_handler))
        .route(
            "/goals/{goal_id}/steps/{step_id}",
            patch(set_step_handler).delete(delete_step_handler),
        )
        .route("/goals/{goal_id}/check-ins", post(check_in_handler))
        .route(
            "/goals/{goal_id}/check-ins/{date}",
            delete(undo_check_in_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/chat", post(chat_handler))
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
