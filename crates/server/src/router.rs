use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Uploads are capped at 50 MiB.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Vector collections
        .route(
            "/collections",
            get(handlers::list_collections_handler).post(handlers::create_collection_handler),
        )
        .route(
            "/collections/{name}",
            get(handlers::get_collection_handler).delete(handlers::delete_collection_handler),
        )
        .route(
            "/collections/{name}/documents",
            get(handlers::list_documents_handler).post(handlers::add_documents_handler),
        )
        .route(
            "/collections/{name}/query",
            post(handlers::query_collection_handler),
        )
        // Content library and indexing
        .route(
            "/content-items",
            get(handlers::list_content_items_handler).post(handlers::create_content_item_handler),
        )
        .route(
            "/content-items/{id}",
            get(handlers::get_content_item_handler).delete(handlers::delete_content_item_handler),
        )
        .route(
            "/content-items/{id}/reindex",
            post(handlers::reindex_content_item_handler),
        )
        .route("/content/index", post(handlers::index_content_handler))
        .route("/content/process", post(handlers::process_content_handler))
        .route("/index/jobs", get(handlers::list_jobs_handler))
        .route("/index/jobs/{id}", get(handlers::get_job_handler))
        // Media
        .route("/media/analyze", post(handlers::analyze_media_handler))
        .route(
            "/media/upload",
            post(handlers::upload_media_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/media/download", post(handlers::download_media_handler))
        // Campaigns and chat
        .route(
            "/campaigns",
            get(handlers::list_campaigns_handler).post(handlers::create_campaign_handler),
        )
        .route(
            "/campaigns/{id}",
            get(handlers::get_campaign_handler)
                .put(handlers::update_campaign_handler)
                .delete(handlers::delete_campaign_handler),
        )
        .route(
            "/campaigns/{id}/messages",
            get(handlers::list_messages_handler).post(handlers::create_messages_handler),
        )
        .route("/chat", post(handlers::chat_handler))
        // Integrations
        .route("/social/accounts", get(handlers::social_accounts_handler))
        .route("/social/actions", post(handlers::social_action_handler))
        .route("/web/search", post(handlers::web_search_handler))
        .route("/web/scrape", post(handlers::web_scrape_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
