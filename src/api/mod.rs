pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    Router,
    routing::{get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use middleware::auth::{optional_auth, require_admin, require_auth};
use state::AppState;

/// Multipart framing on top of the largest accepted image.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        .nest("/api", api_routes(state.clone()))

        .with_state(state)

        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes(state.clone()))
        .nest("/classes", class_routes(state.clone()))
        .nest("/categories", category_routes(state.clone()))
        .nest("/trainers", trainer_routes())
        .nest("/reviews", review_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/payment", payment_routes(state.clone()))
        .nest("/stripe", stripe_routes())
        .nest("/contact", contact_routes(state))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/request-password-reset", post(handlers::auth::request_password_reset))
        .route("/verify-reset-token", post(handlers::auth::verify_reset_token))
        .route("/reset-password", post(handlers::auth::reset_password))
        .merge(
            Router::new()
                .route("/reissue-token", post(handlers::auth::reissue_token))
                .route_layer(from_fn_with_state(state, require_auth)),
        )
}

fn class_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::classes::list))
        .route("/listclassupcoming", get(handlers::classes::list_upcoming))
        .route("/:class_id", get(handlers::classes::get))
        .route("/:class_id/enrollments", get(handlers::classes::enrollments));

    let optional = Router::new()
        .route("/trainer/:trainer_id", get(handlers::classes::trainer_classes))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let members = Router::new()
        .route("/my-classes", get(handlers::classes::my_classes))
        .route(
            "/:class_id/enroll",
            post(handlers::classes::enroll).delete(handlers::classes::unenroll),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/", post(handlers::classes::create))
        .route(
            "/:class_id",
            put(handlers::classes::update).delete(handlers::classes::delete),
        )
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(optional).merge(members).merge(admin)
}

fn category_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::categories::list))
        .route("/:id", get(handlers::categories::get));

    let admin = Router::new()
        .route("/", post(handlers::categories::create))
        .route(
            "/:id",
            put(handlers::categories::update).delete(handlers::categories::delete),
        )
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(admin)
}

fn trainer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::trainers::list))
        .route("/:trainer_id", get(handlers::trainers::get))
}

fn review_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::reviews::list))
        .route("/summary", get(handlers::reviews::summary))
        .route("/trainer/:trainer_id", get(handlers::reviews::for_trainer));

    let members = Router::new()
        .route("/", post(handlers::reviews::create))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/:review_id", axum::routing::delete(handlers::reviews::delete))
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(members).merge(admin)
}

fn user_routes(state: AppState) -> Router<AppState> {
    // The handler authenticates the caller itself once the ids are valid.
    let public = Router::new()
        .route("/:id", get(handlers::users::get))
        .route("/:id/classes", get(handlers::users::classes))
        .route(
            "/:id/classes/:class_id",
            axum::routing::delete(handlers::users::cancel_enrollment),
        );

    let members = Router::new()
        .route("/change-password", post(handlers::users::change_password))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/", get(handlers::users::list))
        .route("/roles", get(handlers::users::roles))
        .route("/:id/role", put(handlers::users::update_role))
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(members).merge(admin)
}

fn payment_routes(state: AppState) -> Router<AppState> {
    let upload_limit = state.settings.uploads.max_file_size + MULTIPART_OVERHEAD;

    let public = Router::new()
        .route("/", post(handlers::payments::upload))
        .layer(DefaultBodyLimit::max(upload_limit));

    let admin = Router::new()
        .route("/", get(handlers::payments::list))
        .route("/all", get(handlers::payments::list_all))
        .route("/:payment_id/image", get(handlers::payments::image))
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(admin)
}

fn stripe_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(handlers::stripe::checkout))
        .route("/webhook", post(handlers::stripe::webhook))
        .route("/verify", get(handlers::stripe::verify))
        .route("/plans", get(handlers::stripe::plans))
}

fn contact_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", post(handlers::contact::submit));

    let admin = Router::new()
        .route("/", get(handlers::contact::list))
        .route_layer(from_fn_with_state(state, require_admin));

    public.merge(admin)
}
