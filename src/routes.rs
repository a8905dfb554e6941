use crate::rooms::{
    create_availability, create_room, create_user, create_user_with_option, get_dates,
    get_room_state, update_user_with_option,
};
use crate::startup::AppState;
use crate::ws::room_socket;
use axum::{
    Router,
    extract::Extension,
    http::{
        Method, StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build the full router with every route and layer.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/users", post(create_user))
        .route(
            "/userOption",
            post(create_user_with_option).put(update_user_with_option),
        )
        .route("/userAvailability", post(create_availability))
        .route("/roomState", get(get_room_state))
        .route("/dates", get(get_dates))
        .route("/ws", get(room_socket))
        .layer(Extension(app_state))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_credentials(true)
                .allow_methods([
                    Method::POST,
                    Method::GET,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, ACCEPT, AUTHORIZATION]),
        )
        .fallback(handler_404)
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
