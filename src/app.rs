use std::net::SocketAddr;

use axum::{
    http::{header, HeaderName},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{images, meals};

pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive().expose_headers([HeaderName::from_static("location")]);

    Router::new()
        .nest(
            "/meal-manager-api",
            Router::new().merge(images::router()).merge(meals::router()),
        )
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let has_auth = req.headers().contains_key(header::AUTHORIZATION);
                    tracing::info_span!("http_request", %method, uri = %uri, has_auth, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImageId;
    use crate::error::ErrorResponse;
    use crate::images::dto::UploadUrlResponse;
    use crate::meals::dto::{MealResponse, MealsResponse};
    use crate::testing::{bearer, TestHarness};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body<T: DeserializeOwned>(res: Response) -> T {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn curry() -> serde_json::Value {
        json!({
            "dishName": "Curry rice",
            "cookedAt": "2025-11-09T12:00:00Z",
            "memo": "made from spices"
        })
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let app = build_app(TestHarness::new().state);
        let res = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_token() {
        let app = build_app(TestHarness::new().state);

        let res = send(&app, Method::GET, "/meal-manager-api/meals", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let err: ErrorResponse = json_body(res).await;
        assert_eq!(err.code, "UNAUTHORIZED");

        let res = send(
            &app,
            Method::GET,
            "/meal-manager-api/images/upload-url",
            Some("Basic dXNlcjpwYXNz"),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = send(
            &app,
            Method::GET,
            "/meal-manager-api/meals",
            Some("Bearer not-a-token"),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn first_request_provisions_user_once() {
        let h = TestHarness::new();
        let app = build_app(h.state.clone());
        let auth = bearer("auth0|test-user-123");

        for _ in 0..2 {
            let res = send(&app, Method::GET, "/meal-manager-api/meals", Some(&auth), None).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        assert_eq!(h.users.len(), 1);
    }

    #[tokio::test]
    async fn blank_subject_is_unauthorized() {
        let h = TestHarness::new();
        let app = build_app(h.state.clone());
        let res = send(
            &app,
            Method::GET,
            "/meal-manager-api/meals",
            Some(&bearer("  ")),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.users.len(), 0);
    }

    #[tokio::test]
    async fn upload_then_create_meal_with_image() {
        let h = TestHarness::new();
        let app = build_app(h.state.clone());
        let auth = bearer("auth0|test-user-123");

        let res = send(
            &app,
            Method::GET,
            "/meal-manager-api/images/upload-url",
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let upload: UploadUrlResponse = json_body(res).await;
        assert!(upload.presigned_url.contains(&upload.image_id.to_string()));

        // the client PUTs to the presigned url
        h.store.client_uploaded(ImageId(upload.image_id));

        let mut body = curry();
        body["imageId"] = json!(upload.image_id);
        let res = send(
            &app,
            Method::POST,
            "/meal-manager-api/meals",
            Some(&auth),
            Some(body),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res.headers()[header::LOCATION].to_str().unwrap().to_string();
        let created: MealResponse = json_body(res).await;

        assert_eq!(location, format!("/meal-manager-api/meals/{}", created.meal_id));
        assert_eq!(created.image_id, Some(upload.image_id));
        assert_eq!(
            created.image_url,
            Some(format!("https://cdn.test/{}", upload.image_id))
        );
        assert_eq!(h.store.copied(), vec![ImageId(upload.image_id)]);

        let res = send(&app, Method::GET, &location, Some(&auth), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let fetched: MealResponse = json_body(res).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_meal_validation_error_shape() {
        let app = build_app(TestHarness::new().state);
        let mut body = curry();
        body["dishName"] = json!("x".repeat(101));

        let res = send(
            &app,
            Method::POST,
            "/meal-manager-api/meals",
            Some(&bearer("auth0|test-user-123")),
            Some(body),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: ErrorResponse = json_body(res).await;
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert_eq!(err.message, "Dish name cannot be longer than 100 characters");
    }

    #[tokio::test]
    async fn create_meal_with_missing_upload_fails() {
        let h = TestHarness::new();
        let app = build_app(h.state.clone());
        let mut body = curry();
        body["imageId"] = json!(uuid::Uuid::new_v4());

        let res = send(
            &app,
            Method::POST,
            "/meal-manager-api/meals",
            Some(&bearer("auth0|test-user-123")),
            Some(body),
        )
        .await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: ErrorResponse = json_body(res).await;
        assert_eq!(err.code, "FAILED_TO_COPY_IMAGE");
        assert_eq!(h.meals.len(), 0);
    }

    #[tokio::test]
    async fn meals_are_private_to_their_owner() {
        let app = build_app(TestHarness::new().state);
        let me = bearer("auth0|test-user-123");
        let other = bearer("auth0|other-user");

        let res = send(&app, Method::POST, "/meal-manager-api/meals", Some(&me), Some(curry())).await;
        let mine: MealResponse = json_body(res).await;

        let res = send(&app, Method::GET, "/meal-manager-api/meals", Some(&other), None).await;
        let listed: MealsResponse = json_body(res).await;
        assert!(listed.meals.is_empty());

        let uri = format!("/meal-manager-api/meals/{}", mine.meal_id);
        let res = send(&app, Method::GET, &uri, Some(&other), None).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let err: ErrorResponse = json_body(res).await;
        assert_eq!(err.code, "FORBIDDEN");

        let res = send(&app, Method::GET, "/meal-manager-api/meals", Some(&me), None).await;
        let listed: MealsResponse = json_body(res).await;
        assert_eq!(listed.meals, vec![mine]);
    }

    #[tokio::test]
    async fn unknown_meal_is_not_found() {
        let app = build_app(TestHarness::new().state);
        let uri = format!("/meal-manager-api/meals/{}", uuid::Uuid::new_v4());
        let res = send(
            &app,
            Method::GET,
            &uri,
            Some(&bearer("auth0|test-user-123")),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let err: ErrorResponse = json_body(res).await;
        assert_eq!(err.code, "MEAL_NOT_FOUND");
    }

    #[tokio::test]
    async fn list_supports_date_filter() {
        let app = build_app(TestHarness::new().state);
        let auth = bearer("auth0|test-user-123");
        for at in ["2025-11-09T08:00:00Z", "2025-11-10T08:00:00Z"] {
            let mut body = curry();
            body["cookedAt"] = json!(at);
            let res = send(&app, Method::POST, "/meal-manager-api/meals", Some(&auth), Some(body)).await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = send(
            &app,
            Method::GET,
            "/meal-manager-api/meals?startDate=2025-11-10",
            Some(&auth),
            None,
        )
        .await;
        let listed: MealsResponse = json_body(res).await;
        assert_eq!(listed.meals.len(), 1);

        let res = send(
            &app,
            Method::GET,
            "/meal-manager-api/meals?startDate=nope",
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn complete_upload_route() {
        let h = TestHarness::new();
        let app = build_app(h.state.clone());
        let id = ImageId::generate();
        h.store.client_uploaded(id);

        let uri = format!("/meal-manager-api/images/{id}/upload/complete");
        let res = send(
            &app,
            Method::POST,
            &uri,
            Some(&bearer("auth0|test-user-123")),
            None,
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = json_body(res).await;
        assert_eq!(body["imageUrl"], format!("https://cdn.test/{id}"));
    }
}
