use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use tripbi_api::auth::{self, AppState, AppStateInner};
use tripbi_api::email::EmailClient;
use tripbi_api::middleware::require_auth;
use tripbi_api::splitbi::SplitbiClient;
use tripbi_api::{bookings, invitations, proposals, splitbi, timelines, trips, uploads};
use tripbi_gateway::connection;
use tripbi_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    db: Arc<tripbi_db::Database>,
    jwt_secret: String,
}

/// Proof uploads are capped at 5 MB by validation; the transport limit sits
/// above that so an oversized file still reaches the handler and gets the
/// proper rejection instead of a bare 413.
const PROOF_BODY_LIMIT: usize = 8 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripbi=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("TRIPBI_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("TRIPBI_DB_PATH").unwrap_or_else(|_| "tripbi.db".into());
    let host = std::env::var("TRIPBI_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TRIPBI_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let app_url = std::env::var("TRIPBI_APP_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));
    let upload_dir =
        PathBuf::from(std::env::var("TRIPBI_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()));

    // Optional integrations
    let splitbi_client = match (
        std::env::var("SPLITBI_API_URL"),
        std::env::var("SPLITBI_API_KEY"),
    ) {
        (Ok(url), Ok(key)) => {
            info!("Expense tracking enabled via {}", url);
            Some(SplitbiClient::new(url, key))
        }
        _ => None,
    };
    let email_client = match std::env::var("RESEND_API_KEY") {
        Ok(key) => {
            let from = std::env::var("TRIPBI_EMAIL_FROM")
                .unwrap_or_else(|_| "TripBi <invites@tripbi.app>".into());
            info!("Invitation email enabled from {}", from);
            Some(EmailClient::new(key, from))
        }
        Err(_) => None,
    };

    // Init database
    let db = Arc::new(tripbi_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        dispatcher: dispatcher.clone(),
        jwt_secret: jwt_secret.clone(),
        app_url,
        upload_dir: upload_dir.clone(),
        splitbi: splitbi_client,
        email: email_client,
    });

    let state = ServerState {
        dispatcher: dispatcher.clone(),
        db,
        jwt_secret: jwt_secret.clone(),
    };

    let app = Router::new()
        .merge(rest_router(app_state))
        .merge(ws_route(state))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("TripBi server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// All HTTP API routes, public and authenticated.
fn rest_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/invite/{token}", get(invitations::invitation_status))
        .route("/shared/{token}", get(timelines::shared_timeline))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/trips", get(trips::list_trips).post(trips::create_trip))
        .route(
            "/trips/{trip_id}",
            get(trips::get_trip)
                .put(trips::update_trip)
                .delete(trips::delete_trip),
        )
        .route("/trips/{trip_id}/proposals", post(proposals::create_proposal))
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}",
            put(proposals::update_proposal),
        )
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}/status",
            post(proposals::change_status),
        )
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}/vote",
            put(proposals::cast_vote),
        )
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}/reaction",
            put(proposals::set_reaction),
        )
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}/comments",
            post(proposals::add_comment),
        )
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}/comments/{comment_id}",
            put(proposals::edit_comment).delete(proposals::delete_comment),
        )
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}/booking",
            put(bookings::upsert_booking),
        )
        .route(
            "/trips/{trip_id}/proposals/{proposal_id}/booking/proof",
            post(uploads::upload_proof).layer(DefaultBodyLimit::max(PROOF_BODY_LIMIT)),
        )
        .route("/trips/{trip_id}/bookings", get(bookings::list_trip_bookings))
        .route("/bookings", get(bookings::list_my_bookings))
        .route(
            "/trips/{trip_id}/invitations",
            post(invitations::create_invitation),
        )
        .route("/invite/{token}/accept", post(invitations::accept_invitation))
        .route("/trips/{trip_id}/timeline", get(timelines::get_timeline))
        .route(
            "/trips/{trip_id}/timeline/share",
            post(timelines::share_timeline),
        )
        .route("/trips/{trip_id}/expenses", get(splitbi::list_trip_expenses))
        .route(
            "/trips/{trip_id}/expenses/link",
            post(splitbi::link_expense_group),
        )
        .route(
            "/trips/{trip_id}/expenses/summary",
            get(splitbi::expense_summary),
        )
        .route("/timezones", get(trips::list_timezones))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    Router::new().merge(public_routes).merge(protected_routes)
}

fn ws_route(state: ServerState) -> Router {
    Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state)
}

async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.db, state.jwt_secret)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use tripbi_db::models::{BookingRow, ProposalRow, TripMemberRow, TripRow};

    // Matches the middleware's fallback secret when TRIPBI_JWT_SECRET is unset.
    const TEST_SECRET: &str = "dev-secret-change-me";

    /// In-memory database seeded with one user, their trip, a proposal, and a
    /// pending booking ready to receive a proof upload.
    fn seeded_state() -> (AppState, String, Uuid, Uuid) {
        let db = Arc::new(tripbi_db::Database::open_in_memory().unwrap());

        let user_id = Uuid::new_v4();
        let trip_id = Uuid::new_v4();
        let proposal_id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        db.create_user(
            &user_id.to_string(),
            "traveler@example.com",
            None,
            "unused-hash",
            &now,
        )
        .unwrap();

        db.create_trip(
            &TripRow {
                id: trip_id.to_string(),
                name: "Japan".into(),
                destination: "Tokyo".into(),
                description: None,
                start_date: now.clone(),
                end_date: (Utc::now() + chrono::Duration::days(7)).to_rfc3339(),
                created_by: user_id.to_string(),
                created_at: now.clone(),
                updated_at: now.clone(),
                status: "planning".into(),
                splitbi_group_id: None,
                home_timezone: None,
                destination_timezone: None,
                show_home_time: None,
            },
            &TripMemberRow {
                trip_id: trip_id.to_string(),
                user_id: user_id.to_string(),
                email: "traveler@example.com".into(),
                display_name: None,
                role: "admin".into(),
                joined_at: now.clone(),
            },
        )
        .unwrap();

        db.insert_proposal(&ProposalRow {
            id: proposal_id.to_string(),
            trip_id: trip_id.to_string(),
            category: "hotels".into(),
            status: "proposed".into(),
            title: "Ryokan".into(),
            description: String::new(),
            location: None,
            price: None,
            link: None,
            created_by: user_id.to_string(),
            created_at: now.clone(),
            updated_at: now.clone(),
            scheduled_date: None,
            scheduled_time: None,
        })
        .unwrap();

        db.upsert_booking(&BookingRow {
            id: format!("{trip_id}-{proposal_id}-{user_id}"),
            trip_id: trip_id.to_string(),
            proposal_id: proposal_id.to_string(),
            user_id: user_id.to_string(),
            status: "pending".into(),
            confirmation_number: None,
            proof_url: None,
            notes: None,
            booked_for_count: 1,
            booked_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
        .unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db,
            dispatcher: Dispatcher::new(),
            jwt_secret: TEST_SECRET.into(),
            app_url: "http://localhost:3000".into(),
            upload_dir: std::env::temp_dir().join(format!("tripbi-test-{}", Uuid::new_v4())),
            splitbi: None,
            email: None,
        });

        let token = auth::create_token(TEST_SECRET, user_id, "traveler@example.com", None).unwrap();
        (state, token, trip_id, proposal_id)
    }

    fn proof_upload_request(
        trip_id: Uuid,
        proposal_id: Uuid,
        token: &str,
        file_size: usize,
    ) -> Request<Body> {
        let boundary = "tripbi-proof-boundary";
        let mut body = Vec::with_capacity(file_size + 256);
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"proof.png\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&vec![0u8; file_size]);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(format!(
                "/trips/{trip_id}/proposals/{proposal_id}/booking/proof"
            ))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_proof_upload_accepts_a_4mb_file() {
        let (state, token, trip_id, proposal_id) = seeded_state();
        let app = rest_router(state);

        let response = app
            .oneshot(proof_upload_request(
                trip_id,
                proposal_id,
                &token,
                4 * 1024 * 1024,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_proof_upload_rejects_an_oversized_file_with_validation() {
        let (state, token, trip_id, proposal_id) = seeded_state();
        let app = rest_router(state);

        let response = app
            .oneshot(proof_upload_request(
                trip_id,
                proposal_id,
                &token,
                6 * 1024 * 1024,
            ))
            .await
            .unwrap();

        // The size cap is enforced by validation, not the transport layer.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_protected_routes_require_a_token() {
        let (state, _token, trip_id, _) = seeded_state();
        let app = rest_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/trips/{trip_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
