use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use tripbi_db::Database;
use tripbi_gateway::Dispatcher;
use tripbi_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::email::EmailClient;
use crate::error::{ApiError, ApiResult, blocking};
use crate::splitbi::SplitbiClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    /// Public base URL, used to build invite and share links.
    pub app_url: String,
    pub upload_dir: PathBuf,
    /// Expense-tracking integration; `None` when not configured.
    pub splitbi: Option<SplitbiClient>,
    /// Outbound email; `None` when not configured.
    pub email: Option<EmailClient>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if !tripbi_core::validation::is_valid_email(&req.email) {
        return Err(ApiError::Validation("invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let user_id = Uuid::new_v4();

    // Argon2 hashing is CPU-bound; run it with the db work off the runtime
    let db = state.db.clone();
    let email = req.email.clone();
    let display_name = req.display_name.clone();
    let password = req.password;
    blocking(move || {
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("email is already registered".into()));
        }
        let password_hash = hash_password(&password)?;
        db.create_user(
            &user_id.to_string(),
            &email,
            display_name.as_deref(),
            &password_hash,
            &chrono::Utc::now().to_rfc3339(),
        )?;
        Ok(())
    })
    .await?;

    let token = create_token(
        &state.jwt_secret,
        user_id,
        &req.email,
        req.display_name.as_deref(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let email = req.email.clone();
    let password = req.password;
    let user = blocking(move || {
        let user = db.get_user_by_email(&email)?.ok_or(ApiError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {}", e))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("bad user id in db: {}", e))?;

    let token = create_token(
        &state.jwt_secret,
        user_id,
        &user.email,
        user.display_name.as_deref(),
    )?;

    Ok(Json(LoginResponse {
        user_id,
        email: user.email,
        display_name: user.display_name,
        token,
    }))
}

/// Hash a password with Argon2id. `OsRng` draws the salt from the OS CSPRNG.
fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    display_name: Option<&str>,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        display_name: display_name.map(|s| s.to_string()),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_verifies_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();

        assert!(
            Argon2::default()
                .verify_password(b"correct horse battery", &parsed)
                .is_ok()
        );
        assert!(
            Argon2::default()
                .verify_password(b"wrong password", &parsed)
                .is_err()
        );
    }

    #[test]
    fn test_salts_are_unique_per_hash() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }
}
