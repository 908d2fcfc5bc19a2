use std::str::FromStr;

use actix_web::{HttpRequest, HttpResponse, get, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        auth::AuthUser,
        jwt::{issue_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, is_duplicate_key},
    model::{role::Role, user::User},
    models::{Claims, LoginReqDto, RegisterReq, TokenPair, TokenType},
};

/// Register a new agent account.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Missing username/password or unknown role"),
        (status = 403, description = "Only agents can self-register"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(pool, user), fields(username = %user.username))]
pub async fn register(
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, ApiError> {
    let username = user.username.trim().to_lowercase();
    if username.is_empty() || user.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password must not be empty".into(),
        ));
    }

    let role = self_registration_role(user.role.as_deref())?;

    let hashed = hash_password(&user.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let result = sqlx::query("INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)")
        .bind(&username)
        .bind(&hashed)
        .bind(role.id())
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {
            info!(%role, "User registered");
            Ok(HttpResponse::Created().json(json!({ "message": "User registered successfully" })))
        }
        Err(e) if is_duplicate_key(&e) => Err(ApiError::Conflict("Username already exists".into())),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        return Err(ApiError::BadRequest("Username or password required".into()));
    }

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await?;

    let db_user = match db_user {
        Some(u) if u.is_active => u,
        _ => {
            info!("Invalid credentials: unknown or inactive user");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    debug!(user_id = db_user.id, "Password verified");

    let pair = issue_pair(
        db_user.id,
        &db_user.username,
        db_user.role_id,
        pool.get_ref(),
        &config,
    )
    .await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");
    Ok(HttpResponse::Ok().json(pair))
}

/// Rotate a refresh token: the presented one is revoked and a new pair issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let claims = refresh_claims(&req, &config)
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".into()))?;

    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()",
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    if revoked.rows_affected() == 0 {
        return Err(ApiError::Unauthorized("Invalid refresh token".into()));
    }

    let pair = issue_pair(claims.user_id, &claims.sub, claims.role, pool.get_ref(), &config).await?;
    Ok(HttpResponse::Ok().json(pair))
}

/// Revoke a refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    if let Some(claims) = refresh_claims(&req, &config) {
        if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
            .bind(&claims.jti)
            .execute(pool.get_ref())
            .await
        {
            error!(error = %e, "Failed to revoke refresh token");
        }
    }

    HttpResponse::NoContent().finish()
}

#[get("/me")]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "user_id": auth.user_id,
        "username": auth.username,
        "role": auth.role,
    }))
}

/// Role given to a self-registered account. Anything above agent has to be
/// granted by an admin through `PUT /api/users/{id}/role`.
fn self_registration_role(requested: Option<&str>) -> Result<Role, ApiError> {
    let Some(name) = requested else {
        return Ok(Role::Agent);
    };

    match Role::from_str(name.trim()) {
        Ok(Role::Agent) => Ok(Role::Agent),
        Ok(_) => Err(ApiError::Forbidden("Only agents can self-register".into())),
        Err(_) => Err(ApiError::BadRequest(format!("Unknown role '{name}'"))),
    }
}

/// Claims of a valid refresh token presented as a bearer token.
fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = req
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    verify_token(token, &config.jwt_secret)
        .ok()
        .filter(|claims| claims.token_type == TokenType::Refresh)
}

async fn issue_pair(
    user_id: u64,
    username: &str,
    role: u8,
    pool: &MySqlPool,
    config: &Config,
) -> Result<TokenPair, ApiError> {
    let sign_error = |e: jsonwebtoken::errors::Error| ApiError::Internal(e.to_string());

    let (access_token, _) = issue_token(
        user_id,
        username,
        role,
        TokenType::Access,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(sign_error)?;

    let (refresh_token, refresh) = issue_token(
        user_id,
        username,
        role,
        TokenType::Refresh,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(sign_error)?;

    debug!(user_id, jti = %refresh.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&refresh.jti)
    .bind(refresh.exp as i64)
    .execute(pool)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}
