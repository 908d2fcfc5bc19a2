use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "maria")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    /// Only `agent` is accepted; other roles are granted by an admin.
    #[schema(example = "agent")]
    pub role: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RoleChangeReq {
    /// `admin`, `supervisor` or `agent`
    #[schema(example = "supervisor")]
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "maria")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
