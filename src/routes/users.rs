/// User Routes
///
/// Account endpoints under `/api/v1/users`. Tokens are returned in the JSON
/// body and also set as HTTP-only cookies; the refresh endpoint accepts the
/// refresh token from either place.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::account::{AccountService, ProfileImage};
use crate::auth::{AccessClaims, AuthService, Registration, TokenIssuer, TokenPair};
use crate::error::{AppError, ValidationError};
use crate::middleware::ACCESS_TOKEN_COOKIE;
use crate::store::PublicUser;
use crate::validators::require;

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Envelope for every successful response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status_code: u16, data: T, message: &str) -> Self {
        Self {
            status_code,
            data,
            message: message.to_string(),
            success: status_code < 400,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// HTTP-only cookie that lives as long as the token it carries
fn auth_cookie(name: &'static str, value: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new(), 0);
    cookie.make_removal();
    cookie
}

fn with_token_cookies<T: Serialize>(
    tokens: &TokenPair,
    issuer: &TokenIssuer,
    body: ApiResponse<T>,
) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(auth_cookie(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            issuer.access_token_expiry(),
        ))
        .cookie(auth_cookie(
            REFRESH_TOKEN_COOKIE,
            tokens.refresh_token.clone(),
            issuer.refresh_token_expiry(),
        ))
        .json(body)
}

/// POST /api/v1/users/register
///
/// # Errors
/// - 400: missing or malformed field
/// - 409: username or email already registered
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let registration = Registration {
        username: require("username", form.username.as_deref())?,
        email: require("email", form.email.as_deref())?,
        fullname: require("fullname", form.fullname.as_deref())?,
        password: form
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ValidationError::EmptyField("password".to_string()))?,
        avatar: require("avatar", form.avatar.as_deref())?,
        cover_image: form.cover_image,
    };

    let user = auth.register(registration).await?;

    Ok(HttpResponse::Created().json(ApiResponse::new(201, user, "User registered successfully")))
}

/// POST /api/v1/users/login
///
/// Accepts `username` or `email` with `password`.
///
/// # Errors
/// - 400: neither username nor email, or no password
/// - 404: user not found
/// - 401: wrong password
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();

    let identifier = form
        .email
        .filter(|e| !e.trim().is_empty())
        .or(form.username)
        .unwrap_or_default();
    let password = form.password.unwrap_or_default();

    let (tokens, user) = auth.login(&identifier, &password).await?;

    tracing::info!(user_id = %user.id, "Login response issued");

    let body = ApiResponse::new(
        200,
        LoginResponse {
            user,
            tokens: tokens.clone(),
        },
        "User logged in successfully",
    );
    Ok(with_token_cookies(&tokens, auth.issuer(), body))
}

/// POST /api/v1/users/refresh-token
///
/// # Errors
/// - 400: no refresh token in cookie or body
/// - 401: invalid, expired or superseded refresh token
pub async fn refresh_token(
    req: HttpRequest,
    form: Option<web::Json<RefreshRequest>>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let presented = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| form.and_then(|f| f.into_inner().refresh_token))
        .unwrap_or_default();

    let tokens = auth.refresh(&presented).await?;

    let body = ApiResponse::new(200, tokens.clone(), "Access token refreshed successfully");
    Ok(with_token_cookies(&tokens, auth.issuer(), body))
}

/// POST /api/v1/users/logout
///
/// **Requires valid access token.**
pub async fn logout(
    claims: web::ReqData<AccessClaims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    auth.logout(user_id).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(ApiResponse::new(200, serde_json::json!({}), "User logged out successfully")))
}

/// GET /api/v1/users/current-user
pub async fn current_user(
    claims: web::ReqData<AccessClaims>,
    account: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let user = account.current_user(claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(200, user, "User fetched successfully")))
}

/// POST /api/v1/users/change-password
///
/// # Errors
/// - 400: missing old or new password
/// - 401: old password does not match
pub async fn change_password(
    claims: web::ReqData<AccessClaims>,
    form: web::Json<ChangePasswordRequest>,
    account: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let old_password = form
        .old_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::EmptyField("oldPassword".to_string()))?;
    let new_password = form
        .new_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::EmptyField("newPassword".to_string()))?;

    account
        .change_password(claims.user_id()?, &old_password, &new_password)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        200,
        serde_json::json!({}),
        "Password changed successfully",
    )))
}

/// PATCH /api/v1/users/update-account
pub async fn update_account(
    claims: web::ReqData<AccessClaims>,
    form: web::Json<UpdateAccountRequest>,
    account: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let user = account
        .update_account_details(
            claims.user_id()?,
            form.fullname.as_deref(),
            form.email.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(200, user, "Account details updated successfully")))
}

async fn update_image(
    req: HttpRequest,
    body: web::Bytes,
    claims: web::ReqData<AccessClaims>,
    account: web::Data<AccountService>,
    image: ProfileImage,
) -> Result<HttpResponse, AppError> {
    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let user = account
        .update_image(claims.user_id()?, image, body.to_vec(), &content_type)
        .await?;

    let message = match image {
        ProfileImage::Avatar => "Avatar updated successfully",
        ProfileImage::CoverImage => "Cover image updated successfully",
    };
    Ok(HttpResponse::Ok().json(ApiResponse::new(200, user, message)))
}

/// PATCH /api/v1/users/avatar
///
/// Body is the raw image; `Content-Type` is forwarded to the media host.
pub async fn update_avatar(
    req: HttpRequest,
    body: web::Bytes,
    claims: web::ReqData<AccessClaims>,
    account: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    update_image(req, body, claims, account, ProfileImage::Avatar).await
}

/// PATCH /api/v1/users/cover-image
pub async fn update_cover_image(
    req: HttpRequest,
    body: web::Bytes,
    claims: web::ReqData<AccessClaims>,
    account: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    update_image(req, body, claims, account, ProfileImage::CoverImage).await
}
