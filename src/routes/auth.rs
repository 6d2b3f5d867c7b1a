use actix_web::{HttpResponse, patch, post, web};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{accounts, revoked_tokens};
use crate::routes::error_response;
use crate::services::ServiceError;
use crate::services::email_service::EmailService;
use crate::services::google_auth::GoogleAuthService;
use crate::services::otp_service::{DEFAULT_EXPIRY_MINUTES, OtpService};
use crate::utils::{jwt, password};

// DTO pour l'inscription
#[derive(Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub account_type: String,
    #[validate(custom(function = validate_password_strength))]
    pub password: String,
}

// DTO pour la connexion
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

// DTO pour la vérification d'OTP (scopé par compte: email + code)
#[derive(Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 4))]
    pub code: String,
}

#[derive(Deserialize, Validate)]
pub struct ResendOtpRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 4))]
    pub code: String,
    #[validate(custom(function = validate_password_strength))]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct GoogleAuthRequest {
    pub auth_token: String,
}

/// Au moins 8 caractères, une majuscule, une minuscule, un chiffre et
/// un caractère spécial
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c));

    if password.len() >= 8 && has_lower && has_upper && has_digit && has_special {
        Ok(())
    } else {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(
            "Password must contain at least 8 characters, one uppercase letter, \
             one lowercase letter, one digit and one special character"
                .into(),
        );
        Err(error)
    }
}

/// POST /auth/signup - Créer un compte (PUBLIC)
/// Envoie un OTP de vérification par email. Le compte, l'OTP et l'envoi
/// de l'email forment un seul bloc: si l'email ne part pas, rien n'est créé.
#[post("/signup")]
pub async fn signup(
    body: web::Json<SignUpRequest>,
    db: web::Data<DatabaseConnection>,
    email_service: web::Data<EmailService>,
) -> HttpResponse {
    // 1. Validation des champs
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    if !accounts::ACCOUNT_TYPES.contains(&body.account_type.as_str()) {
        return error_response(&ServiceError::Validation(
            "Invalid account type. Must be one of: ADMIN, SELLER, BUYER".to_string(),
        ));
    }

    // 2. L'email doit être unique
    match accounts::Entity::find()
        .filter(accounts::Column::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return error_response(&ServiceError::Conflict("Email already exists".to_string()));
        }
        Ok(None) => {}
        Err(e) => return error_response(&ServiceError::Db(e)),
    }

    // 3. Hash du mot de passe (format Django)
    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => return error_response(&ServiceError::Internal(e)),
    };

    // 4. Compte + OTP + email dans une transaction DB
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let now = Utc::now();
    let account = accounts::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(body.name.clone()),
        email: Set(body.email.clone()),
        account_type: Set(body.account_type.clone()),
        password_hash: Set(password_hash),
        email_verified: Set(false),
        auth_type: Set("email".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let account = match account.insert(&txn).await {
        Ok(account) => account,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let otp = match OtpService::generate(&txn, account.id, DEFAULT_EXPIRY_MINUTES).await {
        Ok(otp) => otp,
        Err(e) => return error_response(&e),
    };

    if let Err(e) = email_service
        .send_verification_email(&account.name, &account.email, &otp.code)
        .await
    {
        // La transaction est annulée au drop: pas de compte sans email
        return error_response(&e);
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Created().json(serde_json::json!({
        "message": "Account created successfully, check your email for verification"
    }))
}

/// POST /auth/login - Se connecter (PUBLIC)
/// Refuse les comptes dont l'email n'est pas encore vérifié
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    // 1. Trouver le compte
    let account = match accounts::Entity::find()
        .filter(accounts::Column::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            return error_response(&ServiceError::Authentication(
                "Incorrect email or password".to_string(),
            ));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    // 2. Vérifier le mot de passe (les comptes Google n'en ont pas)
    if account.password_hash.is_empty() {
        return error_response(&ServiceError::Authentication(
            "Incorrect email or password".to_string(),
        ));
    }

    match password::verify_password(&body.password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return error_response(&ServiceError::Authentication(
                "Incorrect email or password".to_string(),
            ));
        }
        Err(e) => return error_response(&ServiceError::Internal(e)),
    }

    // 3. L'email doit avoir été vérifié
    if !account.email_verified {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Your email address has not been verified. Please check your inbox \
                        for the verification email or use the Resend Verification option if needed.",
            "status": "unverified",
        }));
    }

    // 4. Générer la paire de tokens
    let tokens = match jwt::generate_token_pair(&account) {
        Ok(tokens) => tokens,
        Err(e) => return error_response(&ServiceError::Internal(e)),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged in successfully",
        "tokens": tokens,
    }))
}

/// POST /auth/verify-otp - Vérifier un compte avec un OTP (PUBLIC)
/// Marque l'email vérifié et retourne une paire de tokens
#[post("/verify-otp")]
pub async fn verify_otp(
    body: web::Json<VerifyOtpRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    // 1. Le compte doit exister
    let account = match accounts::Entity::find()
        .filter(accounts::Column::Email.eq(&body.email))
        .one(&txn)
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            return error_response(&ServiceError::NotFound("Account not found".to_string()));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    // 2. Vérifier et consommer l'OTP (scopé compte + code)
    if let Err(e) = OtpService::verify(&txn, account.id, &body.code).await {
        return error_response(&e);
    }

    // 3. Marquer l'email vérifié
    let mut active: accounts::ActiveModel = account.into();
    active.email_verified = Set(true);
    active.updated_at = Set(Utc::now());
    let account = match active.update(&txn).await {
        Ok(account) => account,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    let tokens = match jwt::generate_token_pair(&account) {
        Ok(tokens) => tokens,
        Err(e) => return error_response(&ServiceError::Internal(e)),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "message": "OTP Verified successfully",
        "tokens": tokens,
    }))
}

/// POST /auth/resend-otp - Renvoyer un OTP de vérification (PUBLIC)
#[post("/resend-otp")]
pub async fn resend_otp(
    body: web::Json<ResendOtpRequest>,
    db: web::Data<DatabaseConnection>,
    email_service: web::Data<EmailService>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let account = match accounts::Entity::find()
        .filter(accounts::Column::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            return error_response(&ServiceError::NotFound("Account not found".to_string()));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if account.email_verified {
        return error_response(&ServiceError::Validation(
            "Email already verified".to_string(),
        ));
    }

    // Nouveau code (invalide les précédents) + envoi, dans une transaction
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let otp = match OtpService::generate(&txn, account.id, DEFAULT_EXPIRY_MINUTES).await {
        Ok(otp) => otp,
        Err(e) => return error_response(&e),
    };

    if let Err(e) = email_service
        .send_verification_email(&account.name, &account.email, &otp.code)
        .await
    {
        return error_response(&e);
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(serde_json::json!({ "message": "OTP resent successfully" }))
}

/// POST /auth/forgot-password - Demander un reset de mot de passe (PUBLIC)
#[post("/forgot-password")]
pub async fn forgot_password(
    body: web::Json<ForgotPasswordRequest>,
    db: web::Data<DatabaseConnection>,
    email_service: web::Data<EmailService>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let account = match accounts::Entity::find()
        .filter(accounts::Column::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            return error_response(&ServiceError::NotFound("Account not found".to_string()));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let otp = match OtpService::generate(&txn, account.id, DEFAULT_EXPIRY_MINUTES).await {
        Ok(otp) => otp,
        Err(e) => return error_response(&e),
    };

    if let Err(e) = email_service
        .send_password_reset_email(&account.email, &otp.code)
        .await
    {
        return error_response(&e);
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": format!("Password reset email sent to {}", account.email)
    }))
}

/// PATCH /auth/reset-password - Choisir un nouveau mot de passe (PUBLIC)
/// Consomme l'OTP envoyé par /auth/forgot-password
#[patch("/reset-password")]
pub async fn reset_password(
    body: web::Json<ResetPasswordRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(errors) = body.validate() {
        return HttpResponse::BadRequest().json(errors);
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let account = match accounts::Entity::find()
        .filter(accounts::Column::Email.eq(&body.email))
        .one(&txn)
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            return error_response(&ServiceError::NotFound("Account not found".to_string()));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    if let Err(e) = OtpService::verify(&txn, account.id, &body.code).await {
        return error_response(&e);
    }

    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => return error_response(&ServiceError::Internal(e)),
    };

    let mut active: accounts::ActiveModel = account.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());
    if let Err(e) = active.update(&txn).await {
        return error_response(&ServiceError::Db(e));
    }

    if let Err(e) = txn.commit().await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Your password has been reset successfully"
    }))
}

/// POST /auth/refresh-token - Obtenir un nouvel access token (PUBLIC)
#[post("/refresh-token")]
pub async fn refresh_token(
    body: web::Json<RefreshTokenRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Le refresh token doit être valide
    let claims = match jwt::verify_refresh_token(&body.refresh_token) {
        Ok(claims) => claims,
        Err(e) => return error_response(&ServiceError::Authentication(e)),
    };

    // 2. Et ne pas avoir été révoqué au logout
    match revoked_tokens::Entity::find()
        .filter(revoked_tokens::Column::Jti.eq(claims.jti))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return error_response(&ServiceError::Authentication(
                "Refresh token has been revoked".to_string(),
            ));
        }
        Ok(None) => {}
        Err(e) => return error_response(&ServiceError::Db(e)),
    }

    // 3. Régénérer un access token avec les infos à jour du compte
    let account = match accounts::Entity::find_by_id(claims.sub).one(db.get_ref()).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return error_response(&ServiceError::Authentication(
                "Account no longer exists".to_string(),
            ));
        }
        Err(e) => return error_response(&ServiceError::Db(e)),
    };

    let access_token = match jwt::generate_access_token(&account) {
        Ok(token) => token,
        Err(e) => return error_response(&ServiceError::Internal(e)),
    };

    HttpResponse::Ok().json(serde_json::json!({ "access_token": access_token }))
}

/// POST /auth/logout - Révoquer un refresh token (PUBLIC)
#[post("/logout")]
pub async fn logout(
    body: web::Json<RefreshTokenRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let claims = match jwt::verify_refresh_token(&body.refresh_token) {
        Ok(claims) => claims,
        Err(_) => {
            return error_response(&ServiceError::Authentication(
                "Invalid refresh token".to_string(),
            ));
        }
    };

    // Révoquer deux fois le même token est une erreur
    match revoked_tokens::Entity::find()
        .filter(revoked_tokens::Column::Jti.eq(claims.jti))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return error_response(&ServiceError::Conflict(
                "Refresh token already revoked".to_string(),
            ));
        }
        Ok(None) => {}
        Err(e) => return error_response(&ServiceError::Db(e)),
    }

    let expires_at = match chrono::DateTime::from_timestamp(claims.exp, 0) {
        Some(expires_at) => expires_at,
        None => {
            return error_response(&ServiceError::Authentication(
                "Invalid refresh token".to_string(),
            ));
        }
    };

    let revoked = revoked_tokens::ActiveModel {
        jti: Set(claims.jti),
        account_id: Set(claims.sub),
        expires_at: Set(expires_at),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    if let Err(e) = revoked.insert(db.get_ref()).await {
        return error_response(&ServiceError::Db(e));
    }

    HttpResponse::Ok().json(serde_json::json!({ "message": "Successfully logged out" }))
}

/// POST /auth/social_login/google - Login / inscription via Google (PUBLIC)
/// Attend un ID token Google et retourne une paire de tokens
#[post("/social_login/google")]
pub async fn google_login(
    body: web::Json<GoogleAuthRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let info = match GoogleAuthService::validate(&body.auth_token).await {
        Ok(info) => info,
        Err(e) => return error_response(&e),
    };

    let account = match GoogleAuthService::create_or_get_account(db.get_ref(), &info).await {
        Ok(account) => account,
        Err(e) => return error_response(&e),
    };

    let tokens = match jwt::generate_token_pair(&account) {
        Ok(tokens) => tokens,
        Err(e) => return error_response(&ServiceError::Internal(e)),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged in successfully",
        "tokens": tokens,
    }))
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(signup)
            .service(login)
            .service(verify_otp)
            .service(resend_otp)
            .service(forgot_password)
            .service(reset_password)
            .service(refresh_token)
            .service(logout)
            .service(google_login),
    );
}
