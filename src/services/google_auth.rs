// Social login Google. On valide l'ID token auprès de l'endpoint
// tokeninfo (aud = GOOGLE_CLIENT_ID, iss = accounts.google.com) puis on
// crée le compte au premier login: email déjà vérifié, pas de mot de
// passe, auth_type "google".

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use uuid::Uuid;

use super::ServiceError;
use crate::models::accounts;

pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct GoogleTokenInfo {
    pub aud: String,
    pub iss: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub struct GoogleAuthService;

impl GoogleAuthService {
    /// Interroge l'API oAuth2 de Google pour valider l'ID token et
    /// récupérer les infos de l'utilisateur
    pub async fn validate(auth_token: &str) -> Result<GoogleTokenInfo, ServiceError> {
        let client_id = env::var("GOOGLE_CLIENT_ID")
            .map_err(|_| ServiceError::Internal("GOOGLE_CLIENT_ID is not configured".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ServiceError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let response = http
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", auth_token)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Google tokeninfo request failed");
                ServiceError::Upstream("Could not reach the identity provider".to_string())
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::Authentication(
                "The token is either invalid or has expired".to_string(),
            ));
        }

        let info: GoogleTokenInfo = response.json().await.map_err(|_| {
            ServiceError::Authentication("The token is either invalid or has expired".to_string())
        })?;

        if info.aud != client_id {
            return Err(ServiceError::Authentication(
                "The token was not issued for this application".to_string(),
            ));
        }

        if !info.iss.contains("accounts.google.com") {
            return Err(ServiceError::Authentication(
                "The token is either invalid or has expired".to_string(),
            ));
        }

        Ok(info)
    }

    /// Retourne le compte lié à cet email, en le créant au premier login
    pub async fn create_or_get_account(
        db: &DatabaseConnection,
        info: &GoogleTokenInfo,
    ) -> Result<accounts::Model, ServiceError> {
        if let Some(existing) = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(info.email.as_str()))
            .one(db)
            .await?
        {
            return Ok(existing);
        }

        let now = Utc::now();
        let account = accounts::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(info.name.clone().unwrap_or_else(|| info.email.clone())),
            email: Set(info.email.clone()),
            account_type: Set("BUYER".to_string()),
            password_hash: Set(String::new()),
            email_verified: Set(true),
            auth_type: Set("google".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        Ok(account)
    }
}
