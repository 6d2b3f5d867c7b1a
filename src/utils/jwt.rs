use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

use crate::models::accounts;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Durées de vie: 1h pour l'access token, 7 jours pour le refresh token
const ACCESS_TOKEN_HOURS: i64 = 1;
const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // account id
    pub email: String,
    pub account_type: String,
    /// "access" ou "refresh"
    pub token_type: String,
    /// Identifiant unique du token, utilisé pour la blacklist des refresh
    pub jti: Uuid,
    pub exp: i64, // expiration timestamp
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Récupère la clé secrète JWT depuis les variables d'environnement
fn get_jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        eprintln!("⚠️  WARNING: JWT_SECRET not found in .env, using default (INSECURE)");
        "default-insecure-key-change-this".to_string()
    })
}

fn generate_token(account: &accounts::Model, token_type: &str, lifetime: Duration) -> Result<String, String> {
    let expiration = Utc::now()
        .checked_add_signed(lifetime)
        .ok_or("Failed to calculate expiration")?
        .timestamp();

    let claims = Claims {
        sub: account.id,
        email: account.email.clone(),
        account_type: account.account_type.clone(),
        token_type: token_type.to_string(),
        jti: Uuid::new_v4(),
        exp: expiration,
    };

    let secret = get_jwt_secret();

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| format!("Failed to generate token: {}", e))
}

/// Génère un access token seul (utilisé par /auth/refresh-token)
pub fn generate_access_token(account: &accounts::Model) -> Result<String, String> {
    generate_token(account, TOKEN_TYPE_ACCESS, Duration::hours(ACCESS_TOKEN_HOURS))
}

/// Génère la paire access + refresh retournée au login
pub fn generate_token_pair(account: &accounts::Model) -> Result<TokenPair, String> {
    Ok(TokenPair {
        access_token: generate_token(account, TOKEN_TYPE_ACCESS, Duration::hours(ACCESS_TOKEN_HOURS))?,
        refresh_token: generate_token(account, TOKEN_TYPE_REFRESH, Duration::days(REFRESH_TOKEN_DAYS))?,
    })
}

/// Vérifie et décode un JWT token (access ou refresh)
pub fn verify_token(token: &str) -> Result<Claims, String> {
    let secret = get_jwt_secret();

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Vérifie un refresh token: signature valide ET token_type == "refresh"
pub fn verify_refresh_token(token: &str) -> Result<Claims, String> {
    let claims = verify_token(token)?;
    if claims.token_type != TOKEN_TYPE_REFRESH {
        return Err("Not a refresh token".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> accounts::Model {
        let now = Utc::now();
        accounts::Model {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            account_type: "BUYER".to_string(),
            password_hash: String::new(),
            email_verified: true,
            auth_type: "email".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_generate_and_verify_token_pair() {
        let account = test_account();

        let pair = generate_token_pair(&account).unwrap();

        let access = verify_token(&pair.access_token).unwrap();
        assert_eq!(access.sub, account.id);
        assert_eq!(access.email, account.email);
        assert_eq!(access.token_type, TOKEN_TYPE_ACCESS);

        let refresh = verify_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, account.id);
        assert_eq!(refresh.token_type, TOKEN_TYPE_REFRESH);
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let account = test_account();
        let pair = generate_token_pair(&account).unwrap();

        assert!(verify_refresh_token(&pair.access_token).is_err());
    }

    #[test]
    fn test_tokens_carry_distinct_jti() {
        let account = test_account();
        let pair = generate_token_pair(&account).unwrap();

        let access = verify_token(&pair.access_token).unwrap();
        let refresh = verify_token(&pair.refresh_token).unwrap();
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid.token.here");
        assert!(result.is_err());
    }
}
