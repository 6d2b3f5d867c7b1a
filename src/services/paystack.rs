// Client Paystack. Deux opérations seulement: initialiser une transaction
// (retourne l'URL de paiement) et vérifier le statut d'une référence.
// Authentification par bearer secret, timeouts explicites sur chaque appel.

use async_trait::async_trait;
use std::env;
use std::time::Duration;

use super::ServiceError;

pub const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Contrat avec la passerelle de paiement. Injecté dans les routes en
/// Arc<dyn PaymentGateway> pour pouvoir substituer un faux en test.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Initialise un paiement et retourne l'authorization_url Paystack
    async fn initialize(
        &self,
        email: &str,
        amount_minor_units: i64,
        reference: &str,
    ) -> Result<String, ServiceError>;

    /// Retourne le statut Paystack de la transaction, tel quel
    /// (abandoned, failed, ongoing, pending, processing, queued,
    /// reversed, success)
    async fn verify(&self, reference: &str) -> Result<String, ServiceError>;
}

pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl PaystackClient {
    pub fn from_env() -> Result<Self, String> {
        let secret_key = env::var("PAYSTACK_SECRET_KEY")
            .map_err(|_| "PAYSTACK_SECRET_KEY must be set in .env file".to_string())?;
        let base_url =
            env::var("PAYSTACK_BASE_URL").unwrap_or_else(|_| PAYSTACK_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            secret_key,
            base_url,
        })
    }

    /// Extrait le champ "message" du corps d'erreur Paystack (seul champ
    /// montré à l'utilisateur, jamais le corps complet)
    fn gateway_message(body: &serde_json::Value, fallback: &str) -> String {
        body.get("message")
            .and_then(|m| m.as_str())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(
        &self,
        email: &str,
        amount_minor_units: i64,
        reference: &str,
    ) -> Result<String, ServiceError> {
        let payload = serde_json::json!({
            "email": email,
            "amount": amount_minor_units,
            "reference": reference,
        });

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Paystack initialize request failed");
                ServiceError::Upstream(
                    "An error occurred when initializing your payment".to_string(),
                )
            })?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Paystack initialize returned an unreadable body");
            ServiceError::Upstream("An error occurred when initializing your payment".to_string())
        })?;

        if !status.is_success() {
            tracing::error!(status = %status, "Paystack initialize returned an error");
            return Err(ServiceError::Upstream(Self::gateway_message(
                &body,
                "An error occurred when initializing your payment",
            )));
        }

        body.pointer("/data/authorization_url")
            .and_then(|u| u.as_str())
            .map(|u| u.to_string())
            .ok_or_else(|| {
                tracing::error!("Paystack initialize response missing authorization_url");
                ServiceError::Upstream(
                    "An error occurred when initializing your payment".to_string(),
                )
            })
    }

    async fn verify(&self, reference: &str) -> Result<String, ServiceError> {
        let response = self
            .http
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Paystack verify request failed");
                ServiceError::Upstream(
                    "An error occurred when verifying the transaction".to_string(),
                )
            })?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Paystack verify returned an unreadable body");
            ServiceError::Upstream("An error occurred when verifying the transaction".to_string())
        })?;

        if !status.is_success() {
            tracing::error!(status = %status, "Paystack verify returned an error");
            return Err(ServiceError::Upstream(Self::gateway_message(
                &body,
                "An error occurred when verifying the transaction",
            )));
        }

        body.pointer("/data/status")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                tracing::error!("Paystack verify response missing status");
                ServiceError::Upstream(
                    "An error occurred when verifying the transaction".to_string(),
                )
            })
    }
}
