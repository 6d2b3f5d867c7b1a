// Envoi des emails transactionnels (OTP de vérification, reset password).
// Chaque email part en multipart HTML + texte, rendu avec des templates
// askama. Un échec d'envoi est TOUJOURS remonté à l'appelant: sans le
// code, le flow de vérification est inutilisable.

use askama::Template;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;

use super::ServiceError;

#[derive(Template)]
#[template(path = "email/otp_verification.html")]
struct OtpVerificationHtml<'a> {
    name: &'a str,
    otp: &'a str,
}

#[derive(Template)]
#[template(path = "email/otp_verification.txt")]
struct OtpVerificationText<'a> {
    name: &'a str,
    otp: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Construit le transport SMTP depuis les variables d'environnement:
    /// SMTP_HOST, SMTP_PORT (587 par défaut), SMTP_USERNAME, SMTP_PASSWORD,
    /// EMAIL_FROM
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("SMTP_HOST").map_err(|_| "SMTP_HOST must be set in .env file".to_string())?;
        let port: u16 = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .map_err(|_| "SMTP_PORT must be a valid port number".to_string())?;
        let username = env::var("SMTP_USERNAME").map_err(|_| "SMTP_USERNAME must be set in .env file".to_string())?;
        let password = env::var("SMTP_PASSWORD").map_err(|_| "SMTP_PASSWORD must be set in .env file".to_string())?;
        let from_address = env::var("EMAIL_FROM").map_err(|_| "EMAIL_FROM must be set in .env file".to_string())?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
            .map_err(|e| format!("Failed to create SMTP transport: {}", e))?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self { mailer, from_address })
    }

    /// Email de bienvenue contenant l'OTP de vérification du compte
    pub async fn send_verification_email(
        &self,
        name: &str,
        email: &str,
        otp: &str,
    ) -> Result<(), ServiceError> {
        let html = OtpVerificationHtml { name, otp }
            .render()
            .map_err(|e| ServiceError::Internal(format!("Template error: {}", e)))?;
        let text = OtpVerificationText { name, otp }
            .render()
            .map_err(|e| ServiceError::Internal(format!("Template error: {}", e)))?;

        self.send(email, "Welcome to Tradeway", text, html).await
    }

    /// Email contenant l'OTP de reset de mot de passe
    pub async fn send_password_reset_email(&self, email: &str, code: &str) -> Result<(), ServiceError> {
        let html = PasswordResetHtml { email, code }
            .render()
            .map_err(|e| ServiceError::Internal(format!("Template error: {}", e)))?;
        let text = PasswordResetText { email, code }
            .render()
            .map_err(|e| ServiceError::Internal(format!("Template error: {}", e)))?;

        self.send(email, "Tradeway Password Reset", text, html).await
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        text: String,
        html: String,
    ) -> Result<(), ServiceError> {
        let message = Message::builder()
            .from(self
                .from_address
                .parse()
                .map_err(|_| ServiceError::Internal(format!("Invalid sender address: {}", self.from_address)))?)
            .to(recipient
                .parse()
                .map_err(|_| ServiceError::Validation(format!("Invalid email address: {}", recipient)))?)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(text, html))
            .map_err(|e| ServiceError::Internal(format!("Failed to build message: {}", e)))?;

        match self.mailer.send(message).await {
            Ok(_) => {
                tracing::info!(recipient = recipient, "Email successfully sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(recipient = recipient, error = %e, "Could not send email");
                Err(ServiceError::EmailDelivery(format!(
                    "Could not send email to {}",
                    recipient
                )))
            }
        }
    }
}
