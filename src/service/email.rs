use crate::config::EmailConfig;
use crate::error::app_error::AppError;
use crate::models::training_session::TrainingSession;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Sends plain-text notification mail over SMTP. Disabled by default so
/// local development never needs a mail server.
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Confirmation to the host after they publish a session.
    pub async fn send_session_created(&self, to_email: &str, session: &TrainingSession) -> Result<(), AppError> {
        let subject = format!("Your session \"{}\" is live", session.title);
        let body = format!(
            "Your session \"{}\" on {} at {} in {} is now visible to other members.\n\nManage it here: {}/sessions/{}\n",
            session.title, session.date, session.time, session.location, self.config.site_url, session.id
        );
        self.send_email(to_email, &subject, &body).await
    }

    /// Heads-up to the host when someone joins their session.
    pub async fn send_session_joined(&self, to_email: &str, session: &TrainingSession, joiner_label: &str) -> Result<(), AppError> {
        let subject = format!("{} joined \"{}\"", joiner_label, session.title);
        let body = format!(
            "{} just joined your session \"{}\" on {} at {}.\n\nSee who is coming: {}/sessions/{}\n",
            joiner_label, session.title, session.date, session.time, self.config.site_url, session.id
        );
        self.send_email(to_email, &subject, &body).await
    }

    async fn send_email(&self, to_email: &str, subject: &str, text_body: &str) -> Result<(), AppError> {
        if !self.config.enabled {
            tracing::warn!("Email service is disabled, skipping \"{}\" to {}", subject, to_email);
            return Ok(());
        }

        let email = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| AppError::email(format!("Invalid from address: {}", e)))?,
            )
            .to(to_email.parse().map_err(|e| AppError::email(format!("Invalid to address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text_body.to_string())
            .map_err(|e| AppError::email(format!("Failed to build email: {}", e)))?;

        let creds = Credentials::new(self.config.smtp_username.clone(), self.config.smtp_password.clone());

        let mailer = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| AppError::email(format!("Failed to create SMTP transport: {}", e)))?
            .credentials(creds)
            .port(self.config.smtp_port)
            .build();

        // lettre's sync transport blocks, keep it off the async workers
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::email(format!("Failed to spawn email sending task: {}", e)))?;

        result.map_err(|e| AppError::email(format!("Failed to send email: {}", e)))?;

        tracing::info!("Sent \"{}\" to {}", subject, to_email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_session;
    use uuid::Uuid;

    fn disabled_service() -> EmailService {
        EmailService::new(EmailConfig {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: "Gruppetto <no-reply@gruppetto.example>".to_string(),
            site_url: "https://gruppetto.example".to_string(),
        })
    }

    #[tokio::test]
    async fn disabled_service_skips_sending() {
        let service = disabled_service();
        let session = sample_session(Uuid::new_v4(), &[]);
        assert!(service.send_session_created("host@example.com", &session).await.is_ok());
        assert!(service.send_session_joined("host@example.com", &session, "Alice W").await.is_ok());
    }
}
