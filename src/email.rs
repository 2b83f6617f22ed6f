// src/email.rs

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::AppConfig;
use crate::error::ApiError;

async fn send_email(
    config: &AppConfig,
    to: &str,
    subject: &str,
    html: String,
) -> Result<(), ApiError> {
    let message = Message::builder()
        .from(
            config
                .email_from
                .parse()
                .map_err(|e| ApiError::Internal(format!("invalid EMAIL_FROM address: {e}")))?,
        )
        .to(to
            .parse()
            .map_err(|e| ApiError::Internal(format!("invalid recipient address: {e}")))?)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(html)
        .map_err(|e| ApiError::Internal(format!("email build error: {e}")))?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        .map_err(|e| ApiError::Internal(format!("smtp transport error: {e}")))?
        .credentials(Credentials::new(
            config.smtp_user.clone(),
            config.smtp_pass.clone(),
        ))
        .build();

    mailer
        .send(message)
        .await
        .map_err(|e| ApiError::Internal(format!("smtp send error: {e}")))?;

    Ok(())
}

pub async fn send_password_reset_email(
    config: &AppConfig,
    to: &str,
    token: &str,
) -> Result<(), ApiError> {
    let reset_url = format!("{}/reset-password?token={}", config.app_url, token);
    let html = format!(
        r#"
    <h2>Réinitialisation du mot de passe</h2>
    <p>Vous avez demandé à réinitialiser votre mot de passe FixedPronos.</p>
    <p><a href="{reset_url}">Cliquez ici pour réinitialiser votre mot de passe</a>. Ce lien expirera dans 1 heure.</p>
    <p>Si vous n'êtes pas à l'origine de cette demande, ignorez cet e-mail.</p>
  "#
    );

    match send_email(config, to, "FixedPronos - Réinitialisation du mot de passe", html).await {
        Ok(()) => {
            log::info!("password reset email sent to {to}");
            Ok(())
        }
        Err(e) => {
            log::error!("failed to send password reset email: {e}");
            Err(e)
        }
    }
}
