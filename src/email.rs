use crate::db::Competition;
use crate::env;
use crate::error::{AppError, AppResult};

pub async fn send_email(recipient: &str, subject: &str, text_body: &str) -> AppResult {
    let Some(smtp) = &*env::SMTP else {
        tracing::debug!(recipient, subject, "SMTP not configured; skipping email");
        return Ok(());
    };

    let message = mail_send::mail_builder::MessageBuilder::new()
        .from((&*smtp.from_name, &*smtp.from_address))
        .to(recipient)
        .subject(subject)
        .text_body(text_body);

    mail_send::SmtpClientBuilder::new(&*smtp.host, smtp.port)
        .credentials((&*smtp.username, &*smtp.password))
        .connect()
        .await
        .map_err(|e| AppError::Other(format!("SMTP connect error: {e}")))?
        .send(message)
        .await
        .map_err(|e| AppError::Other(format!("SMTP send error: {e}")))?;

    tracing::debug!(recipient, "sent email");

    Ok(())
}

/// Emails each competitor their final result. Fire-and-forget: runs in a
/// background task and only logs failures.
pub fn send_results_notifications(
    competition: &Competition,
    recipients: Vec<(String, String, i64, i64)>,
) {
    let subject = format!(
        "Results are in: {} ({} {})",
        competition.title,
        competition.month_name(),
        competition.year,
    );
    tokio::spawn(async move {
        for (email, username, position, total_score) in recipients {
            let body = format!(
                "Hi {username},\n\n\
                 Your photo placed {} with a total score of {total_score}.\n",
                crate::util::ordinal(position),
            );
            if let Err(err) = send_email(&email, &subject, &body).await {
                tracing::warn!(email, err = err.message(), "error sending results email");
            }
        }
    });
}
