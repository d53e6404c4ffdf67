use anyhow::{Context, Result, bail};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Thin wrapper over the Resend transactional email API. Only invitation
/// mail goes out; everything else in the app is in-band.
pub struct EmailClient {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl EmailClient {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
        }
    }

    pub async fn send_invitation(
        &self,
        to: &str,
        trip_name: &str,
        invite_link: &str,
        inviter_email: &str,
    ) -> Result<()> {
        let subject = format!("You're invited to plan {trip_name}");
        let html = format!(
            "<p>{inviter_email} invited you to help plan <strong>{trip_name}</strong>.</p>\
             <p><a href=\"{invite_link}\">Join the trip</a></p>\
             <p>This link expires in 7 days.</p>"
        );

        let resp = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .context("email request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("email provider returned {}: {}", status, body);
        }

        Ok(())
    }
}
