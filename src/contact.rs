use crate::config::ContactConfig;
use crate::error::{AppError, Result};
use reqwest::multipart::Form;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Forwards contact-form submissions to a third-party form relay.
pub struct ContactRelay {
    client: Client,
    endpoint: String,
    access_key: String,
}

impl ContactRelay {
    pub fn new(config: &ContactConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("floodwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            access_key: config.access_key.clone(),
        })
    }

    pub async fn submit(&self, email: &str, message: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::InvalidData(format!(
                "'{}' is not an email address",
                email
            )));
        }
        if message.trim().is_empty() {
            return Err(AppError::InvalidData("Message cannot be empty".to_string()));
        }

        let form = Form::new()
            .text("access_key", self.access_key.clone())
            .text("email", email.to_string())
            .text("message", message.to_string());

        debug!("Submitting contact form to {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Contact form relayed for {}", email);
            Ok(())
        } else {
            warn!("Form relay answered {}", status);
            Err(AppError::Relay(format!("relay returned {}", status)))
        }
    }
}
