use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use triplicity_core::payment::{CreateIntent, PaymentAdapter, PaymentIntent, PaymentStatus};
use triplicity_core::BoxError;
use triplicity_shared::Masked;

/// Payment intents over the Stripe REST API.
pub struct StripePaymentAdapter {
    client: reqwest::Client,
    api_base: String,
    secret_key: Masked<String>,
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    amount: i64,
    currency: String,
    status: PaymentStatus,
    client_secret: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl From<StripeIntent> for PaymentIntent {
    fn from(intent: StripeIntent) -> Self {
        PaymentIntent {
            id: intent.id,
            amount_minor: intent.amount,
            currency: intent.currency,
            status: intent.status,
            client_secret: intent.client_secret,
            metadata: intent.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

impl StripePaymentAdapter {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: Masked<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    async fn parse(response: reqwest::Response) -> Result<PaymentIntent, BoxError> {
        let status = response.status();
        if status.is_success() {
            let intent: StripeIntent = response.json().await?;
            return Ok(intent.into());
        }

        let body = response.text().await.unwrap_or_default();
        let message = describe_error(&body);
        warn!("Stripe responded {}: {}", status, message);
        Err(format!("stripe returned {}: {}", status, message).into())
    }
}

/// Form fields for `POST /v1/payment_intents`.
pub fn create_intent_form(request: &CreateIntent) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount_minor.to_string()),
        ("currency".to_string(), request.currency.to_lowercase()),
        ("description".to_string(), request.description.clone()),
        ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
    ];
    for (key, value) in request.metadata.to_pairs() {
        form.push((format!("metadata[{}]", key), value));
    }
    form
}

fn describe_error(body: &str) -> String {
    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(parsed) => format!(
            "{} ({})",
            parsed.error.message.unwrap_or_else(|| "no message".to_string()),
            parsed.error.kind.unwrap_or_else(|| "unknown_error".to_string())
        ),
        Err(_) => body.chars().take(200).collect(),
    }
}

/// Intent ids are interpolated into the request path.
fn validate_intent_id(intent_id: &str) -> Result<(), BoxError> {
    let valid = !intent_id.is_empty()
        && intent_id.len() <= 255
        && intent_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(format!("malformed payment intent id '{}'", intent_id).into());
    }
    Ok(())
}

#[async_trait]
impl PaymentAdapter for StripePaymentAdapter {
    async fn create_intent(&self, request: &CreateIntent) -> Result<PaymentIntent, BoxError> {
        debug!(
            "Creating Stripe intent for booking {} ({} {})",
            request.metadata.booking_id, request.amount_minor, request.currency
        );
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(self.secret_key.expose())
            .form(&create_intent_form(request))
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent, BoxError> {
        validate_intent_id(intent_id)?;
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.api_base, intent_id))
            .bearer_auth(self.secret_key.expose())
            .send()
            .await?;
        Self::parse(response).await
    }
}
