//! Payment gateway seam.
//!
//! The engine only needs two calls: start a checkout and ask whether a
//! transaction succeeded. Signatures, redirects and webhooks stay with
//! whatever integrates the gateway.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use ureq::Agent;

use crate::config::GatewaySettings;
use crate::error::{BillingError, Result};

/// What the customer is asked to pay.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub tx_ref: String,
    pub amount: f64,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
}

/// Gateway verdict on a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Success,
    Pending,
    Failed(String),
}

impl TransactionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Pending => f.write_str("pending"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

pub trait PaymentGateway: Send + Sync {
    /// Start a checkout and return the URL the customer pays at.
    fn initialize_transaction(&self, request: &CheckoutRequest) -> Result<String>;

    fn verify_transaction(&self, tx_ref: &str) -> Result<TransactionStatus>;
}

/// Gateway speaking a Chapa-style JSON API:
/// `POST {base}/transaction/initialize` and `GET {base}/transaction/verify/{tx_ref}`.
pub struct HttpGateway {
    agent: Agent,
    base_url: String,
    secret_key: String,
    callback_url: Option<String>,
}

impl HttpGateway {
    pub fn from_settings(settings: &GatewaySettings) -> Result<Self> {
        let secret_key = std::env::var(&settings.secret_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(BillingError::GatewayNotConfigured)?;

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            agent,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            secret_key,
            callback_url: settings.callback_url.clone(),
        })
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }
}

impl PaymentGateway for HttpGateway {
    fn initialize_transaction(&self, request: &CheckoutRequest) -> Result<String> {
        let mut payload = json!({
            "amount": format!("{:.2}", request.amount),
            "currency": request.currency,
            "first_name": request.customer_name,
            "tx_ref": request.tx_ref,
        });
        if let Some(email) = &request.customer_email {
            payload["email"] = json!(email);
        }
        if let Some(callback) = &self.callback_url {
            payload["callback_url"] = json!(callback);
        }

        let url = format!("{}/transaction/initialize", self.base_url);
        let body: String = self
            .agent
            .post(url.as_str())
            .header("Authorization", self.authorization().as_str())
            .header("Content-Type", "application/json")
            .send(payload.to_string().as_str())
            .map_err(|e| BillingError::Gateway(format!("initialize failed: {e}")))?
            .body_mut()
            .read_to_string()
            .map_err(|e| BillingError::Gateway(format!("initialize response unreadable: {e}")))?;

        tracing::debug!(tx_ref = %request.tx_ref, "Gateway checkout initialized");
        parse_checkout_url(&body)
    }

    fn verify_transaction(&self, tx_ref: &str) -> Result<TransactionStatus> {
        let url = format!("{}/transaction/verify/{}", self.base_url, tx_ref);
        let body: String = self
            .agent
            .get(url.as_str())
            .header("Authorization", self.authorization().as_str())
            .call()
            .map_err(|e| BillingError::Gateway(format!("verify failed: {e}")))?
            .body_mut()
            .read_to_string()
            .map_err(|e| BillingError::Gateway(format!("verify response unreadable: {e}")))?;

        parse_verification(&body)
    }
}

fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body)
        .map_err(|e| BillingError::Gateway(format!("malformed gateway response: {e}")))
}

fn parse_checkout_url(body: &str) -> Result<String> {
    let json = parse_json(body)?;
    if json["status"].as_str() != Some("success") {
        let message = json["message"].as_str().unwrap_or("unknown gateway error");
        return Err(BillingError::Gateway(message.to_string()));
    }
    json["data"]["checkout_url"]
        .as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| BillingError::Gateway("response has no checkout_url".to_string()))
}

fn parse_verification(body: &str) -> Result<TransactionStatus> {
    let json = parse_json(body)?;
    let status = json["data"]["status"]
        .as_str()
        .or_else(|| json["status"].as_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    Ok(match status.as_str() {
        "success" | "successful" | "paid" => TransactionStatus::Success,
        "pending" => TransactionStatus::Pending,
        "" => TransactionStatus::Failed("no status in response".to_string()),
        other => TransactionStatus::Failed(other.to_string()),
    })
}
