use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::PaymentsConfig;
use crate::error::{AppError, PaymentError};

/// Fields Chapa expects when opening a hosted checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub amount: String,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub transaction_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayData {
    transaction_id: Option<String>,
    checkout_url: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    data: Option<GatewayData>,
}

/// Thin client over the Chapa transaction API.
pub struct ChapaClient {
    http: reqwest::Client,
    base_url: Url,
    secret_key: Option<String>,
    currency: String,
}

impl ChapaClient {
    pub fn new(config: &PaymentsConfig) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::ConfigError(format!("payments.base_url: {}", e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key: config.secret_key.clone().filter(|k| !k.is_empty()),
            currency: config.currency.clone(),
        })
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    fn secret(&self) -> Result<&str, PaymentError> {
        self.secret_key.as_deref().ok_or(PaymentError::NotConfigured)
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentError> {
        self.base_url
            .join(path)
            .map_err(|e| PaymentError::Gateway(e.to_string()))
    }

    /// `v1/transaction/verify/{id}` with the id kept as a single encoded segment.
    fn verify_endpoint(&self, transaction_id: &str) -> Result<Url, PaymentError> {
        if transaction_id.is_empty() || matches!(transaction_id, "." | "..") {
            return Err(PaymentError::Gateway(format!(
                "invalid transaction id {:?}",
                transaction_id
            )));
        }
        let mut url = self.endpoint("v1/transaction/verify")?;
        url.path_segments_mut()
            .map_err(|_| PaymentError::Gateway("base URL cannot hold a path".into()))?
            .push(transaction_id);
        Ok(url)
    }

    /// Opens a checkout session; Chapa must answer 200 with both a
    /// transaction id and a checkout URL.
    pub async fn initialize(&self, request: &CheckoutRequest) -> Result<Checkout, PaymentError> {
        let secret = self.secret()?;
        let url = self.endpoint("v1/transaction/initialize")?;
        debug!("Initializing Chapa transaction {}", request.tx_ref);

        let res = self
            .http
            .post(url)
            .bearer_auth(secret)
            .json(request)
            .send()
            .await?;

        if !res.status().is_success() {
            warn!("Chapa initialize returned {}", res.status());
            return Err(PaymentError::Gateway(format!(
                "initialize returned {}",
                res.status()
            )));
        }

        let body: GatewayResponse = res.json().await.map_err(|_| PaymentError::InvalidResponse)?;
        let data = body.data.unwrap_or_default();
        match (data.transaction_id, data.checkout_url) {
            (Some(transaction_id), Some(checkout_url)) => Ok(Checkout {
                transaction_id,
                checkout_url,
            }),
            _ => Err(PaymentError::InvalidResponse),
        }
    }

    /// Returns Chapa's reported status for the transaction, e.g. `successful`.
    pub async fn verify(&self, transaction_id: &str) -> Result<String, PaymentError> {
        let secret = self.secret()?;
        let url = self.verify_endpoint(transaction_id)?;

        let res = self.http.get(url).bearer_auth(secret).send().await?;
        if !res.status().is_success() {
            warn!("Chapa verify for {} returned {}", transaction_id, res.status());
            return Err(PaymentError::Gateway(format!(
                "verify returned {}",
                res.status()
            )));
        }

        let body: GatewayResponse = res.json().await.map_err(|_| PaymentError::InvalidResponse)?;
        Ok(body
            .data
            .and_then(|d| d.status)
            .unwrap_or_default())
    }
}
