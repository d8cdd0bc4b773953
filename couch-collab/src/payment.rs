use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

const STRIPE_API: &str = "https://api.stripe.com/v1";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Could not reach payment provider: {0}")]
    Request(#[from] reqwest::Error),
}

/// Takes payments from users who want to support the server
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a checkout session for `amount` cents, returning its id
    async fn create_session(
        &self,
        amount: i64,
        cancel_url: &str,
        success_url: &str,
    ) -> Result<String, PaymentError>;

    /// Returns true if a customer with this email has a succeeded charge
    async fn has_paid(&self, email: &str) -> Result<bool, PaymentError>;
}

/// Takes payments through Stripe checkout
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    /// Shown to the user on the checkout page
    product_name: String,
}

#[derive(Debug, Deserialize)]
struct List<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Charge {
    status: String,
}

impl StripeGateway {
    pub fn new(secret_key: String, product_name: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            product_name,
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        amount: i64,
        cancel_url: &str,
        success_url: &str,
    ) -> Result<String, PaymentError> {
        let form = [
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("success_url", success_url.to_string()),
            ("submit_type", "pay".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", "usd".to_string()),
            ("line_items[0][price_data][unit_amount]", amount.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                self.product_name.clone(),
            ),
        ];

        let session: CheckoutSession = self
            .client
            .post(format!("{STRIPE_API}/checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(session.id)
    }

    async fn has_paid(&self, email: &str) -> Result<bool, PaymentError> {
        let customers: List<Customer> = self
            .client
            .get(format!("{STRIPE_API}/customers"))
            .bearer_auth(&self.secret_key)
            .query(&[("email", email)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        for customer in customers.data {
            let charges: List<Charge> = self
                .client
                .get(format!("{STRIPE_API}/charges"))
                .bearer_auth(&self.secret_key)
                .query(&[("customer", customer.id.as_str())])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if charges.data.iter().any(|c| c.status == "succeeded") {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
