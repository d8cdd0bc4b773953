use std::sync::Arc;

use couch_core::RequestError;
use log::info;
use url::Url;

use crate::{CollabResult, Database, Outbound, PaymentGateway, Request};

fn gateway<Db: Database>(request: &Request<'_, Db>) -> CollabResult<Arc<dyn PaymentGateway>> {
    request
        .context()
        .payments
        .clone()
        .ok_or_else(|| RequestError::client_error("Handler not implemented").into())
}

/// Starts a checkout session, which sends the user back to `return_url` either way
pub async fn session<Db: Database>(
    request: &mut Request<'_, Db>,
    amount: i64,
    return_url: String,
) -> CollabResult<()> {
    let gateway = gateway(request)?;
    let minimum = request.context().config.minimum_payment;

    if amount < minimum {
        return Err(
            RequestError::client_error(format!("Amount cannot be less than {minimum} cents"))
                .into(),
        );
    }

    let cancel_url =
        Url::parse(&return_url).map_err(|_| RequestError::client_error("URL not valid"))?;

    // The page can tell a finished payment apart by this
    let mut success_url = cancel_url.clone();
    success_url.query_pairs_mut().append_pair("paid", "");

    let id = gateway
        .create_session(amount, cancel_url.as_str(), success_url.as_str())
        .await?;

    info!("Payment session of {} cents created for {}", amount, request.sender());
    request.reply(&Outbound::PaymentSession(id)).await
}

/// Tells the user whether the email has ever been used to pay
pub async fn paid<Db: Database>(request: &mut Request<'_, Db>, email: String) -> CollabResult<()> {
    let gateway = gateway(request)?;
    let paid = gateway.has_paid(&email).await?;

    request.reply(&Outbound::PaymentPaid(paid)).await
}
