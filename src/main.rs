use std::sync::Arc;

use anyhow::Context;
use http::Uri;
use tls_pin_gate::tools::get_settings;
use tls_pin_gate::{
    log, FingerprintVerifier, GateConfig, PinnedClient, ReqwestTransport, VerificationGate,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = get_settings()?;
    log::init(&settings.log_level)?;

    let uri: Uri = settings.url.parse().context("invalid URL")?;
    let host = uri.host().context("URL has no host")?;

    let verifier = FingerprintVerifier::strict().with_pin(host, settings.fingerprint);
    let gate = VerificationGate::with_native_roots(
        Arc::new(verifier),
        GateConfig::default().probe_timeout(settings.probe_timeout),
    )
    .context("could not load the platform trust store")?;

    let client = PinnedClient::new(ReqwestTransport::new(), gate);
    let result = client.get(uri.clone()).await;
    client.close();

    match result {
        Ok(response) => {
            info!(
                status = %response.status(),
                bytes = response.body().len(),
                "request completed"
            );
            Ok(())
        }
        Err(e) => {
            if let Some(code) = e.pin_error_code() {
                error!(%code, "pin verification failed");
            }
            Err(e).with_context(|| format!("GET {uri} failed"))
        }
    }
}
