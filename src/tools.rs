use std::env;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use dotenvy::dotenv;

use crate::gate::DEFAULT_PROBE_TIMEOUT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub url: String,
    pub fingerprint: [u8; 32],
    pub probe_timeout: Duration,
    pub log_level: String,
}

/// Reads settings from the process arguments.
pub fn get_settings() -> anyhow::Result<Settings> {
    let args: Vec<String> = env::args().collect();
    settings_from_args(&args)
}

pub fn settings_from_args(args: &[String]) -> anyhow::Result<Settings> {
    match args {
        // useEnv
        [_, mode] if mode == "useEnv" => {
            dotenv().context("could not read .env")?;
            let url = env::var("PIN_GATE_URL").context("PIN_GATE_URL is not set")?;
            let fingerprint = env::var("SERVER_CERT_FINGERPRINT")
                .context("SERVER_CERT_FINGERPRINT is not set")?;
            let probe_timeout = match env::var("PROBE_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(
                    secs.parse()
                        .with_context(|| format!("invalid PROBE_TIMEOUT_SECS {secs:?}"))?,
                ),
                Err(_) => DEFAULT_PROBE_TIMEOUT,
            };
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());

            Ok(Settings {
                url,
                fingerprint: parse_sha256_hex(&fingerprint)?,
                probe_timeout,
                log_level,
            })
        }

        // useInline <url> <fingerprint>
        [_, mode, url, fingerprint] if mode == "useInline" => Ok(Settings {
            url: url.clone(),
            fingerprint: parse_sha256_hex(fingerprint)?,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            log_level: "info".to_owned(),
        }),

        _ => bail!(
            "Please either use 'useEnv' with environment variables \
             or 'useInline <url> <sha256-fingerprint>'"
        ),
    }
}

pub fn parse_sha256_hex(s: &str) -> anyhow::Result<[u8; 32]> {
    let clean = s.replace([':', ' '], "").to_lowercase();

    let bytes = hex::decode(clean)?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("Invalid SHA256 length (expected 32 bytes)"))
}
