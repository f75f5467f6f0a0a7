// src/cloud/registration.rs - One-shot device registration
use crate::config::BridgeConfig;

/// Announces this device to the server at startup. Best-effort: a failure is
/// logged and the device can be registered manually server-side.
pub async fn register_device(http: &reqwest::Client, config: &BridgeConfig) {
    let url = format!(
        "{}/register_device/",
        config.server_url().trim_end_matches('/')
    );
    let form = [
        ("device_id", config.device_id.as_str()),
        ("owner", config.owner.as_str()),
        ("address", config.address.as_str()),
    ];

    match http.post(&url).form(&form).send().await {
        Ok(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::info!("device registration: {status} {body}");
        }
        Err(e) => tracing::warn!("device registration failed: {e}"),
    }
}
