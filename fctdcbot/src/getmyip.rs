use std::time::Duration;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Public address of this host, asked from up to two lookup services at
/// once. `None` when neither is configured or neither answered.
pub async fn get_my_ip(url1: &str, url2: &str) -> Option<String> {
    let client = match reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "failed to build http client");
            return None;
        }
    };
    let (ip1, ip2) = tokio::join!(lookup(&client, url1), lookup(&client, url2));
    merge(ip1, ip2)
}

async fn lookup(client: &reqwest::Client, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let body = async { client.get(url).send().await?.error_for_status()?.text().await };
    match body.await {
        Ok(text) => Some(text.trim().to_owned()).filter(|ip| !ip.is_empty()),
        Err(e) => {
            tracing::debug!(url, error = %e, "ip lookup failed");
            None
        }
    }
}

/// Disagreeing services are both shown.
fn merge(ip1: Option<String>, ip2: Option<String>) -> Option<String> {
    match (ip1, ip2) {
        (Some(a), Some(b)) if a != b => Some(format!("{a} / {b}")),
        (Some(ip), _) | (None, Some(ip)) => Some(ip),
        (None, None) => None,
    }
}
