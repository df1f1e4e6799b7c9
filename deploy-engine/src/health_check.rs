//! Activation health check (spec.md §4.3 step 8): "Poll
//! `http://localhost:<port>/` every 500 ms for up to 15 s; pass on any
//! response with status `< 500`."

use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn wait_until_healthy(port: u16, deadline: Duration) -> bool {
    let client = reqwest::Client::new();
    let url = format!("http://localhost:{port}/");
    let start = tokio::time::Instant::now();

    loop {
        if let Ok(response) = client.get(&url).send().await {
            if response.status().as_u16() < 500 {
                return true;
            }
        }
        if start.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
