//! Per-subdomain nginx proxy configuration (spec.md §4.3 step 9): write,
//! validate (`nginx -t`), and reload (`systemctl reload nginx`) with up
//! to 3 retries. "Proxy failures are warnings, not deployment failures."

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::warn;

const RELOAD_RETRIES: u32 = 3;
const RELOAD_BACKOFF: Duration = Duration::from_millis(300);

fn proxy_template(subdomain: &str, base_domain: &str, port: u16) -> String {
    format!(
        r#"server {{
    listen 80;
    server_name {subdomain}.{base_domain};
    return 301 https://$host$request_uri;
}}

server {{
    listen 443 ssl http2;
    server_name {subdomain}.{base_domain};

    ssl_protocols TLSv1.2 TLSv1.3;
    ssl_ciphers HIGH:!aNULL:!MD5;

    location / {{
        proxy_pass http://localhost:{port};
        proxy_http_version 1.1;
        proxy_set_header Upgrade $http_upgrade;
        proxy_set_header Connection "upgrade";
        proxy_set_header Host $host;
        proxy_read_timeout 300s;
        proxy_connect_timeout 300s;
        proxy_send_timeout 300s;
    }}
}}
"#
    )
}

/// Writes the subdomain's proxy config, links it into the enabled-sites
/// directory if absent, then validates and reloads nginx. Returns `Ok`
/// even when the reload ultimately fails — callers log the failure as a
/// warning per spec.md's "proxy failures are warnings" rule.
pub async fn configure_proxy(
    nginx_sites_dir: &Path,
    enabled_sites_dir: &Path,
    subdomain: &str,
    base_domain: &str,
    port: u16,
) -> bool {
    let config_path = nginx_sites_dir.join(format!("{subdomain}.conf"));
    let contents = proxy_template(subdomain, base_domain, port);

    if let Err(err) = tokio::fs::write(&config_path, contents).await {
        warn!(%err, %subdomain, "failed to write proxy configuration");
        return false;
    }

    let enabled_path = enabled_sites_dir.join(format!("{subdomain}.conf"));
    if tokio::fs::symlink_metadata(&enabled_path).await.is_err() {
        if let Err(err) = tokio::fs::symlink(&config_path, &enabled_path).await {
            warn!(%err, %subdomain, "failed to enable proxy configuration");
        }
    }

    reload_with_retries().await
}

async fn nginx_config_valid() -> bool {
    Command::new("nginx")
        .arg("-t")
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

async fn reload_nginx() -> bool {
    Command::new("systemctl")
        .arg("reload")
        .arg("nginx")
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

async fn reload_with_retries() -> bool {
    for attempt in 1..=RELOAD_RETRIES {
        if nginx_config_valid().await && reload_nginx().await {
            return true;
        }
        warn!(attempt, "nginx reload attempt failed");
        if attempt < RELOAD_RETRIES {
            tokio::time::sleep(RELOAD_BACKOFF).await;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_includes_redirect_and_websocket_upgrade_headers() {
        let rendered = proxy_template("demo", "example.com", 9001);
        assert!(rendered.contains("return 301 https://$host$request_uri;"));
        assert!(rendered.contains("proxy_pass http://localhost:9001;"));
        assert!(rendered.contains("Upgrade $http_upgrade"));
        assert!(rendered.contains("HIGH:!aNULL:!MD5"));
    }
}
