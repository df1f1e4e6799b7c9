//! TCP connect probing, used both by `POST /ports/check` and by step 4's
//! "wait up to 5s for the port to become free" (spec.md §4.3).

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

const PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// A port is "available" when a connect attempt is refused (nothing
/// listening). Any successful connect, or any error other than refusal
/// (e.g. a timeout against a host firewalled but otherwise occupied),
/// is treated conservatively as "not available".
pub async fn is_port_available(port: u16) -> bool {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    match timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => false,
        Ok(Err(err)) => err.kind() == std::io::ErrorKind::ConnectionRefused,
        Err(_elapsed) => false,
    }
}

/// Polls until the port is free or the deadline passes, returning whether
/// it became free in time (spec.md §4.3 step 4: "wait up to 5 s ... free
/// = connect refused").
pub async fn wait_until_free(port: u16, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    loop {
        if is_port_available(port).await {
            return true;
        }
        if start.elapsed() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbound_port_is_available() {
        // Port 1 is a privileged port nothing in this test environment
        // binds to; a refused connect is the expected "available" signal.
        assert!(is_port_available(1).await);
    }

    #[tokio::test]
    async fn bound_port_is_not_available() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _keep_alive = listener;
        assert!(!is_port_available(port).await);
    }
}
