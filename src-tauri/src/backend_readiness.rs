use std::{
    io,
    net::{SocketAddr, TcpListener},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tokio::{net::TcpStream, process::Child, time};

use crate::{errors::BackendStartError, BACKEND_PING_TIMEOUT_MS, BACKEND_POLL_INTERVAL_MS};

pub(crate) type SharedChild = Arc<Mutex<Option<Child>>>;

fn connect_host(host: &str) -> &str {
    if host == "0.0.0.0" {
        "127.0.0.1"
    } else {
        host
    }
}

pub(crate) async fn ping_backend(host: &str, port: u16, timeout_ms: u64) -> bool {
    let timeout = Duration::from_millis(timeout_ms.max(50));
    matches!(
        time::timeout(timeout, TcpStream::connect((connect_host(host), port))).await,
        Ok(Ok(_))
    )
}

pub(crate) fn reserve_listen_port(
    host: &str,
    port: u16,
    listen_path: impl Fn(u16) -> String,
) -> Result<u16, BackendStartError> {
    let bind = |port: u16| -> io::Result<SocketAddr> {
        let listener = TcpListener::bind((host, port))?;
        listener.local_addr()
    };

    match bind(port) {
        Ok(address) => Ok(address.port()),
        Err(error) if error.kind() == io::ErrorKind::AddrInUse => {
            Err(BackendStartError::PortInUse {
                listen_path: listen_path(port),
            })
        }
        Err(error) => Err(BackendStartError::Other(format!(
            "Failed to bind {host}:{port}: {error}"
        ))),
    }
}

fn poll_child_exit(child: &SharedChild) -> Result<(), BackendStartError> {
    let mut guard = child
        .lock()
        .map_err(|_| BackendStartError::Other("Backend process lock poisoned.".to_string()))?;
    let Some(process) = guard.as_mut() else {
        return Err(BackendStartError::Other(
            "Backend process is not running.".to_string(),
        ));
    };
    match process.try_wait() {
        Ok(Some(status)) => {
            *guard = None;
            Err(BackendStartError::ExitedEarly {
                status: status.to_string(),
            })
        }
        Ok(None) => Ok(()),
        Err(error) => Err(BackendStartError::Other(format!(
            "Failed to poll backend process status: {error}"
        ))),
    }
}

pub(crate) async fn wait_for_backend(
    child: &SharedChild,
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<(), BackendStartError> {
    let start_time = Instant::now();

    loop {
        if ping_backend(host, port, BACKEND_PING_TIMEOUT_MS).await {
            return Ok(());
        }

        poll_child_exit(child)?;

        if start_time.elapsed() >= timeout {
            return Err(BackendStartError::Timeout {
                timeout_ms: timeout.as_millis(),
            });
        }

        time::sleep(Duration::from_millis(BACKEND_POLL_INTERVAL_MS)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_backend_detects_listening_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();

        assert!(ping_backend("127.0.0.1", port, 500).await);
        assert!(ping_backend("0.0.0.0", port, 500).await);
    }

    #[test]
    fn reserve_listen_port_assigns_a_free_port_for_zero() {
        let port = reserve_listen_port("127.0.0.1", 0, |port| port.to_string()).expect("reserve");
        assert_ne!(port, 0);
    }

    #[test]
    fn reserve_listen_port_reports_port_in_use_with_listen_path() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let error = reserve_listen_port("127.0.0.1", port, |port| {
            format!("http://127.0.0.1:{port}/")
        })
        .expect_err("port is taken");
        match error {
            BackendStartError::PortInUse { listen_path } => {
                assert_eq!(listen_path, format!("http://127.0.0.1:{port}/"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn wait_for_backend_fails_without_a_child() {
        let child: SharedChild = Arc::new(Mutex::new(None));
        let error = wait_for_backend(&child, "127.0.0.1", 1, Duration::from_secs(5))
            .await
            .expect_err("no child");
        assert!(matches!(error, BackendStartError::Other(_)));
    }

    #[tokio::test]
    async fn wait_for_backend_returns_once_reachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let child: SharedChild = Arc::new(Mutex::new(None));

        wait_for_backend(&child, "127.0.0.1", port, Duration::from_secs(5))
            .await
            .expect("reachable");
    }
}
