use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Canned behaviour of the mock order service.
#[derive(Debug, Clone, Copy)]
pub struct ServiceBehaviour {
    pub health_status: u16,
    pub order_status: u16,
}

pub struct ServerHandle {
    pub base_url: String,
    orders: Arc<AtomicU64>,
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Number of `POST /api/v1/orders` requests received so far.
    pub fn orders_received(&self) -> u64 {
        self.orders.load(Ordering::Relaxed)
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a lightweight order service for tests.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_order_service(behaviour: ServiceBehaviour) -> Result<ServerHandle, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let orders = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&orders);
    let (shutdown_tx, shutdown_rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    let counter = Arc::clone(&counter);
                    thread::spawn(move || handle_client(stream, behaviour, &counter));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    });

    Ok(ServerHandle {
        base_url: format!("http://{}", addr),
        orders,
        shutdown: shutdown_tx,
        thread: Some(handle),
    })
}

fn handle_client(mut stream: TcpStream, behaviour: ServiceBehaviour, orders: &AtomicU64) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let Ok(read_half) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let (status, payload) = if request_line.starts_with("GET /actuator/health") {
        (behaviour.health_status, r#"{"status":"UP"}"#.to_owned())
    } else if request_line.starts_with("POST /api/v1/orders") {
        let id = orders.fetch_add(1, Ordering::Relaxed);
        if behaviour.order_status >= 400 {
            (behaviour.order_status, r#"{"message":"rejected"}"#.to_owned())
        } else {
            (
                behaviour.order_status,
                format!(r#"{{"orderId":"ord-{id}","created":true,"status":"NEW"}}"#),
            )
        }
    } else {
        (404, String::new())
    };

    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}

/// Run the `orderload` binary from `dir` and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_orderload<I, S>(dir: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = orderload_bin()?;
    Command::new(bin)
        .current_dir(dir)
        .args(args)
        .env("ORDERLOAD_LOG", "warn")
        .env_remove("BASE_URL")
        .env_remove("DEBUG")
        .env("NO_COLOR", "1")
        .output()
        .map_err(|err| format!("run orderload failed: {}", err))
}

fn orderload_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_orderload").map_or_else(
        || Err("CARGO_BIN_EXE_orderload missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
