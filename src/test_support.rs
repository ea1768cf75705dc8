//! In-process fake configuration endpoint for tests

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

/// Serves scripted `config get cluster` and `stats` replies on 127.0.0.1
///
/// Config replies are served in order; the last one repeats once the script
/// is exhausted.
pub struct FakeDiscoveryServer {
    port: u16,
    config_requests: Arc<AtomicUsize>,
    stats_requests: Arc<AtomicUsize>,
    configs: Arc<Mutex<Vec<String>>>,
}

impl FakeDiscoveryServer {
    pub fn start(configs: Vec<String>, stats: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let port = listener.local_addr().expect("local addr").port();

        let config_requests = Arc::new(AtomicUsize::new(0));
        let stats_requests = Arc::new(AtomicUsize::new(0));
        let configs = Arc::new(Mutex::new(configs));

        let server = Self {
            port,
            config_requests: Arc::clone(&config_requests),
            stats_requests: Arc::clone(&stats_requests),
            configs: Arc::clone(&configs),
        };

        let stats = stats.to_string();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut command = String::new();
                if reader.read_line(&mut command).is_err() {
                    continue;
                }

                let reply = match command.trim_end() {
                    "config get cluster" => {
                        let n = config_requests.fetch_add(1, Ordering::SeqCst);
                        let configs = configs.lock();
                        let idx = n.min(configs.len().saturating_sub(1));
                        configs.get(idx).cloned().unwrap_or_default()
                    }
                    "stats" => {
                        stats_requests.fetch_add(1, Ordering::SeqCst);
                        stats.clone()
                    }
                    _ => "ERROR\r\n".to_string(),
                };

                let _ = stream.write_all(reply.as_bytes());
                let _ = stream.write_all(b"END\r\n");
            }
        });

        server
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn config_requests(&self) -> usize {
        self.config_requests.load(Ordering::SeqCst)
    }

    pub fn stats_requests(&self) -> usize {
        self.stats_requests.load(Ordering::SeqCst)
    }

    /// Replace the scripted config replies; serving restarts from the last entry
    pub fn set_config(&self, config: String) {
        *self.configs.lock() = vec![config];
    }
}

/// Build a `config get cluster` reply body for the given nodes
pub fn config_reply(version: u64, nodes: &[(&str, &str, u16)]) -> String {
    let nodes_line = nodes
        .iter()
        .map(|(host, ip, port)| format!("{}|{}|{}", host, ip, port))
        .collect::<Vec<_>>()
        .join(" ");
    let body = format!("{}\n{}\n", version, nodes_line);
    format!("CONFIG cluster 0 {}\r\n{}\r\n", body.len(), body)
}

/// Accepts connections and never replies; each one is closed after `hold`
pub fn start_silent_server(hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind silent server");
    let port = listener.local_addr().expect("local addr").port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            thread::spawn(move || {
                thread::sleep(hold);
                drop(stream);
            });
        }
    });

    format!("127.0.0.1:{}", port)
}
