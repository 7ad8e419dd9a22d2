//! Scripted HTTP server for tests.
//!
//! Each test starts its own [`MockServer`] on an ephemeral port with a
//! closure that maps the request target to a [`Canned`] reply.  The server
//! records every target it sees so tests can assert on who was contacted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use tokio::net::TcpListener;

use crate::relay::{read_request_head, write_json};

pub enum Canned {
    Respond { status: u16, body: String },
    /// Accept the connection and never answer.
    Hang,
}

pub fn json_reply(status: u16, body: &str) -> Canned {
    Canned::Respond {
        status,
        body: body.to_string(),
    }
}

pub struct MockServer {
    pub base: String,
    requested: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Canned + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requested = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let log = Arc::clone(&requested);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let Ok(head) = read_request_head(&mut stream).await else {
                        return;
                    };
                    log.lock().unwrap().push(head.target.clone());
                    match handler(&head.target) {
                        Canned::Respond { status, body } => {
                            let status = StatusCode::from_u16(status).unwrap();
                            let _ = write_json(&mut stream, status, &[], body.as_bytes()).await;
                        }
                        Canned::Hang => {
                            tokio::time::sleep(Duration::from_secs(3600)).await;
                            drop(stream);
                        }
                    }
                });
            }
        });

        Self { base, requested }
    }

    /// Request targets received so far, in arrival order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requested.lock().unwrap().len()
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
