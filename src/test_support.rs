//! Shared test doubles: scripted text/image backends and a one-shot HTTP stub.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::ai::provider::TextGenerator;
use crate::image::ImageBackend;
use crate::types::{ErrorCategory, ImagePayload, ProviderError, Result, TaleError};

// =============================================================================
// Text
// =============================================================================

/// Text backend returning scripted responses in order. The last response
/// repeats once the script is exhausted.
pub struct MockTextClient {
    responses: Mutex<VecDeque<std::result::Result<String, ErrorCategory>>>,
    delay: Option<Duration>,
    pub calls: AtomicU32,
    pub prompts: Mutex<Vec<String>>,
}

impl MockTextClient {
    pub fn replying(text: &str) -> Self {
        Self::scripted(vec![Ok(text.to_string())])
    }

    pub fn failing(category: ErrorCategory) -> Self {
        Self::scripted(vec![Err(category)])
    }

    pub fn scripted(responses: Vec<std::result::Result<String, ErrorCategory>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            delay: None,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextGenerator for MockTextClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            }
        };
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(category)) => Err(ProviderError::with_provider(
                category,
                "scripted failure",
                "mock",
            )
            .into()),
            None => Err(TaleError::Extraction("script empty".into())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

// =============================================================================
// Image
// =============================================================================

pub enum MockImageBehavior {
    Succeed(&'static str),
    Fail,
    Empty,
    Hang,
}

/// Image backend with a fixed behavior and a call counter
pub struct MockImageBackend {
    name: &'static str,
    behavior: MockImageBehavior,
    pub calls: AtomicU32,
}

impl MockImageBackend {
    pub fn new(name: &'static str, behavior: MockImageBehavior) -> Self {
        Self {
            name,
            behavior,
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBackend for MockImageBackend {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(&self, _description: &str, _style: &str) -> Result<ImagePayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            MockImageBehavior::Succeed(data) => Ok(ImagePayload::png(data)),
            MockImageBehavior::Empty => Ok(ImagePayload::png("")),
            MockImageBehavior::Fail => {
                Err(ProviderError::transport(self.name, "scripted failure").into())
            }
            MockImageBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ImagePayload::png("late"))
            }
        }
    }
}

// =============================================================================
// HTTP stub
// =============================================================================

/// Serve exactly one HTTP response on a random local port.
///
/// Returns the base URL and a handle resolving to the raw request text.
pub async fn serve_once(status: u16, body: impl Into<String>) -> (String, JoinHandle<String>) {
    let body = body.into();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (base, handle)
}

/// Accept one connection and never answer
pub async fn serve_hang() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3600)).await;
    });
    base
}

/// A local URL nothing is listening on
pub async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    base
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// JSON body of a captured raw request
pub fn request_body(raw: &str) -> serde_json::Value {
    let body = raw.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("");
    serde_json::from_str(body).unwrap_or(serde_json::Value::Null)
}
