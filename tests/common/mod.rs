#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary; assumes the debug profile
        let mut cmd = Command::new("target/debug/poster-frame-api");
        cmd.env("POSTER_API_PORT", port.to_string())
            .env("MAPPING_POLICY", "reconcile")
            .env("DATABASE_RUN_MIGRATIONS", database_available().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Admins cannot self-register; create one through the operator CLI
pub fn create_admin(email: &str, password: &str, whatsapp_number: &str) -> Result<()> {
    let output = Command::new("target/debug/posterctl")
        .args(["create-admin", "--email", email, "--whatsapp-number", whatsapp_number])
        .env("POSTERCTL_ADMIN_PASSWORD", password)
        .stdin(Stdio::null())
        .output()
        .context("failed to run posterctl")?;
    anyhow::ensure!(
        output.status.success(),
        "posterctl create-admin failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(())
}

/// Flows that write accounts and frames need a real database
pub fn database_available() -> bool {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").map(|v| !v.is_empty()).unwrap_or(false)
}

/// Unwrap the `{"success": true, "data": ...}` envelope
pub async fn data(resp: reqwest::Response, expected: StatusCode) -> Result<Value> {
    let status = resp.status();
    let body = resp.json::<Value>().await?;
    anyhow::ensure!(status == expected, "expected {}, got {}: {}", expected, status, body);
    anyhow::ensure!(body["success"] == true, "missing success envelope: {}", body);
    Ok(body["data"].clone())
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

/// WhatsApp numbers are unique per account
pub fn unique_phone() -> String {
    format!("9{:09}", uuid::Uuid::new_v4().as_u128() % 1_000_000_000)
}
