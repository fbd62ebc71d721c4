use std::{process::Stdio, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

use crate::config::OcrConfig;

#[async_trait]
pub trait ReceiptOcr: Send + Sync {
    async fn image_to_text(&self, image: Bytes) -> anyhow::Result<String>;
}

/// Runs the `tesseract` CLI, feeding the image on stdin.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    lang: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(cfg: &OcrConfig) -> Self {
        Self {
            command: cfg.command.clone(),
            lang: cfg.lang.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    async fn run(&self, image: Bytes) -> anyhow::Result<String> {
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", self.lang.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawn {}", self.command))?;

        let mut stdin = child.stdin.take().context("ocr stdin not captured")?;
        stdin.write_all(&image).await.context("write image to ocr")?;
        drop(stdin);

        let out = child.wait_with_output().await.context("wait for ocr")?;
        if !out.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.command,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[async_trait]
impl ReceiptOcr for TesseractOcr {
    async fn image_to_text(&self, image: Bytes) -> anyhow::Result<String> {
        let size = image.len();
        let text = tokio::time::timeout(self.timeout, self.run(image))
            .await
            .with_context(|| format!("ocr timed out after {:?}", self.timeout))??;
        debug!(bytes = size, chars = text.len(), "ocr finished");
        Ok(text)
    }
}

/// Receipt uploads are limited to PNG and JPEG.
pub fn is_supported_image(content_type: &str) -> bool {
    matches!(content_type, "image/png" | "image/jpeg" | "image/jpg")
}
