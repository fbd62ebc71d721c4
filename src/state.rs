use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::receipts::{
    ocr::{ReceiptOcr, TesseractOcr},
    parse::ReceiptParser,
};
use crate::storage::{ExpenseStore, MemoryStore, PgStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ExpenseStore>,
    pub ocr: Arc<dyn ReceiptOcr>,
    pub parser: Arc<ReceiptParser>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store.backend {
            StoreBackend::Postgres => {
                let pg = PgStore::connect(&config.store).await?;
                if let Err(e) = pg.migrate().await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg) as Arc<dyn ExpenseStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn ExpenseStore>
            }
        };

        let ocr = Arc::new(TesseractOcr::new(&config.ocr)) as Arc<dyn ReceiptOcr>;
        Self::from_parts(config, store, ocr)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn ExpenseStore>,
        ocr: Arc<dyn ReceiptOcr>,
    ) -> anyhow::Result<Self> {
        let parser = Arc::new(ReceiptParser::new(config.tracker.currency_markers)?);
        Ok(Self {
            config,
            store,
            ocr,
            parser,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(Arc::new(MemoryStore::new()), Some("FAKE SHOP\nTotal Rs 10"))
    }

    /// Memory store plus an OCR engine that returns `ocr_text`, or fails when `None`.
    #[cfg(test)]
    pub fn fake_with(store: Arc<MemoryStore>, ocr_text: Option<&str>) -> Self {
        use crate::config::{OcrConfig, SessionConfig, StoreConfig, TrackerConfig};
        use async_trait::async_trait;
        use bytes::Bytes;

        struct ScriptedOcr(Option<String>);
        #[async_trait]
        impl ReceiptOcr for ScriptedOcr {
            async fn image_to_text(&self, _image: Bytes) -> anyhow::Result<String> {
                self.0
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("ocr engine unavailable"))
            }
        }

        let config = Arc::new(AppConfig {
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 1,
                max_attempts: 1,
            },
            session: SessionConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            ocr: OcrConfig {
                command: "fake".into(),
                lang: "eng".into(),
                timeout_secs: 1,
            },
            tracker: TrackerConfig::DEFAULT,
        });

        let ocr = Arc::new(ScriptedOcr(ocr_text.map(str::to_string))) as Arc<dyn ReceiptOcr>;
        Self::from_parts(config, store as Arc<dyn ExpenseStore>, ocr).expect("default markers are valid")
    }
}
