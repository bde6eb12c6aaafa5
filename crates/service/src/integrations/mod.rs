//! Outbound integrations: geocoding, media storage and notifications.
//!
//! Each concern is a trait with a real HTTP-backed implementation and a
//! local fallback used when the integration is not configured.

pub mod geocoder;
pub mod media;
pub mod notifier;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use configs::AppConfig;

pub use geocoder::{DisabledGeocoder, GeocodeResult, Geocoder, GoogleGeocoder};
pub use media::{CloudinaryStore, LocalMediaStore, MediaStore, StoredMedia};
pub use notifier::{LogNotifier, Notification, Notifier, SmsGateway};

use crate::errors::ServiceError;

#[derive(Clone)]
pub struct Integrations {
    pub geocoder: Arc<dyn Geocoder>,
    pub media: Arc<dyn MediaStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl Integrations {
    /// Picks the configured implementation of each integration.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::Integration(e.to_string()))?;

        let geocoder: Arc<dyn Geocoder> = match &cfg.integrations.geocoding_api_key {
            Some(key) => {
                info!("geocoder: google");
                Arc::new(GoogleGeocoder::new(client.clone(), key.clone(), cfg.integrations.geocoding_base_url.clone()))
            }
            None => {
                info!("geocoder: disabled");
                Arc::new(DisabledGeocoder)
            }
        };
        let media: Arc<dyn MediaStore> = match &cfg.integrations.cloudinary {
            Some(c) => {
                info!(cloud = %c.cloud_name, "media store: cloudinary");
                Arc::new(CloudinaryStore::new(client.clone(), c.clone()))
            }
            None => {
                info!(dir = %cfg.uploads.dir, "media store: local");
                Arc::new(LocalMediaStore::new(&cfg.uploads.dir))
            }
        };
        let notifier: Arc<dyn Notifier> = match &cfg.integrations.sms {
            Some(s) => {
                info!(endpoint = %s.endpoint, "notifier: sms");
                Arc::new(SmsGateway::new(client, s.clone()))
            }
            None => {
                info!("notifier: log");
                Arc::new(LogNotifier)
            }
        };
        Ok(Self { geocoder, media, notifier })
    }

    /// Offline set: no geocoder, local media, log notifier.
    pub fn offline(uploads_dir: &str) -> Self {
        Self {
            geocoder: Arc::new(DisabledGeocoder),
            media: Arc::new(LocalMediaStore::new(uploads_dir)),
            notifier: Arc::new(LogNotifier),
        }
    }
}
