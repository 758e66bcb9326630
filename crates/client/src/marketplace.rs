//! Wiring for a complete marketplace client.

use std::sync::Arc;

use thiserror::Error;

use crate::api::{CommerceApi, Order};
use crate::cart::CartStore;
use crate::checkout::{self, CheckoutError};
use crate::config::ClientConfig;
use crate::session::{HttpTransport, SessionClient, Transport};
use crate::storage::{FileStorage, Storage, StorageError};

/// Errors that can occur while assembling a client.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to open storage: {0}")]
    Storage(#[from] StorageError),
}

/// Session, catalog API and cart sharing one storage backend.
#[derive(Debug, Clone)]
pub struct Marketplace {
    api: CommerceApi,
    cart: CartStore,
}

impl Marketplace {
    /// Build a client talking HTTP to the configured API, persisting into the
    /// configured storage directory.
    ///
    /// # Errors
    ///
    /// Returns `SetupError` if the HTTP client cannot be built or the storage
    /// directory cannot be created.
    pub fn open(config: &ClientConfig) -> Result<Self, SetupError> {
        let transport = HttpTransport::new(&config.api_base_url, config.request_timeout)?;
        let storage = FileStorage::open(&config.storage_dir)?;

        tracing::debug!(
            api = %config.api_base_url,
            storage = %storage.dir().display(),
            "Marketplace client ready"
        );

        Ok(Self::from_parts(
            Arc::new(transport),
            Arc::new(storage),
            config,
        ))
    }

    /// Build a client from an existing transport and storage.
    #[must_use]
    pub fn from_parts(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        config: &ClientConfig,
    ) -> Self {
        let session = SessionClient::new(transport, Arc::clone(&storage), config.renewal_timeout);
        let api = CommerceApi::new(session, config.catalog_cache_ttl);
        let cart = CartStore::load(storage);

        Self { api, cart }
    }

    #[must_use]
    pub const fn api(&self) -> &CommerceApi {
        &self.api
    }

    #[must_use]
    pub fn session(&self) -> &SessionClient {
        self.api.session()
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Submit the cart as an order. See [`checkout::checkout`].
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if not signed in, the cart is empty, or the
    /// order is rejected.
    pub async fn checkout(&self) -> Result<Vec<Order>, CheckoutError> {
        checkout::checkout(&self.api, &self.cart).await
    }
}
