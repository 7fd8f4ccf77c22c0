//! Explicit application context owning the current model factory.
//!
//! A session is built once and passed to whatever needs gateway lookups.
//! The factory is created lazily by the first successful [`Session::load`]
//! and only ever replaced wholesale by [`Session::reload`].

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{SessionError, SpecError};
use crate::factory::ModelFactory;
use crate::loader::SpecLoader;
use crate::ready::ReadyBarrier;
use crate::transport::Transport;

pub struct Session {
    loader: SpecLoader,
    transport: Arc<dyn Transport>,
    factory: RwLock<Option<Arc<ModelFactory>>>,
    ready: ReadyBarrier,
}

impl Session {
    /// Session whose gateways share `transport`; `loader` decides where the
    /// specification comes from.
    pub fn new(loader: SpecLoader, transport: Arc<dyn Transport>) -> Self {
        Self {
            loader,
            transport,
            factory: RwLock::new(None),
            // One outstanding dependency: the specification fetch.
            ready: ReadyBarrier::new(1),
        }
    }

    /// Session using the default specification path on `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self::new(SpecLoader::new(transport.clone()), transport)
    }

    /// Current factory, loading it first if this is the first call. A failed
    /// load leaves the session unloaded; call again to retry.
    pub async fn load(&self) -> Result<Arc<ModelFactory>, SessionError> {
        if let Some(factory) = self.factory.read().await.as_ref() {
            return Ok(factory.clone());
        }

        let mut guard = self.factory.write().await;
        // Another task may have finished loading while we waited.
        if let Some(factory) = guard.as_ref() {
            return Ok(factory.clone());
        }

        let factory = self.build().await?;
        *guard = Some(factory.clone());
        self.ready.complete_one();
        info!("session loaded {} models", factory.len());
        Ok(factory)
    }

    /// Fetch the specification again and swap in a new factory. On failure
    /// the previous factory stays in place.
    pub async fn reload(&self) -> Result<Arc<ModelFactory>, SessionError> {
        let factory = match self.build().await {
            Ok(factory) => factory,
            Err(e) => {
                warn!("reload failed, keeping current models: {}", e);
                return Err(e);
            }
        };
        *self.factory.write().await = Some(factory.clone());
        self.ready.complete_one();
        info!("session reloaded {} models", factory.len());
        Ok(factory)
    }

    /// Factory if one has been loaded.
    pub async fn factory(&self) -> Option<Arc<ModelFactory>> {
        self.factory.read().await.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    /// Wait until some task has loaded the factory, then return it.
    pub async fn ready(&self) -> Arc<ModelFactory> {
        loop {
            self.ready.wait().await;
            if let Some(factory) = self.factory().await {
                return factory;
            }
        }
    }

    async fn build(&self) -> Result<Arc<ModelFactory>, SessionError> {
        let spec = self.loader.load_specification().await?;
        let factory = ModelFactory::from_specification(&spec, self.transport.clone())
            .map_err(SpecError::from)?;
        Ok(Arc::new(factory))
    }
}
