use std::sync::Arc;

use once_cell::sync::OnceCell;
use ragctx_core::config::EmbedSettings;
use ragctx_core::error::EmbedError;
use ragctx_core::traits::Embedder;
use tracing::info;

use crate::get_default_embedder;

type Loader = dyn Fn() -> Result<Arc<dyn Embedder>, EmbedError> + Send + Sync;

/// Cloneable handle to one lazily constructed embedder.
///
/// The first [`get`](Self::get) runs the loader; concurrent first callers
/// block until it finishes and then share the same instance. A failed load
/// leaves the handle empty, so the next call tries again.
#[derive(Clone)]
pub struct SharedEmbedder {
    inner: Arc<Inner>,
}

struct Inner {
    cell: OnceCell<Arc<dyn Embedder>>,
    loader: Box<Loader>,
}

impl SharedEmbedder {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>, EmbedError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(Inner { cell: OnceCell::new(), loader: Box::new(loader) }) }
    }

    /// Handle that loads whatever [`get_default_embedder`] picks for `settings`.
    pub fn from_settings(settings: EmbedSettings) -> Self {
        Self::new(move || get_default_embedder(&settings).map(Arc::from))
    }

    /// Handle around an already constructed embedder.
    pub fn from_instance(embedder: Arc<dyn Embedder>) -> Self {
        let handle = Self::new({
            let embedder = Arc::clone(&embedder);
            move || Ok(Arc::clone(&embedder))
        });
        let _ = handle.inner.cell.set(embedder);
        handle
    }

    pub fn get(&self) -> Result<Arc<dyn Embedder>, EmbedError> {
        self.inner
            .cell
            .get_or_try_init(|| {
                info!("initialising shared embedder");
                (self.inner.loader)()
            })
            .cloned()
    }

    pub fn is_loaded(&self) -> bool { self.inner.cell.get().is_some() }
}
