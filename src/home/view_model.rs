use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::api::{AddProductRequest, ProductApi};
use crate::data::{NewProduct, ProductDraft};
use crate::database_ops::{filter_by_name, Db};
use crate::error::{CatalogError, CatalogResult};
use crate::home::state::{
    AddItemState, UiState, GENERIC_ERROR_MESSAGE, LOCAL_READ_ERROR_MESSAGE, NO_CONNECTION_MESSAGE,
};
use crate::media::stage_image;

/// Product list screen logic: decides when to trust the local cache and when the
/// remote catalog, and publishes the result as [`UiState`].
///
/// Each operation makes a single attempt. Nothing retries; callers re-trigger.
pub struct HomeViewModel {
    api: Arc<dyn ProductApi>,
    store: Arc<Db>,
    cache_dir: PathBuf,
    products: watch::Sender<UiState>,
    add_item_state: watch::Sender<AddItemState>,
}

impl HomeViewModel {
    pub fn new(api: Arc<dyn ProductApi>, store: Arc<Db>, cache_dir: impl Into<PathBuf>) -> Self {
        let (products, _) = watch::channel(UiState::Loading);
        let (add_item_state, _) = watch::channel(AddItemState::Idle);
        Self {
            api,
            store,
            cache_dir: cache_dir.into(),
            products,
            add_item_state,
        }
    }

    /// Build the view-model and kick off the initial load in the background.
    pub fn start(
        api: Arc<dyn ProductApi>,
        store: Arc<Db>,
        cache_dir: impl Into<PathBuf>,
    ) -> (Arc<Self>, JoinHandle<UiState>) {
        let vm = Arc::new(Self::new(api, store, cache_dir));
        let initial = vm.spawn_load();
        (vm, initial)
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.products.subscribe()
    }

    pub fn add_item_state(&self) -> watch::Receiver<AddItemState> {
        self.add_item_state.subscribe()
    }

    pub fn current(&self) -> UiState {
        self.products.borrow().clone()
    }

    /// Fetch remotely, persist, and publish what the store then holds.
    /// Connectivity failures fall back to the cached rows.
    #[instrument(skip(self))]
    pub async fn load_products(&self) -> UiState {
        self.publish(UiState::Loading);
        self.refresh().await
    }

    /// Same as [`load_products`](Self::load_products) but keeps the current list on
    /// screen while the fetch is in flight.
    async fn refresh(&self) -> UiState {
        let next = match self.api.fetch_products().await {
            Ok(remote) => {
                let rows: Vec<NewProduct> = remote.into_iter().map(NewProduct::from).collect();
                let persisted = self
                    .store
                    .run(move |db| {
                        db.upsert_products(&rows)?;
                        db.products()
                    })
                    .await;
                match persisted {
                    Ok(products) => {
                        info!(count = products.len(), "catalog refreshed from remote");
                        UiState::Success(products)
                    }
                    Err(err) => failure_state(&err),
                }
            }
            Err(err) if err.is_connectivity() => {
                warn!(error = %err, "catalog unreachable; falling back to cache");
                self.cached_or_offline().await
            }
            Err(err) => {
                warn!(error = %err, "catalog fetch failed");
                failure_state(&err)
            }
        };
        self.publish(next.clone());
        next
    }

    async fn cached_or_offline(&self) -> UiState {
        match self.store.run(|db| db.products()).await {
            Ok(cached) if !cached.is_empty() => {
                info!(count = cached.len(), "serving cached catalog");
                UiState::Success(cached)
            }
            Ok(_) => UiState::Error(NO_CONNECTION_MESSAGE.to_string()),
            Err(err) => failure_state(&err),
        }
    }

    /// Filter the cached rows by name. Never touches the network or the store contents;
    /// an empty result is still `Success`.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> UiState {
        let next = match self.store.run(|db| db.products()).await {
            Ok(rows) => {
                let hits = filter_by_name(&rows, query);
                debug!(total = rows.len(), hits = hits.len(), "search applied");
                UiState::Success(hits)
            }
            Err(err) => failure_state(&err),
        };
        self.publish(next.clone());
        next
    }

    /// Validate, upload, then refresh the list so the new product shows up.
    ///
    /// A draft that fails validation is rejected before any network call and
    /// publishes nothing. Every later failure lands in [`AddItemState::Failed`]
    /// and is also returned.
    #[instrument(skip(self, draft), fields(product = %draft.product_name))]
    pub async fn add_item(&self, draft: ProductDraft) -> CatalogResult<()> {
        draft.validate()?;
        self.add_item_state.send_replace(AddItemState::Submitting);

        let product_name = draft.product_name.trim().to_string();
        match self.submit(draft).await {
            Ok(()) => {
                info!("Your {product_name} has been successfully added.");
                match self.refresh().await {
                    UiState::Success(rows) => debug!(count = rows.len(), "list refreshed after add"),
                    other => warn!(state = ?other, "list refresh after add did not succeed"),
                }
                self.add_item_state
                    .send_replace(AddItemState::Added { product_name });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "add product failed");
                self.add_item_state
                    .send_replace(AddItemState::Failed(user_message(&err)));
                Err(err)
            }
        }
    }

    async fn submit(&self, draft: ProductDraft) -> CatalogResult<()> {
        let staged = match &draft.image {
            Some(source) => Some(stage_image(source, &self.cache_dir).await?),
            None => None,
        };
        let staged_path = staged.as_ref().map(|s| s.path.clone());

        let request = AddProductRequest {
            product_name: draft.product_name.trim().to_string(),
            product_type: draft.product_type.trim().to_string(),
            price: draft.price.trim().to_string(),
            tax: draft.tax.trim().to_string(),
            image: staged,
        };
        let result = self.api.add_product(request).await;

        if let Some(path) = staged_path {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(file = %path.display(), error = %e, "staged image not removed");
            }
        }
        result
    }

    /// Clear a finished submission result (dialog dismissed).
    pub fn dismiss_add_result(&self) {
        self.add_item_state.send_if_modified(|state| {
            if state.is_submitting() || *state == AddItemState::Idle {
                false
            } else {
                *state = AddItemState::Idle;
                true
            }
        });
    }

    pub fn spawn_load(self: &Arc<Self>) -> JoinHandle<UiState> {
        let vm = Arc::clone(self);
        tokio::spawn(async move { vm.load_products().await })
    }

    pub fn spawn_search(self: &Arc<Self>, query: impl Into<String>) -> JoinHandle<UiState> {
        let vm = Arc::clone(self);
        let query = query.into();
        tokio::spawn(async move { vm.search_products(&query).await })
    }

    pub fn spawn_add_item(self: &Arc<Self>, draft: ProductDraft) -> JoinHandle<CatalogResult<()>> {
        let vm = Arc::clone(self);
        tokio::spawn(async move { vm.add_item(draft).await })
    }

    fn publish(&self, state: UiState) {
        self.products.send_replace(state);
    }
}

fn failure_state(err: &CatalogError) -> UiState {
    UiState::Error(user_message(err))
}

fn user_message(err: &CatalogError) -> String {
    match err {
        CatalogError::Connectivity(_) => NO_CONNECTION_MESSAGE.to_string(),
        CatalogError::Remote { .. } => err
            .remote_message()
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string(),
        CatalogError::LocalRead(_) | CatalogError::LocalWrite(_) => {
            LOCAL_READ_ERROR_MESSAGE.to_string()
        }
        CatalogError::Validation(v) => v.to_string(),
        CatalogError::Image(_) => err.to_string(),
    }
}
