use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use super::{ResolveRequest, Resolved, TextSource};
use crate::error::{ResolveError, StoreError};
use crate::models::is_blank;
use crate::store::Store;

/// Copies text from a secondary store that already holds the target rows.
pub struct RebuildLookup {
    store: Option<Store>,
}

impl RebuildLookup {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let store = Store::open_read_only(path).await?;
        Ok(Self { store: Some(store) })
    }
}

#[async_trait]
impl TextSource for RebuildLookup {
    fn name(&self) -> &str {
        "rebuild"
    }

    async fn resolve(&mut self, req: &ResolveRequest<'_>) -> Result<Option<Resolved>, ResolveError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let index = req.target.to_index();
        let row = store.get(&index, req.fohs_key).await?;

        Ok(row.and_then(|r| {
            if is_blank(r.text.as_deref()) {
                return None;
            }
            let fohs = r.fohs.filter(|f| !f.trim().is_empty());
            r.text.map(|text| Resolved { text, fohs })
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(store) = self.store.take() {
            store.close().await;
        }
        Ok(())
    }
}
