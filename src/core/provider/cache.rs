use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::traits::ArtifactProvider;
use crate::core::artifact::ArtifactRef;
use crate::core::error::ModpackResult;

/// Provider wrapper that memoizes catalogs and download URLs.
///
/// The cache belongs to whoever builds the wrapper; drop it or call
/// `invalidate_project` / `clear` to force fresh lookups. Changelogs are
/// not cached.
pub struct CachingProvider<P> {
    inner: P,
    catalogs: Mutex<HashMap<u32, Vec<ArtifactRef>>>,
    urls: Mutex<HashMap<(u32, u32), String>>,
}

impl<P: ArtifactProvider> CachingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            catalogs: Mutex::new(HashMap::new()),
            urls: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Forget everything cached for one project.
    pub async fn invalidate_project(&self, project_id: u32) {
        self.catalogs.lock().await.remove(&project_id);
        self.urls
            .lock()
            .await
            .retain(|(project, _), _| *project != project_id);
    }

    pub async fn clear(&self) {
        self.catalogs.lock().await.clear();
        self.urls.lock().await.clear();
    }
}

#[async_trait]
impl<P: ArtifactProvider> ArtifactProvider for CachingProvider<P> {
    async fn resolve_download_url(&self, project_id: u32, file_id: u32) -> ModpackResult<String> {
        if let Some(url) = self.urls.lock().await.get(&(project_id, file_id)) {
            return Ok(url.clone());
        }

        let url = self.inner.resolve_download_url(project_id, file_id).await?;
        self.urls
            .lock()
            .await
            .insert((project_id, file_id), url.clone());
        Ok(url)
    }

    async fn resolve_changelog(&self, project_id: u32, file_id: u32) -> ModpackResult<String> {
        self.inner.resolve_changelog(project_id, file_id).await
    }

    async fn list_catalog(&self, project_id: u32) -> ModpackResult<Vec<ArtifactRef>> {
        if let Some(catalog) = self.catalogs.lock().await.get(&project_id) {
            debug!("Catalog cache hit for project {}", project_id);
            return Ok(catalog.clone());
        }

        let catalog = self.inner.list_catalog(project_id).await?;
        self.catalogs
            .lock()
            .await
            .insert(project_id, catalog.clone());
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingProvider {
        catalog_calls: AtomicUsize,
        url_calls: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactProvider for CountingProvider {
        async fn resolve_download_url(
            &self,
            project_id: u32,
            file_id: u32,
        ) -> ModpackResult<String> {
            self.url_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://cdn.example/{project_id}/{file_id}.jar"))
        }

        async fn resolve_changelog(&self, _project_id: u32, _file_id: u32) -> ModpackResult<String> {
            Ok("fixes".into())
        }

        async fn list_catalog(&self, project_id: u32) -> ModpackResult<Vec<ArtifactRef>> {
            self.catalog_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ArtifactRef::new(project_id, 1)])
        }
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let provider = CachingProvider::new(CountingProvider::default());

        provider.list_catalog(7).await.unwrap();
        provider.list_catalog(7).await.unwrap();
        provider.resolve_download_url(7, 1).await.unwrap();
        let url = provider.resolve_download_url(7, 1).await.unwrap();

        assert_eq!(url, "https://cdn.example/7/1.jar");
        assert_eq!(provider.inner().catalog_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.inner().url_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_a_fresh_lookup() {
        let provider = CachingProvider::new(CountingProvider::default());

        provider.list_catalog(7).await.unwrap();
        provider.list_catalog(8).await.unwrap();
        provider.invalidate_project(7).await;
        provider.list_catalog(7).await.unwrap();
        provider.list_catalog(8).await.unwrap();
        assert_eq!(provider.inner().catalog_calls.load(Ordering::SeqCst), 3);

        provider.clear().await;
        provider.list_catalog(8).await.unwrap();
        assert_eq!(provider.inner().catalog_calls.load(Ordering::SeqCst), 4);
    }
}
