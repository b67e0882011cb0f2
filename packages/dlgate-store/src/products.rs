use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizedText {
    pub zh: String,
    pub en: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowsLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinuxLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appimage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deb: Option<String>,
}

/// Per-OS download variants. URLs may carry a `{version}` token that the
/// resolver substitutes at lookup time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<WindowsLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux: Option<LinuxLinks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLinks {
    /// Primary CDN link, served to mainland-China clients.
    pub cdn: String,
    /// Official-store mirror. A `TODO_` marker means "not yet configured".
    pub mirror: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_links: Option<PlatformLinks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub slug: String,
    pub name: LocalizedText,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
    pub download: DownloadLinks,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub count: u64,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductsData {
    pub products: Vec<Product>,
}

/// Flat-file product catalog and download counter. Every increment is a
/// read-modify-write of the whole document, serialized through an
/// internal lock; concurrent writers from other processes may undercount
/// but cannot corrupt the structure.
pub struct ProductStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProductStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn load(&self) -> Result<ProductsData, BoxError> {
        if !self.path.exists() {
            return Ok(ProductsData::default());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, data: &ProductsData) -> Result<(), BoxError> {
        let json = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn get_product(&self, slug: &str) -> Result<Option<Product>, BoxError> {
        let data = self.load().await?;
        Ok(data.products.into_iter().find(|p| p.slug == slug))
    }

    /// Current count for a product, 0 when the slug is unknown.
    pub async fn get_count(&self, slug: &str) -> Result<u64, BoxError> {
        Ok(self
            .get_product(slug)
            .await?
            .map(|p| p.count)
            .unwrap_or(0))
    }

    /// Increment a product's counter and persist the document. Returns the
    /// new count, or `None` without writing when the slug is unknown.
    pub async fn increment_count(&self, slug: &str) -> Result<Option<u64>, BoxError> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.load().await?;
        let product = match data.products.iter_mut().find(|p| p.slug == slug) {
            Some(product) => product,
            None => return Ok(None),
        };
        product.count += 1;
        let count = product.count;
        self.save(&data).await?;
        Ok(Some(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_data() -> ProductsData {
        ProductsData {
            products: vec![Product {
                slug: "widget".to_string(),
                name: LocalizedText {
                    zh: "部件".to_string(),
                    en: "Widget".to_string(),
                },
                version: "1.0.0".to_string(),
                github_repo: Some("acme/widget".to_string()),
                download: DownloadLinks {
                    cdn: "https://cdn.example.com/widget.zip".to_string(),
                    mirror: "https://store.example.org/widget".to_string(),
                    platform_links: None,
                },
                available: true,
                count: 4,
            }],
        }
    }

    async fn store_with_sample(dir: &TempDir) -> ProductStore {
        let path = dir.path().join("products.json");
        let store = ProductStore::new(&path);
        store.save(&sample_data()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_count() {
        let dir = TempDir::new().unwrap();
        let store = store_with_sample(&dir).await;
        assert_eq!(store.get_count("widget").await.unwrap(), 4);
        assert_eq!(store.get_count("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_persists() {
        let dir = TempDir::new().unwrap();
        let store = store_with_sample(&dir).await;
        assert_eq!(store.increment_count("widget").await.unwrap(), Some(5));

        // Fresh handle over the same file sees the persisted count.
        let reopened = ProductStore::new(dir.path().join("products.json"));
        assert_eq!(reopened.get_count("widget").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_increment_unknown_slug_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let store = store_with_sample(&dir).await;
        let before = tokio::fs::read_to_string(dir.path().join("products.json"))
            .await
            .unwrap();

        assert_eq!(store.increment_count("missing").await.unwrap(), None);

        let after = tokio::fs::read_to_string(dir.path().join("products.json"))
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let store = ProductStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().products.is_empty());
        assert_eq!(store.get_count("widget").await.unwrap(), 0);
    }

    #[test]
    fn test_product_defaults() {
        let product: Product = serde_json::from_str(
            r#"{
                "slug": "widget",
                "name": {"zh": "部件", "en": "Widget"},
                "version": "1.0.0",
                "download": {
                    "cdn": "https://cdn.example.com/widget.zip",
                    "mirror": "https://store.example.org/TODO_widget"
                }
            }"#,
        )
        .unwrap();
        assert!(product.available);
        assert_eq!(product.count, 0);
        assert!(product.github_repo.is_none());
        assert!(product.download.platform_links.is_none());
    }
}
