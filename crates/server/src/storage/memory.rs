use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ObjectStore, StorageError};

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    size: usize,
}

/// In-process object store used by the `memory` storage backend and tests.
///
/// Failures can be injected per key pattern to exercise the engine's
/// abort and tolerate paths.
pub struct MemoryObjectStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_puts: Mutex<Vec<String>>,
    put_delay: Mutex<Option<Duration>>,
    fail_deletes: AtomicBool,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(BTreeMap::new()),
            failing_puts: Mutex::new(Vec::new()),
            put_delay: Mutex::new(None),
            fail_deletes: AtomicBool::new(false),
            put_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Make every upload whose key contains `pattern` fail.
    pub async fn fail_puts_matching(&self, pattern: impl Into<String>) {
        self.failing_puts.lock().await.push(pattern.into());
    }

    /// Delay every upload, used to exercise upload timeouts.
    pub async fn delay_puts(&self, delay: Duration) {
        *self.put_delay.lock().await = Some(delay);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of upload attempts, failed ones included.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of delete attempts, failed ones included.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }

    /// Size in bytes of a stored object.
    pub async fn size_of(&self, key: &str) -> Option<usize> {
        self.objects.lock().await.get(key).map(|o| o.size)
    }

    pub async fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn put(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.put_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fails = self
            .failing_puts
            .lock()
            .await
            .iter()
            .any(|pattern| key.contains(pattern.as_str()));
        if fails {
            return Err(StorageError::Backend(format!("injected put failure for {key}")));
        }

        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                size: body.len(),
            },
        );
        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!(
                "injected delete failure for {key}"
            )));
        }
        self.objects.lock().await.remove(key);
        Ok(())
    }

    async fn presign(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        Ok(format!(
            "{}?X-Amz-Expires={}&X-Amz-Signature=memory",
            self.url_for(key),
            ttl.as_secs()
        ))
    }

    async fn list(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.keys().await)
    }
}
