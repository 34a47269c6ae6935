//! In-memory catalog storage.

use tokio::sync::RwLock;

/// Ordered list of records behind a read/write lock.
///
/// Reads share the lock; inserts take it exclusively, so id assignment and
/// append happen as one step.
#[derive(Debug, Default)]
pub struct Catalog<T> {
    items: RwLock<Vec<T>>,
}

impl<T: Clone> Catalog<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub async fn list(&self) -> Vec<T> {
        self.items.read().await.clone()
    }

    pub async fn filter<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        self.items
            .read()
            .await
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    pub async fn find<F>(&self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.items.read().await.iter().find(|item| predicate(item)).cloned()
    }

    /// Build a record from the current contents and append it.
    pub async fn insert_with<F>(&self, make: F) -> T
    where
        F: FnOnce(&[T]) -> T,
    {
        let mut items = self.items.write().await;
        let item = make(&items);
        items.push(item.clone());
        item
    }
}
