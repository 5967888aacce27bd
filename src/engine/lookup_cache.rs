// ==========================================
// 可变计量单位定价引擎 - 配置查询缓存
// ==========================================
// 规则:
// - 同一 key 的并发查询共享同一个在途 future，只发起一次外部请求
// - 成功结果在编辑会话内缓存
// - 失败结果不缓存，下一次触发重新查询
// ==========================================

use crate::config::config_store::LookupError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

type SharedLookup<V> = Shared<BoxFuture<'static, Result<V, LookupError>>>;

pub struct LookupCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: Mutex<HashMap<String, SharedLookup<V>>>,
}

impl<V> LookupCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 取缓存值；无缓存且无在途查询时调用 fetch 发起查询
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<V, LookupError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, LookupError>> + Send + 'static,
    {
        let lookup = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(existing) => existing.clone(),
                None => {
                    tracing::debug!(key, "配置缓存未命中，发起查询");
                    let created = fetch().boxed().shared();
                    entries.insert(key.to_string(), created.clone());
                    created
                }
            }
        };

        let result = lookup.clone().await;
        if result.is_err() {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            // 只移除本次失败的那个条目，避免误删已被替换的新查询
            if entries.get(key).map_or(false, |current| current.ptr_eq(&lookup)) {
                entries.remove(key);
            }
        }
        result
    }

    pub fn invalidate(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for LookupCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
