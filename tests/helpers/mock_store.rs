// ==========================================
// Mock 定价配置源 - 用于集成测试
// ==========================================
// 能力: 调用计数、可配置延迟（配合 tokio 暂停时钟）、故障注入、服务端报价
// ==========================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use variable_pricing::config::{LookupError, PricingConfigStore, RemotePriceRequest, RemoteQuote};
use variable_pricing::domain::ItemPricingConfig;

#[derive(Default)]
pub struct MockStore {
    items: Mutex<HashMap<String, ItemPricingConfig>>,
    customers: Mutex<HashMap<String, Option<String>>>,
    remote_quote: Mutex<Option<RemoteQuote>>,
    failure: Mutex<Option<String>>,
    delay: Mutex<Duration>,
    item_calls: AtomicUsize,
    customer_calls: AtomicUsize,
    remote_calls: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, config: ItemPricingConfig) -> Self {
        self.items
            .lock()
            .unwrap()
            .insert(config.item_code.clone(), config);
        self
    }

    pub fn with_customer(self, customer_id: &str, group: Option<&str>) -> Self {
        self.customers
            .lock()
            .unwrap()
            .insert(customer_id.to_string(), group.map(str::to_string));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn with_remote_quote(self, quote: RemoteQuote) -> Self {
        *self.remote_quote.lock().unwrap() = Some(quote);
        self
    }

    /// 设置/清除故障（影响物料配置查询）
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(str::to_string);
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }

    pub fn customer_calls(&self) -> usize {
        self.customer_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PricingConfigStore for MockStore {
    async fn get_item_pricing_config(&self, item_code: &str) -> Result<ItemPricingConfig, LookupError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(LookupError::Backend(message));
        }
        self.items
            .lock()
            .unwrap()
            .get(item_code)
            .cloned()
            .ok_or_else(|| LookupError::ItemNotFound(item_code.to_string()))
    }

    async fn get_customer_group(&self, customer_id: &str) -> Result<Option<String>, LookupError> {
        self.customer_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .cloned()
            .ok_or_else(|| LookupError::CustomerNotFound(customer_id.to_string()))
    }

    async fn compute_price(&self, _request: &RemotePriceRequest) -> Result<RemoteQuote, LookupError> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        self.remote_quote
            .lock()
            .unwrap()
            .clone()
            .ok_or(LookupError::RemotePricingUnsupported)
    }
}
