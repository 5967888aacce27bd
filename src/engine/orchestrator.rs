// ==========================================
// 可变计量单位定价引擎 - 重算编排器
// ==========================================
// 用途: 接收单据表单事件，按行调度 数量解析 → 最低计量 → 阶梯 → 价格 流水线
// 规则:
// - 代次全局递增，每行记录最新代次；新的触发使旧的计算结果过期
// - 行簿记只在该行有计算未完成时存在，空闲即释放
// - 尺寸/件数类输入先防抖，再发起配置查询
// - 配置查询是唯一的挂起点；单据锁只在同步读写时短暂持有
// - 写回计算结果期间置 "正在写回" 标志，期间的 rate 变更事件不视为手工修改
// - 锁定/解锁/强制重算/切换销售方式 优先于尚未返回的后台计算
// ==========================================

use crate::config::config_manager::EngineSettings;
use crate::config::config_store::{LookupError, PricingConfigStore, RemotePriceRequest};
use crate::domain::line_item::{LineItem, RowId, SalesDocument, SharedDocument};
use crate::domain::pricing::ItemPricingConfig;
use crate::domain::types::{DocumentType, LineField, OverrideState, PricingMode, SellingMode};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{
    OptionalEventPublisher, PricingEvent, PricingEventPublisher, PricingEventType,
    RowWriteObserver,
};
use crate::engine::lookup_cache::LookupCache;
use crate::engine::minimum::MinimumEnforcer;
use crate::engine::override_state::{InputDecision, OverrideStateMachine};
use crate::engine::price::{PriceCalculator, PriceInput, PriceOutcome, PriceSource};
use crate::engine::quantity::{QuantityOutcome, RawDimensions};
use crate::engine::rounding::round_currency;
use crate::engine::tier::TierResolver;
use crate::engine::validation::validate_item_config;
use crate::i18n::{t, t_with_args};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

// ==========================================
// RecalcOutcome - 单次触发的处理结论
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RecalcOutcome {
    /// 自动计价结果已写回
    Priced { rate: f64, amount: f64 },
    /// 无阶梯且无手工单价，已写零价
    NoPrice,
    /// 配置查询失败，已写零价与错误说明
    Degraded(String),
    /// 就地完成（按件销售、手工、锁定、重置）
    Settled,
    /// 输入不完整
    Incomplete,
    /// 单据未选择客户
    AwaitingCustomer,
    /// 行未选择物料
    AwaitingItem,
    /// 防抖窗口内被后续触发合并
    Coalesced,
    /// 结果返回时已过期，丢弃
    Stale,
    /// 结果返回时行已被用户接管（Manual/Locked），丢弃
    Preempted,
    /// 用户手工修改 rate 已生效
    ManualRate,
    /// 引擎写回或计算进行中的 rate 变更，忽略
    Ignored,
    /// 行已删除
    RowMissing,
}

#[derive(Debug, Default)]
struct RowTicket {
    generation: u64,
    /// 尚未结束的重算流程数（含防抖等待）
    pending: u32,
    in_flight: Option<u64>,
    applying: bool,
}

impl RowTicket {
    fn is_idle(&self) -> bool {
        self.pending == 0 && self.in_flight.is_none() && !self.applying
    }
}

fn release_if_idle(tickets: &mut HashMap<RowId, RowTicket>, row_id: RowId) {
    if tickets.get(&row_id).map_or(false, RowTicket::is_idle) {
        tickets.remove(&row_id);
    }
}

/// 发起查询时捕获的行快照
#[derive(Debug, Clone)]
struct PricingRequest {
    row_id: RowId,
    generation: u64,
    item_code: String,
    customer_id: String,
    mode: SellingMode,
    dims: RawDimensions,
    piece_count: f64,
    manual_unit_price: Option<f64>,
    current_rate: f64,
    quantity: QuantityOutcome,
}

enum Prepared {
    Done(RecalcOutcome),
    Price(PricingRequest),
}

fn lock_doc(doc: &SharedDocument) -> MutexGuard<'_, SalesDocument> {
    doc.lock().unwrap_or_else(PoisonError::into_inner)
}

// ==========================================
// PricingOrchestrator - 重算编排器
// ==========================================
pub struct PricingOrchestrator {
    store: Arc<dyn PricingConfigStore>,
    settings: EngineSettings,
    item_configs: LookupCache<Arc<ItemPricingConfig>>,
    customer_groups: LookupCache<Option<String>>,
    tickets: Mutex<HashMap<RowId, RowTicket>>,
    next_generation: AtomicU64,
    publisher: OptionalEventPublisher,
    observer: Option<Arc<dyn RowWriteObserver>>,
}

impl PricingOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - store: 外部定价配置源
    /// - settings: 引擎运行参数（防抖窗口、计价模式）
    pub fn new(store: Arc<dyn PricingConfigStore>, settings: EngineSettings) -> Self {
        Self {
            store,
            settings,
            item_configs: LookupCache::new(),
            customer_groups: LookupCache::new(),
            tickets: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            publisher: OptionalEventPublisher::none(),
            observer: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn PricingEventPublisher>) -> Self {
        self.publisher = OptionalEventPublisher::with_publisher(publisher);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RowWriteObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// 同一套处理逻辑服务所有销售单据类型
    pub fn supported_document_types(&self) -> &'static [DocumentType] {
        &DocumentType::ALL
    }

    // ==========================================
    // 表单事件入口
    // ==========================================

    /// 行字段变更（宿主已把新值写入单据）
    pub async fn on_field_changed(
        &self,
        doc: &SharedDocument,
        row_id: RowId,
        field: LineField,
    ) -> RecalcOutcome {
        debug!(%row_id, ?field, "收到字段变更");
        match field {
            LineField::Rate => self.on_rate_changed(doc, row_id),
            LineField::SellingMode => self.on_selling_mode_changed(doc, row_id),
            LineField::Item => {
                self.adopt_item_selling_mode(doc, row_id).await;
                self.recalculate(doc, row_id, false).await
            }
            _ => self.recalculate(doc, row_id, true).await,
        }
    }

    /// rate 字段变更
    ///
    /// 计算在途或正在写回时视为引擎副作用，忽略；否则转为 Manual
    pub fn on_rate_changed(&self, doc: &SharedDocument, row_id: RowId) -> RecalcOutcome {
        if self.is_busy(row_id) {
            debug!(%row_id, "计算在途或正在写回，忽略 rate 变更");
            return RecalcOutcome::Ignored;
        }
        self.bump_generation(row_id);

        let written = self.write_row(doc, row_id, |line, _| {
            OverrideStateMachine::on_rate_edited(line);
            (line.rate, true)
        });
        match written {
            Some(rate) => {
                info!(%row_id, rate, "单价已手工修改");
                self.publisher
                    .publish(PricingEvent::new(row_id, PricingEventType::ManualRate).with_rate(rate));
                RecalcOutcome::ManualRate
            }
            None => RecalcOutcome::RowMissing,
        }
    }

    /// 销售方式变更（宿主已写入新的销售方式）
    pub fn on_selling_mode_changed(&self, doc: &SharedDocument, row_id: RowId) -> RecalcOutcome {
        self.bump_generation(row_id);
        let written = self.write_row(doc, row_id, |line, _| {
            let mode = line.selling_mode;
            OverrideStateMachine::on_selling_mode_changed(line, mode);
            (mode, true)
        });
        match written {
            Some(mode) => {
                info!(%row_id, %mode, "销售方式已切换，行已重置");
                self.publisher.publish(
                    PricingEvent::new(row_id, PricingEventType::ModeReset).with_detail(mode.to_string()),
                );
                RecalcOutcome::Settled
            }
            None => RecalcOutcome::RowMissing,
        }
    }

    /// 锁定单价；返回行是否存在
    pub fn lock_row(&self, doc: &SharedDocument, row_id: RowId) -> bool {
        self.bump_generation(row_id);
        let written = self.write_row(doc, row_id, |line, _| {
            OverrideStateMachine::lock(line);
            (line.rate, true)
        });
        if let Some(rate) = written {
            info!(%row_id, rate, "单价已锁定");
            self.publisher
                .publish(PricingEvent::new(row_id, PricingEventType::Locked).with_rate(rate));
        }
        written.is_some()
    }

    /// 解锁；不会自动触发重算
    pub fn unlock_row(&self, doc: &SharedDocument, row_id: RowId) -> bool {
        self.bump_generation(row_id);
        let written = self.write_row(doc, row_id, |line, _| {
            OverrideStateMachine::unlock(line);
            (line.override_state, true)
        });
        if let Some(state) = written {
            info!(%row_id, %state, "单价已解锁");
            self.publisher.publish(
                PricingEvent::new(row_id, PricingEventType::Unlocked).with_detail(state.to_string()),
            );
        }
        written.is_some()
    }

    /// 强制重算：无视当前状态（包括 Locked），立即按 Auto 重算
    pub async fn force_recalculate(&self, doc: &SharedDocument, row_id: RowId) -> RecalcOutcome {
        info!(%row_id, "强制重算");
        let reset = self.write_row(doc, row_id, |line, _| {
            OverrideStateMachine::reset_for_force(line);
            ((), false)
        });
        if reset.is_none() {
            return RecalcOutcome::RowMissing;
        }
        self.reprice_after_reset(doc, row_id).await
    }

    /// 清除接管状态后的重算；按件销售行没有查询环节，就地结算后同样视为自动计价
    async fn reprice_after_reset(&self, doc: &SharedDocument, row_id: RowId) -> RecalcOutcome {
        let outcome = self.recalculate(doc, row_id, false).await;
        if outcome != RecalcOutcome::Settled {
            return outcome;
        }
        let settled = self.write_row(doc, row_id, |line, _| {
            let changed = OverrideStateMachine::settle_forced_piece(line);
            (changed, changed)
        });
        if settled == Some(true) {
            debug!(%row_id, "按件销售行强制重算完成，状态转为 Auto");
        }
        outcome
    }

    /// 客户变更：所有行重新触发（锁定/手工行只更新计量）
    pub async fn on_customer_changed(&self, doc: &SharedDocument) -> Vec<(RowId, RecalcOutcome)> {
        let row_ids = lock_doc(doc).row_ids();
        info!(rows = row_ids.len(), "客户已变更，全部行重新计价");
        self.fan_out(doc, row_ids).await
    }

    /// 全量重算：Locked 行跳过；Manual 行是否改回自动由参数决定
    pub async fn recalculate_all(&self, doc: &SharedDocument) -> Vec<(RowId, RecalcOutcome)> {
        let include_manual = self.settings.recalc_all_includes_manual;
        let rows: Vec<(RowId, bool)> = {
            let mut d = lock_doc(doc);
            d.rows
                .iter_mut()
                .filter(|line| match line.override_state {
                    OverrideState::Locked => false,
                    OverrideState::Manual => include_manual,
                    _ => true,
                })
                .map(|line| {
                    let reset = line.override_state == OverrideState::Manual;
                    if reset {
                        OverrideStateMachine::reset_for_force(line);
                    }
                    (line.row_id, reset)
                })
                .collect()
        };
        info!(rows = rows.len(), include_manual, "全量重算");
        let tasks = rows.into_iter().map(|(row_id, reset)| async move {
            let outcome = if reset {
                self.reprice_after_reset(doc, row_id).await
            } else {
                self.recalculate(doc, row_id, false).await
            };
            (row_id, outcome)
        });
        join_all(tasks).await
    }

    /// 行删除后清理簿记
    pub fn forget_row(&self, row_id: RowId) {
        self.tickets_guard().remove(&row_id);
    }

    /// 清空配置缓存（配置源数据变更后调用）
    pub fn invalidate_config_cache(&self) {
        self.item_configs.clear();
        self.customer_groups.clear();
    }

    async fn fan_out(&self, doc: &SharedDocument, row_ids: Vec<RowId>) -> Vec<(RowId, RecalcOutcome)> {
        let tasks = row_ids.into_iter().map(|row_id| async move {
            (row_id, self.recalculate(doc, row_id, false).await)
        });
        join_all(tasks).await
    }

    // ==========================================
    // 计价主流程
    // ==========================================

    async fn recalculate(&self, doc: &SharedDocument, row_id: RowId, debounce: bool) -> RecalcOutcome {
        let pending = PendingGuard::enter(self, row_id);
        let generation = pending.generation;

        // 1. 同步阶段：计量字段立即更新，按状态决定是否需要查询
        let prepared = self.write_row(doc, row_id, |line, customer| {
            (Self::prepare(line, customer, generation), true)
        });
        let request = match prepared {
            None => return RecalcOutcome::RowMissing,
            Some(Prepared::Done(outcome)) => {
                if outcome == RecalcOutcome::Incomplete {
                    self.publisher
                        .publish(PricingEvent::new(row_id, PricingEventType::Incomplete));
                }
                debug!(%row_id, ?outcome, "无需查询配置");
                return outcome;
            }
            Some(Prepared::Price(request)) => request,
        };

        // 2. 防抖
        if debounce && self.settings.debounce_ms > 0 {
            tokio::time::sleep(self.settings.debounce()).await;
            if !self.is_current(row_id, generation) {
                debug!(%row_id, generation, "防抖窗口内有新触发，合并");
                return RecalcOutcome::Coalesced;
            }
        }

        // 3. 查询与计算
        let result = {
            let _in_flight = InFlightGuard::enter(self, row_id, generation);
            self.price(&request).await
        };

        // 4. 过期检查
        if !self.is_current(row_id, generation) {
            debug!(%row_id, generation, "计算结果已过期，丢弃");
            self.publisher
                .publish(PricingEvent::new(row_id, PricingEventType::StaleDiscarded));
            return RecalcOutcome::Stale;
        }

        // 5. 写回
        let written = self.write_row(doc, row_id, |line, _| {
            if line.item_code.as_deref() != Some(request.item_code.as_str()) {
                return (RecalcOutcome::Stale, false);
            }
            if !line.override_state.allows_repricing() {
                return (RecalcOutcome::Preempted, false);
            }
            match &result {
                Ok(outcome) => {
                    OverrideStateMachine::apply_price(line, outcome);
                    if outcome.source == PriceSource::Unavailable {
                        (RecalcOutcome::NoPrice, true)
                    } else {
                        (
                            RecalcOutcome::Priced {
                                rate: outcome.rate,
                                amount: outcome.amount,
                            },
                            true,
                        )
                    }
                }
                Err(e) => {
                    let note = format!(
                        "{}\n{}",
                        PriceCalculator::quantity_summary(request.mode, &request.quantity, request.piece_count),
                        t_with_args("note.lookup_failed", &[("error", e.to_string().as_str())])
                    );
                    OverrideStateMachine::apply_degraded(line, note);
                    (RecalcOutcome::Degraded(e.to_string()), true)
                }
            }
        });
        let outcome = written.unwrap_or(RecalcOutcome::RowMissing);

        match &outcome {
            RecalcOutcome::Priced { rate, amount } => {
                info!(%row_id, item = %request.item_code, rate, amount, "自动计价完成");
                self.publisher
                    .publish(PricingEvent::new(row_id, PricingEventType::Priced).with_rate(*rate));
            }
            RecalcOutcome::NoPrice => {
                warn!(%row_id, item = %request.item_code, "未找到价格阶梯且无手工单价");
                self.publisher.publish(
                    PricingEvent::new(row_id, PricingEventType::Priced)
                        .with_rate(0.0)
                        .with_detail("no price"),
                );
            }
            RecalcOutcome::Degraded(reason) => {
                warn!(%row_id, item = %request.item_code, reason = %reason, "配置查询失败，已降级");
                self.publisher.publish(
                    PricingEvent::new(row_id, PricingEventType::LookupFailed).with_detail(reason.clone()),
                );
            }
            other => debug!(%row_id, ?other, "计算结果未写回"),
        }
        outcome
    }

    fn prepare(line: &mut LineItem, customer: Option<&str>, generation: u64) -> Prepared {
        let quantity = match OverrideStateMachine::on_input_changed(line) {
            InputDecision::Settled => return Prepared::Done(RecalcOutcome::Settled),
            InputDecision::Incomplete => return Prepared::Done(RecalcOutcome::Incomplete),
            InputDecision::Reprice(quantity) => quantity,
        };
        let summary = PriceCalculator::quantity_summary(line.selling_mode, &quantity, line.piece_count);

        // 缺物料或缺客户时无法计价，旧的自动价格一并清除
        let Some(item_code) = line.item_code.clone() else {
            OverrideStateMachine::clear_price(line);
            line.note = format!("{}\n{}", summary, t("note.select_item"));
            return Prepared::Done(RecalcOutcome::AwaitingItem);
        };
        let Some(customer_id) = customer.map(str::to_string) else {
            OverrideStateMachine::clear_price(line);
            line.note = format!("{}\n{}", summary, t("note.select_customer"));
            return Prepared::Done(RecalcOutcome::AwaitingCustomer);
        };

        Prepared::Price(PricingRequest {
            row_id: line.row_id,
            generation,
            item_code,
            customer_id,
            mode: line.selling_mode,
            dims: RawDimensions::from_line(line),
            piece_count: line.piece_count,
            manual_unit_price: line.manual_unit_price,
            current_rate: line.rate,
            quantity,
        })
    }

    async fn price(&self, request: &PricingRequest) -> EngineResult<PriceOutcome> {
        debug!(
            row_id = %request.row_id,
            generation = request.generation,
            item = %request.item_code,
            mode = %self.settings.pricing_mode,
            "发起计价"
        );
        match self.settings.pricing_mode {
            PricingMode::Local => self.price_locally(request).await,
            PricingMode::Remote => self.price_remotely(request).await,
        }
    }

    async fn price_locally(&self, request: &PricingRequest) -> EngineResult<PriceOutcome> {
        let (config, customer_group) = futures::try_join!(
            self.item_config(&request.item_code),
            self.customer_group(&request.customer_id),
        )?;

        let minimum = MinimumEnforcer::enforce(
            request.mode,
            request.quantity.total_measure,
            customer_group.as_deref(),
            &config.minimums,
        );
        let tier = TierResolver::resolve(request.mode, minimum.effective_measure, &config.tiers);

        Ok(PriceCalculator::calculate(&PriceInput {
            mode: request.mode,
            dims: request.dims,
            piece_count: request.piece_count,
            quantity: request.quantity,
            minimum: Some(&minimum),
            tier: tier.as_ref(),
            manual_unit_price: request.manual_unit_price,
            current_rate: request.current_rate,
        }))
    }

    async fn price_remotely(&self, request: &PricingRequest) -> EngineResult<PriceOutcome> {
        let quote = self
            .store
            .compute_price(&RemotePriceRequest {
                item_code: request.item_code.clone(),
                customer_id: request.customer_id.clone(),
                selling_mode: request.mode,
                dims: request.dims,
                piece_count: request.piece_count,
                manual_unit_price: request.manual_unit_price,
            })
            .await?;

        if !quote.rate.is_finite() || quote.rate < 0.0 {
            return Err(EngineError::InvalidQuote(format!("rate={}", quote.rate)));
        }

        let rate = round_currency(quote.rate);
        let amount = PriceCalculator::amount_for(rate, request.piece_count);
        let source = if rate > 0.0 {
            PriceSource::Tier
        } else {
            PriceSource::Unavailable
        };
        let note = if quote.note.trim().is_empty() {
            t_with_args(
                "note.remote_quote",
                &[
                    ("label", quote.tier_label.as_deref().unwrap_or("-")),
                    ("price", format!("{:.2}", quote.unit_price.unwrap_or(rate)).as_str()),
                ],
            )
        } else {
            quote.note
        };

        Ok(PriceOutcome {
            rate,
            amount,
            unit_price: quote.unit_price,
            tier_label: quote.tier_label,
            source,
            note,
        })
    }

    /// 新行选择物料：采用物料的默认销售方式
    ///
    /// 仅对 Unset 且尚未录入任何尺寸的行生效；查询失败时保持当前方式
    async fn adopt_item_selling_mode(&self, doc: &SharedDocument, row_id: RowId) {
        let item_code = {
            let d = lock_doc(doc);
            match d.row(row_id) {
                Some(line)
                    if line.override_state == OverrideState::Unset && !line.has_raw_dimensions() =>
                {
                    line.item_code.clone()
                }
                _ => None,
            }
        };
        let Some(item_code) = item_code else {
            return;
        };

        let config = match self.item_config(&item_code).await {
            Ok(config) => config,
            Err(e) => {
                debug!(%row_id, item = %item_code, error = %e, "读取物料默认销售方式失败");
                return;
            }
        };

        let adopted = self.write_row(doc, row_id, |line, _| {
            let fresh = line.override_state == OverrideState::Unset
                && !line.has_raw_dimensions()
                && line.item_code.as_deref() == Some(item_code.as_str());
            if fresh && line.selling_mode != config.default_selling_mode {
                OverrideStateMachine::on_selling_mode_changed(line, config.default_selling_mode);
                (true, true)
            } else {
                (false, false)
            }
        });
        if adopted == Some(true) {
            info!(%row_id, item = %item_code, mode = %config.default_selling_mode, "采用物料默认销售方式");
        }
    }

    async fn item_config(&self, item_code: &str) -> Result<Arc<ItemPricingConfig>, LookupError> {
        let store = Arc::clone(&self.store);
        let key = item_code.to_string();
        self.item_configs
            .get_or_fetch(item_code, move || async move {
                let config = store.get_item_pricing_config(&key).await?;
                for issue in validate_item_config(&config) {
                    warn!("定价配置存在可疑项: {}", issue);
                }
                Ok(Arc::new(config))
            })
            .await
    }

    async fn customer_group(&self, customer_id: &str) -> Result<Option<String>, LookupError> {
        let store = Arc::clone(&self.store);
        let key = customer_id.to_string();
        self.customer_groups
            .get_or_fetch(customer_id, move || async move {
                store.get_customer_group(&key).await
            })
            .await
    }

    // ==========================================
    // 行簿记
    // ==========================================

    /// 在单据锁内改写一行，随后（锁已释放、写回标志仍置位）通知观察者
    ///
    /// 闭包返回 (结果, 是否写入了字段)；行不存在时返回 None
    fn write_row<R, F>(&self, doc: &SharedDocument, row_id: RowId, write: F) -> Option<R>
    where
        F: FnOnce(&mut LineItem, Option<&str>) -> (R, bool),
    {
        let mut d = lock_doc(doc);
        if d.row(row_id).is_none() {
            drop(d);
            self.forget_row(row_id);
            return None;
        }
        let _applying = ApplyingGuard::enter(self, row_id);
        let (result, snapshot) = {
            let customer = d.customer_id.clone();
            let line = d.row_mut(row_id)?;
            let (result, written) = write(line, customer.as_deref());
            let snapshot = match (&self.observer, written) {
                (Some(_), true) => Some(line.clone()),
                _ => None,
            };
            (result, snapshot)
        };
        drop(d);
        if let (Some(observer), Some(row)) = (&self.observer, snapshot) {
            observer.on_row_written(&row);
        }
        Some(result)
    }

    fn tickets_guard(&self) -> MutexGuard<'_, HashMap<RowId, RowTicket>> {
        self.tickets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump_generation(&self, row_id: RowId) -> u64 {
        let mut tickets = self.tickets_guard();
        Self::bump_locked(&self.next_generation, &mut tickets, row_id).generation
    }

    fn bump_locked<'t>(
        counter: &AtomicU64,
        tickets: &'t mut HashMap<RowId, RowTicket>,
        row_id: RowId,
    ) -> &'t mut RowTicket {
        let ticket = tickets.entry(row_id).or_default();
        ticket.generation = counter.fetch_add(1, Ordering::SeqCst) + 1;
        ticket
    }

    fn is_current(&self, row_id: RowId, generation: u64) -> bool {
        self.tickets_guard()
            .get(&row_id)
            .map_or(false, |t| t.generation == generation)
    }

    fn is_busy(&self, row_id: RowId) -> bool {
        self.tickets_guard()
            .get(&row_id)
            .map_or(false, |t| t.applying || t.in_flight.is_some())
    }
}

/// 在途标记：离开作用域（包括 future 被丢弃）时清除
struct InFlightGuard<'a> {
    orchestrator: &'a PricingOrchestrator,
    row_id: RowId,
    generation: u64,
}

impl<'a> InFlightGuard<'a> {
    fn enter(orchestrator: &'a PricingOrchestrator, row_id: RowId, generation: u64) -> Self {
        if let Some(ticket) = orchestrator.tickets_guard().get_mut(&row_id) {
            ticket.in_flight = Some(generation);
        }
        Self {
            orchestrator,
            row_id,
            generation,
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut tickets = self.orchestrator.tickets_guard();
        if let Some(ticket) = tickets.get_mut(&self.row_id) {
            // 只清除自己设置的标记，新一代的在途标记保留
            if ticket.in_flight == Some(self.generation) {
                ticket.in_flight = None;
            }
        }
        release_if_idle(&mut tickets, self.row_id);
    }
}

/// 重算流程标记：从取得代次到流程结束（包括 future 被丢弃）
struct PendingGuard<'a> {
    orchestrator: &'a PricingOrchestrator,
    row_id: RowId,
    generation: u64,
}

impl<'a> PendingGuard<'a> {
    fn enter(orchestrator: &'a PricingOrchestrator, row_id: RowId) -> Self {
        let mut tickets = orchestrator.tickets_guard();
        let ticket =
            PricingOrchestrator::bump_locked(&orchestrator.next_generation, &mut tickets, row_id);
        ticket.pending += 1;
        let generation = ticket.generation;
        Self {
            orchestrator,
            row_id,
            generation,
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let mut tickets = self.orchestrator.tickets_guard();
        if let Some(ticket) = tickets.get_mut(&self.row_id) {
            ticket.pending = ticket.pending.saturating_sub(1);
        }
        release_if_idle(&mut tickets, self.row_id);
    }
}

/// 正在写回标记
struct ApplyingGuard<'a> {
    orchestrator: &'a PricingOrchestrator,
    row_id: RowId,
    previous: bool,
}

impl<'a> ApplyingGuard<'a> {
    fn enter(orchestrator: &'a PricingOrchestrator, row_id: RowId) -> Self {
        let mut tickets = orchestrator.tickets_guard();
        let ticket = tickets.entry(row_id).or_default();
        let previous = ticket.applying;
        ticket.applying = true;
        Self {
            orchestrator,
            row_id,
            previous,
        }
    }
}

impl Drop for ApplyingGuard<'_> {
    fn drop(&mut self) {
        let mut tickets = self.orchestrator.tickets_guard();
        if let Some(ticket) = tickets.get_mut(&self.row_id) {
            ticket.applying = self.previous;
        }
        release_if_idle(&mut tickets, self.row_id);
    }
}
