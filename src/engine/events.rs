// ==========================================
// 可变计量单位定价引擎 - 引擎层事件发布
// ==========================================
// 职责: 定义定价事件发布 trait 与行写回观察者 trait
// 说明: 引擎只定义 trait，宿主（表单层/审计层）实现适配器
// ==========================================

use crate::domain::line_item::{LineItem, RowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 定价事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PricingEventType {
    /// 自动计价结果已写回
    Priced,
    /// 输入不完整，已写零价
    Incomplete,
    /// 查询失败，已降级写零价
    LookupFailed,
    /// 结果过期被丢弃
    StaleDiscarded,
    /// 用户手工修改单价
    ManualRate,
    /// 锁定
    Locked,
    /// 解锁
    Unlocked,
    /// 切换销售方式后重置
    ModeReset,
}

impl PricingEventType {
    pub fn as_str(&self) -> &str {
        match self {
            PricingEventType::Priced => "Priced",
            PricingEventType::Incomplete => "Incomplete",
            PricingEventType::LookupFailed => "LookupFailed",
            PricingEventType::StaleDiscarded => "StaleDiscarded",
            PricingEventType::ManualRate => "ManualRate",
            PricingEventType::Locked => "Locked",
            PricingEventType::Unlocked => "Unlocked",
            PricingEventType::ModeReset => "ModeReset",
        }
    }
}

/// 定价事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingEvent {
    pub row_id: RowId,
    pub event_type: PricingEventType,
    /// 事件发生后行上的 rate
    pub rate: Option<f64>,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl PricingEvent {
    pub fn new(row_id: RowId, event_type: PricingEventType) -> Self {
        Self {
            row_id,
            event_type,
            rate: None,
            detail: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 定价事件发布者
///
/// 发布失败只记日志，不影响单据行
pub trait PricingEventPublisher: Send + Sync {
    fn publish(&self, event: PricingEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者（单元测试用）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl PricingEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: PricingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - row_id={}, event_type={}",
            event.row_id,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn PricingEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn PricingEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（未配置发布者时跳过；失败只告警）
    pub fn publish(&self, event: PricingEvent) {
        let Some(publisher) = &self.inner else {
            return;
        };
        let event_type = event.event_type;
        let row_id = event.row_id;
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(
                "定价事件发布失败 - row_id={}, event_type={}, error={}",
                row_id,
                event_type.as_str(),
                e
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

// ==========================================
// 行写回观察者
// ==========================================

/// 引擎写回计算字段后的通知
///
/// 宿主在此把字段变更同步给表单。回调期间引擎的 "正在写回" 标志仍然置位，
/// 宿主若因此触发 rate 变更事件，会被引擎忽略，不会被误判为手工修改。
/// 回调时单据锁已释放，`row` 为写回后的行快照。
pub trait RowWriteObserver: Send + Sync {
    fn on_row_written(&self, row: &LineItem);
}
