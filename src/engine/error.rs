// ==========================================
// 可变计量单位定价引擎 - 引擎层错误类型
// ==========================================
// 说明: 引擎错误只在内部流转；面向用户的操作会把它们转换为
//       行说明（降级），不会向宿主抛出
// ==========================================

use crate::config::config_store::LookupError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("服务端计价结果无效: {0}")]
    InvalidQuote(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
