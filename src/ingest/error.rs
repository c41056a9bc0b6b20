//! # 导入错误模型
//!
//! 单个条目的失败只影响该条目，流水线按条目收集错误并汇总到 `IngestReport`。

/// 图片导入错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    #[error("不支持的文件类型：{0}")]
    UnsupportedType(String),

    #[error("宿主运行时不可用，无法处理字节数据")]
    NoRuntime,

    #[error("读取或编码失败：{0}")]
    EncodingFailure(String),

    #[error("保存失败：{0}")]
    PersistenceFailure(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

impl IngestError {
    /// 稳定错误码，供 UI 区分提示样式。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "unsupported_type",
            Self::NoRuntime => "no_runtime",
            Self::EncodingFailure(_) => "encoding_failure",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }
}

impl From<IngestError> for String {
    fn from(error: IngestError) -> Self {
        error.to_string()
    }
}
