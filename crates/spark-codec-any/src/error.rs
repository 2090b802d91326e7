//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 汇总 `Any` 信封在打包、解包、转码与文本解析路径上可能出现的全部失败；
//! - 每个变体都映射到 [`codes`] 中的稳定错误码，命名遵循 `<领域>.<语义>`。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，可直接以 `?` 传播；
//! - “投影不可用”不是错误：转码引擎以 `Option` 表达，调用方据此区分“没有规范字节”与“输入畸形”。

use thiserror::Error;

/// `Any` 信封相关的稳定错误码。
///
/// # 契约说明（What）
/// - 码值遵循 `<领域>.<语义>`，可直接写入日志字段 `error.code`；
/// - 新增码值只能追加，不得修改既有字符串。
pub mod codes {
    /// 目标类型与类型 URL 不一致。
    pub const PROTOCOL_TYPE_MISMATCH: &str = "protocol.type_mismatch";
    /// 二进制编码失败。
    pub const PROTOCOL_ENCODE: &str = "protocol.encode";
    /// 二进制解码失败。
    pub const PROTOCOL_DECODE: &str = "protocol.decode";
    /// 结构化文本（JSON）解码失败。
    pub const STRUCTURED_DECODE: &str = "any.structured_decode";
    /// 结构化文本（JSON）编码失败。
    pub const STRUCTURED_ENCODE: &str = "any.structured_encode";
    /// 文本格式解析失败。
    pub const TEXT_DECODE: &str = "any.text_decode";
    /// 类型不具备文本格式输出。
    pub const TEXT_ENCODE: &str = "any.text_encode";
    /// 注册中心无法解析类型。
    pub const UNRESOLVABLE_TYPE: &str = "any.unresolvable_type";
    /// 输入存在未消费的尾部内容。
    pub const TRAILING_INPUT: &str = "any.trailing_input";
    /// 缺少类型 URL。
    pub const MISSING_TYPE_URL: &str = "any.missing_type_url";
    /// 注册阶段已结束。
    pub const REGISTRY_SEALED: &str = "any.registry_sealed";
    /// 配置非法。
    pub const CONFIG_INVALID: &str = "config.invalid";
}

/// `Any` 信封错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把外部编解码器、注册中心与文本扫描器的失败合流为单一枚举，
///   便于调用方按 [`AnyError::code`] 聚合告警；
/// - **契约 (What)**：
///   - 所有变体均满足 `Send + Sync + 'static`；
///   - 编解码器返回的失败原样包装为 `BinaryEncode`/`BinaryDecode`/`StructuredDecode`，不做重试；
/// - **设计权衡 (Trade-offs)**：上下文以 `String` 保存，牺牲少量堆分配换取可读的诊断信息。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnyError {
    /// 解包目标的注册名与信封类型 URL 中的类型名不一致，或解码路径所需的类型无法解析且没有兜底表示。
    #[error("type mismatch: envelope holds `{actual}`, target expects `{expected}`")]
    TypeMismatch {
        /// 解包目标的注册名。
        expected: String,
        /// 类型 URL 中携带的类型名。
        actual: String,
    },

    /// 外部二进制编解码器在编码阶段失败。
    #[error("failed to encode `{type_name}`: {detail}")]
    BinaryEncode {
        /// 编码失败的类型名。
        type_name: String,
        /// 编解码器给出的原因。
        detail: String,
    },

    /// 外部二进制编解码器在解码阶段失败。
    #[error("failed to decode `{type_name}` from bytes: {detail}")]
    BinaryDecode {
        /// 解码目标的类型名。
        type_name: String,
        /// 编解码器给出的原因。
        detail: String,
    },

    /// 结构化文本片段无法解码为目标类型。
    #[error("failed to decode `{type_name}` from structured text: {detail}")]
    StructuredDecode {
        /// 解码目标的类型名。
        type_name: String,
        /// 编解码器给出的原因。
        detail: String,
    },

    /// 目标类型无法输出结构化文本。
    #[error("failed to encode `{type_name}` as structured text: {detail}")]
    StructuredEncode {
        /// 输出失败的类型名。
        type_name: String,
        /// 编解码器给出的原因。
        detail: String,
    },

    /// 文本格式扫描或字段解析失败；`offset` 为出错位置的字节偏移。
    #[error("text format error at byte {offset}: {detail}")]
    TextDecode {
        /// 出错位置的字节偏移。
        offset: usize,
        /// 失败原因。
        detail: String,
    },

    /// 类型没有文本格式输出映射。
    #[error("`{type_name}` cannot be written as text format: {detail}")]
    TextEncode {
        /// 无法输出的类型名。
        type_name: String,
        /// 失败原因。
        detail: String,
    },

    /// 必须查询注册中心的路径上未找到对应类型。
    #[error("type URL `{type_url}` does not resolve to a registered message type")]
    UnresolvableType {
        /// 未能解析的完整类型 URL。
        type_url: String,
    },

    /// 解码结束后仍有未消费的输入。
    #[error("unexpected trailing input at byte {offset}")]
    TrailingInput {
        /// 第一个多余字节的偏移。
        offset: usize,
    },

    /// 写入结构化片段前未设置类型 URL。
    #[error("structured fragment requires a type URL")]
    MissingTypeUrl,

    /// 注册中心已封存，拒绝新的类型注册。
    #[error("registry is sealed, cannot register `{type_name}`")]
    RegistrySealed {
        /// 被拒绝注册的类型名。
        type_name: String,
    },

    /// 配置校验失败。
    #[error("invalid configuration: {detail}")]
    Config {
        /// 校验失败的原因。
        detail: String,
    },
}

impl AnyError {
    /// 返回稳定错误码，供日志与指标聚合。
    pub fn code(&self) -> &'static str {
        match self {
            AnyError::TypeMismatch { .. } => codes::PROTOCOL_TYPE_MISMATCH,
            AnyError::BinaryEncode { .. } => codes::PROTOCOL_ENCODE,
            AnyError::BinaryDecode { .. } => codes::PROTOCOL_DECODE,
            AnyError::StructuredDecode { .. } => codes::STRUCTURED_DECODE,
            AnyError::StructuredEncode { .. } => codes::STRUCTURED_ENCODE,
            AnyError::TextDecode { .. } => codes::TEXT_DECODE,
            AnyError::TextEncode { .. } => codes::TEXT_ENCODE,
            AnyError::UnresolvableType { .. } => codes::UNRESOLVABLE_TYPE,
            AnyError::TrailingInput { .. } => codes::TRAILING_INPUT,
            AnyError::MissingTypeUrl => codes::MISSING_TYPE_URL,
            AnyError::RegistrySealed { .. } => codes::REGISTRY_SEALED,
            AnyError::Config { .. } => codes::CONFIG_INVALID,
        }
    }

    /// 构造类型不匹配错误。
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        AnyError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 构造二进制解码错误，常用于消息实现的 `merge_bytes`。
    pub fn binary_decode(type_name: impl Into<String>, detail: impl Into<String>) -> Self {
        AnyError::BinaryDecode {
            type_name: type_name.into(),
            detail: detail.into(),
        }
    }

    /// 构造二进制编码错误。
    pub fn binary_encode(type_name: impl Into<String>, detail: impl Into<String>) -> Self {
        AnyError::BinaryEncode {
            type_name: type_name.into(),
            detail: detail.into(),
        }
    }

    /// 构造结构化文本解码错误。
    pub fn structured_decode(type_name: impl Into<String>, detail: impl Into<String>) -> Self {
        AnyError::StructuredDecode {
            type_name: type_name.into(),
            detail: detail.into(),
        }
    }

    /// 构造文本格式输出错误。
    pub fn text_encode(type_name: impl Into<String>, detail: impl Into<String>) -> Self {
        AnyError::TextEncode {
            type_name: type_name.into(),
            detail: detail.into(),
        }
    }

    /// 构造无法解析类型的错误。
    pub fn unresolvable(type_url: impl Into<String>) -> Self {
        AnyError::UnresolvableType {
            type_url: type_url.into(),
        }
    }
}

/// crate 内统一的结果别名。
pub type Result<T, E = AnyError> = core::result::Result<T, E>;
