//! # transcode 模块：按需投影与物化
//!
//! ## 角色定位（Why）
//! - 信封的三种表示之间没有同步关系，任何“规范字节”或“活对象”都必须在被观察时重新计算；
//! - 转码引擎把注册中心查询、实例构造与编解码串成一条路径，并以注入的 [`TypeRegistry`]
//!   隔离进程级全局状态。
//!
//! ## 行为契约（What）
//! - [`Transcoder::project`] 返回 `Option`：`None` 代表“没有规范字节”，不是错误；
//! - [`Transcoder::materialize`] 需要真正的实例，因此对未注册类型返回 [`AnyError::UnresolvableType`]；
//! - 结果从不缓存，同一信封重复投影会重复编码。

use bytes::Bytes;

use crate::config::AnyConfig;
use crate::envelope::{Any, Payload};
use crate::error::{AnyError, Result};
use crate::message::{DynMessage, JsonObject, Message};
use crate::registry::{self, TypeRegistry};
use crate::type_url;

/// `Transcoder` 以注入的注册中心完成表示之间的转换。
///
/// # 教案式说明
/// - **意图 (Why)**：调用方可在测试中传入局部注册中心，而生产路径使用 [`Transcoder::global`]；
/// - **契约 (What)**：只持有注册中心的共享引用与一份配置，构造成本可忽略，按需创建即可；
/// - **风险 (Trade-offs)**：结构化片段每次投影都要经历“查找 → 构造 → 合并 → 编码”，
///   频繁观察同一片段时应先调用 [`Transcoder::normalize_to_raw`]。
#[derive(Clone)]
pub struct Transcoder<'r> {
    registry: &'r dyn TypeRegistry,
    config: AnyConfig,
}

impl<'r> Transcoder<'r> {
    /// 以缺省配置构造。
    pub fn new(registry: &'r dyn TypeRegistry) -> Self {
        Self::with_config(registry, AnyConfig::default())
    }

    /// 以指定配置构造。
    pub fn with_config(registry: &'r dyn TypeRegistry, config: AnyConfig) -> Self {
        Self { registry, config }
    }

    /// 注册中心。
    pub fn registry(&self) -> &'r dyn TypeRegistry {
        self.registry
    }

    /// 当前配置。
    pub fn config(&self) -> &AnyConfig {
        &self.config
    }

    /// 以配置中的前缀打包。
    pub fn pack<M: Message>(&self, message: M) -> Any {
        Any::pack_with_prefix(message, &self.config.default_prefix)
    }

    /// 计算信封的规范字节投影。
    ///
    /// # 行为逻辑（How）
    /// - `Raw`：原样返回（`Bytes` 克隆只增加引用计数）；
    /// - `Typed`：编码活对象，失败记 `debug` 日志后返回 `None`；
    /// - `Structured`：查找类型、构造空实例、合并片段并编码，任一步失败返回 `None`；
    /// - `Empty`：返回 `None`。
    pub fn project(&self, any: &Any) -> Option<Bytes> {
        match any.payload() {
            Payload::Empty => None,
            Payload::Raw(bytes) => Some(bytes.clone()),
            Payload::Typed(message) => match message.encode_dyn() {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    tracing::debug!(
                        type_url = any.type_url(),
                        error.code = err.code(),
                        error = %err,
                        "typed payload failed to encode, projection unavailable"
                    );
                    None
                }
            },
            Payload::Structured(fields) => {
                if any.type_url().is_empty() {
                    return None;
                }
                let projected = self
                    .decode_fragment(any.type_url(), fields)
                    .and_then(|message| message.encode_dyn());
                match projected {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        tracing::debug!(
                            type_url = any.type_url(),
                            error.code = err.code(),
                            error = %err,
                            "structured fragment cannot be transcoded, projection unavailable"
                        );
                        None
                    }
                }
            }
        }
    }

    /// 从任意表示构造独立的活对象。
    ///
    /// `Typed` 负载直接深拷贝；其余表示必须能在注册中心解析类型，`Empty` 得到空实例。
    pub fn materialize(&self, any: &Any) -> Result<Box<dyn DynMessage>> {
        match any.payload() {
            Payload::Typed(message) => Ok(message.clone_boxed()),
            Payload::Empty => self.instantiate(any.type_url()),
            Payload::Raw(bytes) => {
                let mut message = self.instantiate(any.type_url())?;
                tracing::trace!(type_url = any.type_url(), "materializing from raw bytes");
                message.merge_bytes_dyn(bytes)?;
                Ok(message)
            }
            Payload::Structured(fields) => self.decode_fragment(any.type_url(), fields),
        }
    }

    /// 就地把负载替换为活对象；类型 URL 保持不变，`Empty` 不做处理。
    pub fn normalize_to_typed(&self, any: &mut Any) -> Result<()> {
        if matches!(any.payload(), Payload::Empty | Payload::Typed(_)) {
            return Ok(());
        }
        let message = self.materialize(any)?;
        any.replace_payload(Payload::Typed(message));
        Ok(())
    }

    /// 就地把负载替换为规范字节；类型 URL 保持不变，`Empty` 不做处理。
    ///
    /// 与 [`Transcoder::project`] 不同，失败原因会以错误返回。
    pub fn normalize_to_raw(&self, any: &mut Any) -> Result<()> {
        let bytes = match any.payload() {
            Payload::Empty | Payload::Raw(_) => return Ok(()),
            Payload::Typed(message) => message.encode_dyn()?,
            Payload::Structured(fields) => {
                self.decode_fragment(any.type_url(), fields)?.encode_dyn()?
            }
        };
        any.replace_payload(Payload::Raw(bytes));
        Ok(())
    }

    /// 按类型 URL 构造空实例。
    pub(crate) fn instantiate(&self, type_url: &str) -> Result<Box<dyn DynMessage>> {
        let type_name = type_url::extract_type_name(type_url);
        if type_name.is_empty() {
            return Err(AnyError::unresolvable(type_url));
        }
        match self.registry.lookup(type_name) {
            Some(factory) => Ok(factory.new_instance()),
            None => {
                tracing::debug!(type_url, type_name, "registry lookup missed");
                Err(AnyError::unresolvable(type_url))
            }
        }
    }

    fn decode_fragment(&self, type_url: &str, fields: &JsonObject) -> Result<Box<dyn DynMessage>> {
        let mut message = self.instantiate(type_url)?;
        tracing::trace!(type_url, "transcoding structured fragment");
        message.merge_json_dyn(fields)?;
        Ok(message)
    }
}

impl Transcoder<'static> {
    /// 基于进程级注册中心的转码器。
    pub fn global() -> Self {
        Transcoder::new(registry::global())
    }
}

impl core::fmt::Debug for Transcoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transcoder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
