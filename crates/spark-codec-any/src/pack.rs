//! 打包与解包协议。
//!
//! # 契约说明（What）
//! - 打包是 O(1) 的所有权转移：只计算类型 URL，从不调用任何编解码器；
//! - 解包先以类型名校验目标，再按当前负载选择合并路径，对信封本身没有副作用；
//! - 空信封解包成功且不修改目标，与“解码空字节得到默认实例”的线上语义一致。

use crate::envelope::{Any, Payload};
use crate::error::{AnyError, Result};
use crate::message::{DynMessage, Message};
use crate::type_url::DEFAULT_PREFIX;

impl Any {
    /// 以默认前缀打包。
    pub fn pack<M: Message>(message: M) -> Any {
        Self::pack_boxed(Box::new(message), DEFAULT_PREFIX)
    }

    /// 以指定前缀打包。
    pub fn pack_with_prefix<M: Message>(message: M, prefix: &str) -> Any {
        Self::pack_boxed(Box::new(message), prefix)
    }

    /// 打包对象层消息。
    pub fn pack_boxed(message: Box<dyn DynMessage>, prefix: &str) -> Any {
        let mut any = Any::new();
        any.set_typed_boxed(message, prefix);
        any
    }

    /// 类型 URL 是否指向 `M`。
    pub fn is<M: Message>(&self) -> bool {
        self.type_name() == M::TYPE_NAME
    }

    /// 将负载合并进 `target`。
    ///
    /// # 行为逻辑（How）
    /// 1. 类型名不一致时返回 [`AnyError::TypeMismatch`]，任何表示都先经过这一步；
    /// 2. `Typed`：同一具体类型走 [`DynMessage::merge_same_type_dyn`]，否则编码源对象再合并字节；
    /// 3. `Raw`：直接合并字节，解码失败原样返回；
    /// 4. `Structured`：合并结构化字段，失败原样返回；
    /// 5. `Empty`：目标保持不变。
    pub fn unpack_to(&self, target: &mut dyn DynMessage) -> Result<()> {
        let actual = self.type_name();
        if actual != target.type_name() {
            return Err(AnyError::type_mismatch(target.type_name(), actual));
        }

        match self.payload() {
            Payload::Empty => Ok(()),
            Payload::Raw(bytes) => target.merge_bytes_dyn(bytes),
            Payload::Typed(source) => match target.merge_same_type_dyn(source.as_ref()) {
                Some(merged) => merged,
                None => {
                    tracing::trace!(
                        type_name = actual,
                        "distinct concrete types share a name, merging through bytes"
                    );
                    let encoded = source.encode_dyn()?;
                    target.merge_bytes_dyn(&encoded)
                }
            },
            Payload::Structured(fields) => target.merge_json_dyn(fields),
        }
    }

    /// 解包为新的 `M` 实例。
    pub fn unpack<M: Message>(&self) -> Result<M> {
        let mut message = M::default();
        self.unpack_to(&mut message)?;
        Ok(message)
    }

    /// 消费信封取回 `M`。
    ///
    /// 负载恰为 `M` 的活对象时直接移出，不经过任何复制；其余情况等价于 [`Any::unpack`]。
    pub fn into_typed<M: Message>(mut self) -> Result<M> {
        let owns_concrete = self
            .typed_ref()
            .is_some_and(|message| message.as_any().is::<M>());
        if owns_concrete && self.is::<M>() {
            if let Payload::Typed(message) = self.take_payload() {
                if let Ok(typed) = message.into_any().downcast::<M>() {
                    return Ok(*typed);
                }
            }
        }
        self.unpack()
    }
}
