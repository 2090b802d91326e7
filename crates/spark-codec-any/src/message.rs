//! 消息能力契约的双层抽象：泛型层 [`Message`] 与对象层 [`DynMessage`]。
//!
//! # 设计背景（Why）
//! - 信封在编译期不知道负载的具体类型，需要在运行时以 trait 对象完成编码、解码与复制；
//! - 具体逻辑写在泛型层，对象层通过 blanket 实现自动获得，
//!   两层在功能上等价，差异仅在于类型擦除与运行时下转型。
//!
//! # 契约说明（What）
//! - [`Message::TYPE_NAME`] 是注册中心的键，也是类型 URL 最后一段；
//! - 二进制、结构化文本、文本格式三种映射由具体类型提供，本 crate 不解释任何 schema；
//! - [`MessageFactory`] 只负责“构造空实例”，注册中心以它实现无反射的动态分发。

use core::any::Any as StdAny;
use core::fmt::Debug;
use core::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use serde_json::{Map, Value};

use crate::error::{AnyError, Result};
use crate::text::{TextScanner, TextWriter};

/// 结构化文本片段：一个去掉 `@type` 之后的 JSON 对象。
pub type JsonObject = Map<String, Value>;

/// `Message` 是具体消息类型需要实现的泛型能力集合。
///
/// # 契约说明（What）
/// - `Default` 产出的实例即“空消息”，解包总是从它开始合并；
/// - `merge_*` 系列方法具有合并语义：已存在的字段可能被覆盖或追加，与二进制解码一致；
/// - 结构化文本与文本格式映射提供缺省实现，全部返回错误；没有文本映射的类型不会被写成空字面量。
///
/// # 风险提示（Trade-offs）
/// - [`Message::merge_from`] 的缺省实现走一次编码再解码，结果与线上往返严格一致；
///   覆盖它以直接复制字段时，必须保证与往返结果逐字节相同。
pub trait Message: Clone + Default + Debug + Send + Sync + 'static {
    /// 完全限定的注册名，例如 `pkg.Widget`。
    const TYPE_NAME: &'static str;

    /// 将字段以二进制线格式追加到 `buf`。
    fn encode_raw(&self, buf: &mut BytesMut) -> Result<()>;

    /// 从二进制线格式合并字段。
    fn merge_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// 合并同类型实例。
    fn merge_from(&mut self, other: &Self) -> Result<()> {
        let encoded = other.encode_to_bytes()?;
        self.merge_bytes(&encoded)
    }

    /// 从结构化文本字段合并。
    fn merge_json(&mut self, fields: &JsonObject) -> Result<()> {
        let _ = fields;
        Err(AnyError::structured_decode(
            Self::TYPE_NAME,
            "type has no structured text mapping",
        ))
    }

    /// 输出结构化文本字段（不含 `@type`）。
    fn to_json(&self) -> Result<JsonObject> {
        Err(AnyError::StructuredEncode {
            type_name: Self::TYPE_NAME.to_owned(),
            detail: "type has no structured text mapping".to_owned(),
        })
    }

    /// 从文本格式读取字段，直到扫描器位于字段列表末尾。
    fn merge_text(&mut self, scanner: &mut TextScanner<'_>) -> Result<()> {
        Err(scanner.error(format!(
            "type `{}` has no text format mapping",
            Self::TYPE_NAME
        )))
    }

    /// 以文本格式写出字段。
    fn write_text(&self, writer: &mut TextWriter) -> Result<()> {
        let _ = writer;
        Err(AnyError::text_encode(
            Self::TYPE_NAME,
            "type has no text format mapping",
        ))
    }

    /// 编码为独立的字节块。
    fn encode_to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode_raw(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// `DynMessage` 为对象层提供消息能力的对象安全接口。
///
/// # 行为逻辑（How）
/// - 每个方法都直接委托给泛型层同名方法；
/// - [`DynMessage::merge_same_type_dyn`] 通过 `downcast_ref` 判断源与目标是否为同一具体类型，
///   命中时走 [`Message::merge_from`] 快速路径，否则返回 `None` 交给调用方回退到字节往返。
///
/// 调用方不应自行实现本 trait：任何 `Message` 都经由 blanket 实现自动获得。
pub trait DynMessage: Debug + Send + Sync + 'static {
    /// 注册名。
    fn type_name(&self) -> &'static str;

    /// 对象安全的二进制编码入口。
    fn encode_dyn(&self) -> Result<Bytes>;

    /// 对象安全的二进制合并入口。
    fn merge_bytes_dyn(&mut self, data: &[u8]) -> Result<()>;

    /// 对象安全的结构化文本合并入口。
    fn merge_json_dyn(&mut self, fields: &JsonObject) -> Result<()>;

    /// 对象安全的结构化文本输出入口。
    fn to_json_dyn(&self) -> Result<JsonObject>;

    /// 对象安全的文本格式合并入口。
    fn merge_text_dyn(&mut self, scanner: &mut TextScanner<'_>) -> Result<()>;

    /// 对象安全的文本格式输出入口。
    fn write_text_dyn(&self, writer: &mut TextWriter) -> Result<()>;

    /// 同类型快速合并；具体类型不同返回 `None`。
    fn merge_same_type_dyn(&mut self, source: &dyn DynMessage) -> Option<Result<()>>;

    /// 深拷贝为新的 trait 对象。
    fn clone_boxed(&self) -> Box<dyn DynMessage>;

    /// 用于下转型的只读视图。
    fn as_any(&self) -> &dyn StdAny;

    /// 用于下转型的可变视图。
    fn as_any_mut(&mut self) -> &mut dyn StdAny;

    /// 消费 Box 并转为 `Box<dyn Any>`，便于按值取回具体类型。
    fn into_any(self: Box<Self>) -> Box<dyn StdAny>;
}

impl<M: Message> DynMessage for M {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn encode_dyn(&self) -> Result<Bytes> {
        self.encode_to_bytes()
    }

    fn merge_bytes_dyn(&mut self, data: &[u8]) -> Result<()> {
        self.merge_bytes(data)
    }

    fn merge_json_dyn(&mut self, fields: &JsonObject) -> Result<()> {
        self.merge_json(fields)
    }

    fn to_json_dyn(&self) -> Result<JsonObject> {
        self.to_json()
    }

    fn merge_text_dyn(&mut self, scanner: &mut TextScanner<'_>) -> Result<()> {
        self.merge_text(scanner)
    }

    fn write_text_dyn(&self, writer: &mut TextWriter) -> Result<()> {
        self.write_text(writer)
    }

    fn merge_same_type_dyn(&mut self, source: &dyn DynMessage) -> Option<Result<()>> {
        source
            .as_any()
            .downcast_ref::<M>()
            .map(|typed| self.merge_from(typed))
    }

    fn clone_boxed(&self) -> Box<dyn DynMessage> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn StdAny {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn StdAny> {
        self
    }
}

impl Clone for Box<dyn DynMessage> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// `MessageFactory` 定义注册中心条目：按需构造某一类型的空实例。
pub trait MessageFactory: Send + Sync + 'static {
    /// 该工厂产出实例的注册名。
    fn type_name(&self) -> &'static str;

    /// 构造空实例。
    fn new_instance(&self) -> Box<dyn DynMessage>;
}

/// `TypedMessageFactory` 将泛型 [`Message`] 包装为 [`MessageFactory`]。
///
/// 零尺寸类型，可放入 `static` 后以 `Arc` 共享。
pub struct TypedMessageFactory<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M: Message> TypedMessageFactory<M> {
    /// 构造工厂。
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<M: Message> Default for TypedMessageFactory<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> MessageFactory for TypedMessageFactory<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn new_instance(&self) -> Box<dyn DynMessage> {
        Box::new(M::default())
    }
}

impl<M> Debug for TypedMessageFactory<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypedMessageFactory")
            .field("message", &core::any::type_name::<M>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_stubs::{Gadget, Widget};

    #[test]
    fn factory_builds_default_instance() {
        let factory = TypedMessageFactory::<Widget>::new();
        let instance = factory.new_instance();
        assert_eq!(factory.type_name(), "pkg.Widget");
        assert_eq!(instance.type_name(), "pkg.Widget");
        assert_eq!(
            instance.as_any().downcast_ref::<Widget>(),
            Some(&Widget::default())
        );
    }

    #[test]
    fn same_type_merge_only_applies_to_identical_concrete_types() {
        let mut target: Box<dyn DynMessage> = Box::new(Widget::default());
        let widget = Widget { field: 3, label: "x".into() };
        let gadget = Gadget::default();

        assert!(target.merge_same_type_dyn(&gadget).is_none());
        target
            .merge_same_type_dyn(&widget)
            .expect("same concrete type")
            .expect("merge succeeds");
        assert_eq!(target.as_any().downcast_ref::<Widget>(), Some(&widget));
    }

    #[test]
    fn default_merge_from_equals_byte_round_trip() {
        let source = Widget { field: 11, label: "abc".into() };
        let mut via_merge = Widget::default();
        via_merge.merge_from(&source).expect("merge");

        let mut via_bytes = Widget::default();
        via_bytes
            .merge_bytes(&source.encode_to_bytes().expect("encode"))
            .expect("decode");

        assert_eq!(via_merge, via_bytes);
    }

    #[test]
    fn boxed_clone_is_independent() {
        let original: Box<dyn DynMessage> = Box::new(Widget { field: 1, label: String::new() });
        let mut copy = original.clone();
        copy.merge_bytes_dyn(&Widget { field: 9, label: String::new() }.encode_to_bytes().expect("encode"))
            .expect("merge");
        assert_eq!(
            original.as_any().downcast_ref::<Widget>().map(|w| w.field),
            Some(1)
        );
    }
}
