//! # envelope 模块：三态延迟信封
//!
//! ## 角色定位（Why）
//! - `Any` 同时面对三种互不兼容的内部表示：已编码字节、活的类型化对象、未解析的结构化文本片段；
//! - 以枚举 [`Payload`] 承载三者，结构上保证任一时刻至多一种表示处于激活状态。
//!
//! ## 行为契约（What）
//! - 任何 `set_*` 都整体替换负载（后写者胜），不同表示之间从不同步；
//! - `type_url` 只在 `set_typed*` 时重算，`set_raw_bytes` 保留解码阶段单独得到的 URL；
//! - 投影（[`Any::current_bytes`]）每次都从唯一的事实来源重新计算，不缓存。
//!
//! ## 相等与哈希
//! - 比较 `(type_url, 规范形式)`：可投影时规范形式为投影字节；
//!   空信封视为空字节；无法投影的结构化片段以其 JSON 文本参与比较；其余无法投影的负载统一视为“不可用”。
//! - 哈希与相等使用同一规范形式，满足 `a == b ⇒ hash(a) == hash(b)`；哈希不会 panic。

use core::fmt;
use core::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::error::{AnyError, Result};
use crate::message::{DynMessage, JsonObject, Message};
use crate::registry::TypeRegistry;
use crate::transcode::Transcoder;
use crate::type_url::{self, DEFAULT_PREFIX};

/// 信封自身的注册名，用于错误上下文。
pub const ANY_TYPE_NAME: &str = "google.protobuf.Any";

/// 信封负载：至多一种表示处于激活状态。
#[derive(Clone, Debug, Default)]
pub enum Payload {
    /// 刚构造、尚未写入任何表示。
    #[default]
    Empty,
    /// 已编码的二进制负载，内容对信封不透明。
    Raw(Bytes),
    /// 由信封独占的活对象。
    Typed(Box<dyn DynMessage>),
    /// 未解析的结构化文本片段（不含 `@type`）。
    Structured(JsonObject),
}

/// 当前激活的表示种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    /// 无负载。
    Empty,
    /// 已编码字节。
    Raw,
    /// 类型化对象。
    Typed,
    /// 结构化片段。
    Structured,
}

/// `Any` 信封。
///
/// # 教案式说明
/// - **意图 (Why)**：持有任意可序列化消息而无需在编译期知道其类型，并把真正的编码工作推迟到被观察时；
/// - **契约 (What)**：
///   - `Clone` 深拷贝负载，副本与原件互不影响；
///   - 信封为独占所有权，不为多线程并发修改设计；
/// - **风险 (Trade-offs)**：`PartialEq`/`Hash` 会触发投影（可能编码整条消息），热路径上应避免把信封作为哈希键。
#[derive(Clone, Default)]
pub struct Any {
    type_url: String,
    payload: Payload,
}

impl Any {
    /// 构造空信封。
    pub fn new() -> Self {
        Self::default()
    }

    /// 以默认前缀存入类型化对象。
    pub fn set_typed<M: Message>(&mut self, message: M) {
        self.set_typed_boxed(Box::new(message), DEFAULT_PREFIX);
    }

    /// 以指定前缀存入类型化对象。
    pub fn set_typed_with_prefix<M: Message>(&mut self, message: M, prefix: &str) {
        self.set_typed_boxed(Box::new(message), prefix);
    }

    /// 存入对象层消息，并根据其注册名与 `prefix` 重算类型 URL。
    pub fn set_typed_boxed(&mut self, message: Box<dyn DynMessage>, prefix: &str) {
        self.type_url = type_url::build(message.type_name(), prefix).into();
        self.payload = Payload::Typed(message);
    }

    /// 存入已编码字节；类型 URL 保持不变。
    pub fn set_raw_bytes(&mut self, data: impl Into<Bytes>) {
        self.payload = Payload::Raw(data.into());
    }

    /// 存入结构化文本片段。
    ///
    /// 片段离开类型无法解释，因此要求类型 URL 已设置，否则返回 [`AnyError::MissingTypeUrl`] 且负载不变。
    pub fn set_structured_fragment(&mut self, fragment: JsonObject) -> Result<()> {
        if self.type_url.is_empty() {
            return Err(AnyError::MissingTypeUrl);
        }
        self.payload = Payload::Structured(fragment);
        Ok(())
    }

    /// 设置类型 URL，供解码器在写入负载前使用。
    pub fn set_type_url(&mut self, type_url: impl Into<String>) {
        self.type_url = type_url.into();
    }

    /// 丢弃负载，回到空表示；类型 URL 保留。
    pub fn clear(&mut self) {
        self.payload = Payload::Empty;
    }

    /// 替换负载而不改动类型 URL，供转码引擎就地归一化使用。
    pub(crate) fn replace_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    /// 取走负载，信封回到空表示。
    pub fn take_payload(&mut self) -> Payload {
        core::mem::take(&mut self.payload)
    }

    /// 类型 URL。
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    /// 类型 URL 中的类型名。
    pub fn type_name(&self) -> &str {
        type_url::extract_type_name(&self.type_url)
    }

    /// 当前负载。
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// 当前激活的表示种类。
    pub fn representation(&self) -> RepresentationKind {
        match self.payload {
            Payload::Empty => RepresentationKind::Empty,
            Payload::Raw(_) => RepresentationKind::Raw,
            Payload::Typed(_) => RepresentationKind::Typed,
            Payload::Structured(_) => RepresentationKind::Structured,
        }
    }

    /// 是否没有任何表示。
    pub fn is_empty(&self) -> bool {
        matches!(self.payload, Payload::Empty)
    }

    /// 激活的类型化对象。
    pub fn typed_ref(&self) -> Option<&dyn DynMessage> {
        match &self.payload {
            Payload::Typed(message) => Some(message.as_ref()),
            _ => None,
        }
    }

    /// 激活的已编码字节。
    pub fn raw_bytes(&self) -> Option<&Bytes> {
        match &self.payload {
            Payload::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// 激活的结构化片段。
    pub fn structured_fragment(&self) -> Option<&JsonObject> {
        match &self.payload {
            Payload::Structured(fragment) => Some(fragment),
            _ => None,
        }
    }

    /// 以进程级注册中心计算规范字节投影。
    pub fn current_bytes(&self) -> Option<Bytes> {
        Transcoder::global().project(self)
    }

    /// 以指定注册中心计算规范字节投影。
    pub fn current_bytes_with(&self, registry: &dyn TypeRegistry) -> Option<Bytes> {
        Transcoder::new(registry).project(self)
    }

    fn canonical_form(&self) -> CanonicalForm {
        if let Payload::Empty = self.payload {
            return CanonicalForm::Bytes(Bytes::new());
        }
        if let Some(bytes) = self.current_bytes() {
            return CanonicalForm::Bytes(bytes);
        }
        match &self.payload {
            Payload::Structured(fragment) => {
                CanonicalForm::Fragment(serde_json::Value::Object(fragment.clone()).to_string())
            }
            _ => CanonicalForm::Unavailable,
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
enum CanonicalForm {
    Bytes(Bytes),
    Fragment(String),
    Unavailable,
}

impl PartialEq for Any {
    fn eq(&self, other: &Self) -> bool {
        self.type_url == other.type_url && self.canonical_form() == other.canonical_form()
    }
}

impl Eq for Any {}

impl Hash for Any {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_url.hash(state);
        self.canonical_form().hash(state);
    }
}

impl fmt::Debug for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Any")
            .field("type_url", &self.type_url)
            .field("payload", &self.payload)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use serde_json::json;

    use super::*;
    use crate::test_stubs::Widget;

    fn hash_of(any: &Any) -> u64 {
        let mut hasher = DefaultHasher::new();
        any.hash(&mut hasher);
        hasher.finish()
    }

    fn fragment(value: serde_json::Value) -> JsonObject {
        match value {
            serde_json::Value::Object(map) => map,
            _ => JsonObject::new(),
        }
    }

    #[test]
    fn setters_keep_exactly_one_representation() {
        let mut any = Any::new();
        assert_eq!(any.representation(), RepresentationKind::Empty);

        any.set_typed(Widget { field: 1, label: String::new() });
        assert_eq!(any.representation(), RepresentationKind::Typed);
        assert!(any.raw_bytes().is_none() && any.structured_fragment().is_none());

        any.set_raw_bytes(Bytes::from_static(b"\x08\x01"));
        assert_eq!(any.representation(), RepresentationKind::Raw);
        assert!(any.typed_ref().is_none());

        any.set_structured_fragment(fragment(json!({"field": 1})))
            .expect("url already set");
        assert_eq!(any.representation(), RepresentationKind::Structured);
        assert!(any.raw_bytes().is_none() && any.typed_ref().is_none());
    }

    #[test]
    fn raw_bytes_leave_type_url_untouched() {
        let mut any = Any::new();
        any.set_type_url("example.com/pkg.Widget");
        any.set_raw_bytes(vec![1, 2, 3]);
        assert_eq!(any.type_url(), "example.com/pkg.Widget");
        assert_eq!(any.type_name(), "pkg.Widget");
    }

    #[test]
    fn typed_setter_recomputes_type_url() {
        let mut any = Any::new();
        any.set_type_url("stale/pkg.Gadget");
        any.set_typed_with_prefix(Widget::default(), "example.com/");
        assert_eq!(any.type_url(), "example.com/pkg.Widget");
    }

    #[test]
    fn fragment_requires_type_url() {
        let mut any = Any::new();
        assert_eq!(
            any.set_structured_fragment(JsonObject::new()),
            Err(AnyError::MissingTypeUrl)
        );
        assert!(any.is_empty());
    }

    #[test]
    fn clone_is_independent() {
        let original = Any::pack(Widget { field: 5, label: "a".into() });
        let mut copy = original.clone();
        copy.set_raw_bytes(Bytes::new());

        assert_eq!(original.representation(), RepresentationKind::Typed);
        assert_eq!(
            original.typed_ref().and_then(|m| m.as_any().downcast_ref::<Widget>()),
            Some(&Widget { field: 5, label: "a".into() })
        );
    }

    #[test]
    fn equality_compares_projections_across_representations() {
        let widget = Widget { field: 9, label: "eq".into() };
        let typed = Any::pack(widget.clone());

        let mut raw = Any::new();
        raw.set_type_url(typed.type_url());
        raw.set_raw_bytes(widget.encode_to_bytes().expect("encode"));

        assert_eq!(typed, raw);
        assert_eq!(hash_of(&typed), hash_of(&raw));
    }

    #[test]
    fn unresolvable_fragments_compare_by_content() {
        let mut a = Any::new();
        a.set_type_url("t/pkg.NeverRegistered");
        a.set_structured_fragment(fragment(json!({"x": 1}))).expect("url");
        let b = a.clone();
        let mut c = a.clone();
        c.set_structured_fragment(fragment(json!({"x": 2}))).expect("url");

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
    }

    #[test]
    fn empty_envelopes_are_equal() {
        assert_eq!(Any::new(), Any::default());
        assert_eq!(hash_of(&Any::new()), hash_of(&Any::default()));
    }
}
