//! 结构化文本（JSON）映射。
//!
//! 信封的结构化形式是在负载字段旁边加入 `"@type"` 键的单个对象：
//!
//! ```json
//! { "@type": "type.googleapis.com/pkg.Widget", "field": 1 }
//! ```
//!
//! 解码时只剥离 `@type`，其余字段原样保存为 `Structured` 表示，直到被观察时才按类型解释；
//! 编码时 `Structured` 片段原样写回，`Raw` 负载必须能物化为活对象，因此只有它依赖注册中心。

use serde_json::Value;

use crate::envelope::{ANY_TYPE_NAME, Any, Payload};
use crate::error::{AnyError, Result};
use crate::message::JsonObject;
use crate::transcode::Transcoder;

/// 结构化形式中承载类型 URL 的键。
pub const TYPE_KEY: &str = "@type";

impl Any {
    /// 以进程级注册中心输出结构化形式。
    pub fn to_json_value(&self) -> Result<Value> {
        Transcoder::global().to_json_value(self)
    }

    /// 解析结构化形式，字段保存为 `Structured` 表示。
    ///
    /// 输入不是对象，或 `@type` 缺失、非字符串、为空时返回 [`AnyError::StructuredDecode`]。
    pub fn from_json_value(value: &Value) -> Result<Any> {
        let Value::Object(object) = value else {
            return Err(AnyError::structured_decode(
                ANY_TYPE_NAME,
                "expected a JSON object",
            ));
        };
        let type_url = match object.get(TYPE_KEY) {
            Some(Value::String(url)) if !url.is_empty() => url.clone(),
            Some(_) => {
                return Err(AnyError::structured_decode(
                    ANY_TYPE_NAME,
                    "`@type` must be a non-empty string",
                ));
            }
            None => {
                return Err(AnyError::structured_decode(ANY_TYPE_NAME, "missing `@type`"));
            }
        };

        let fields: JsonObject = object
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut any = Any::new();
        any.set_type_url(type_url);
        any.set_structured_fragment(fields)?;
        Ok(any)
    }
}

impl Transcoder<'_> {
    /// 输出结构化形式。
    ///
    /// - 类型 URL 与负载都为空时输出 `{}`；
    /// - `Structured` 片段原样输出，不查询注册中心；
    /// - `Typed` 直接调用其映射，`Raw` 先经 [`Transcoder::materialize`] 物化，
    ///   未注册类型返回 [`AnyError::UnresolvableType`]。
    pub fn to_json_value(&self, any: &Any) -> Result<Value> {
        if any.type_url().is_empty() && any.is_empty() {
            return Ok(Value::Object(JsonObject::new()));
        }
        let fields = match any.payload() {
            Payload::Structured(fields) => fields.clone(),
            Payload::Typed(message) => message.to_json_dyn()?,
            _ => self.materialize(any)?.to_json_dyn()?,
        };

        let mut object = JsonObject::new();
        object.insert(TYPE_KEY.to_owned(), Value::String(any.type_url().to_owned()));
        object.extend(fields.into_iter().filter(|(key, _)| key != TYPE_KEY));
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::envelope::RepresentationKind;
    use crate::message::Message;
    use crate::registry::{EmptyRegistry, InMemoryTypeRegistry};
    use crate::test_stubs::{Gadget, Widget};

    #[test]
    fn decoding_keeps_fields_deferred() {
        let value = json!({"@type": "type.googleapis.com/pkg.Widget", "field": 3});
        let any = Any::from_json_value(&value).expect("well-formed");

        assert_eq!(any.type_url(), "type.googleapis.com/pkg.Widget");
        assert_eq!(any.representation(), RepresentationKind::Structured);
        assert_eq!(
            any.structured_fragment().and_then(|fields| fields.get("field")),
            Some(&json!(3))
        );
        assert!(any.structured_fragment().is_some_and(|f| !f.contains_key(TYPE_KEY)));
    }

    #[test]
    fn malformed_type_key_is_rejected() {
        for value in [json!({"field": 1}), json!({"@type": 7}), json!({"@type": ""}), json!([1])] {
            let err = Any::from_json_value(&value).expect_err("invalid envelope");
            assert!(matches!(err, AnyError::StructuredDecode { .. }), "{value}");
        }
    }

    #[test]
    fn structured_round_trip_through_registry() {
        let registry = InMemoryTypeRegistry::new();
        registry.register::<Widget>().expect("fresh");
        let transcoder = Transcoder::new(&registry);

        let any = Any::pack(Widget { field: 12, label: "s".into() });
        let value = transcoder.to_json_value(&any).expect("typed payload");
        assert_eq!(
            value,
            json!({"@type": "type.googleapis.com/pkg.Widget", "field": 12, "label": "s"})
        );

        let decoded = Any::from_json_value(&value).expect("well-formed");
        assert_eq!(transcoder.project(&decoded), transcoder.project(&any));
        assert_eq!(decoded.unpack::<Widget>().expect("same type"), Widget { field: 12, label: "s".into() });
    }

    #[test]
    fn raw_payload_needs_registered_type() {
        let mut any = Any::new();
        any.set_type_url("type.googleapis.com/pkg.Gadget");
        any.set_raw_bytes(Gadget::default().encode_to_bytes().expect("encode"));

        let err = Transcoder::new(&EmptyRegistry)
            .to_json_value(&any)
            .expect_err("unregistered");
        assert!(matches!(err, AnyError::UnresolvableType { .. }));
    }

    #[test]
    fn unregistered_fragment_is_written_back_verbatim() {
        let value = json!({"@type": "type.googleapis.com/pkg.Unknown", "x": 1});
        let any = Any::from_json_value(&value).expect("well-formed");

        let encoded = Transcoder::new(&EmptyRegistry)
            .to_json_value(&any)
            .expect("fragment needs no registry");
        assert_eq!(encoded, value);
    }

    #[test]
    fn default_envelope_is_empty_object() {
        let value = Transcoder::new(&EmptyRegistry)
            .to_json_value(&Any::new())
            .expect("empty");
        assert_eq!(value, json!({}));
    }
}
