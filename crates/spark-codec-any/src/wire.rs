//! # wire 模块：信封自身的二进制线格式
//!
//! ## 角色定位（Why）
//! - 具体消息类型的二进制映射由各自的 [`Message`](crate::Message) 实现提供，底层原语统一取自
//!   `prost::encoding`，本 crate 不再重复实现 varint 与字段键；
//! - 信封自身在线上表现为两个字段：`1: type_url`（字符串）与 `2: value`（字节），由
//!   [`Any::encode_wire`] / [`Any::decode_wire`] 负责。
//!
//! ## 契约说明（What）
//! - 编码时跳过空字段；解码时字段顺序任意，未知字段（含分组）被跳过，重复字段以最后一次为准；
//! - 字段键超出 32 位或字段编号为 0 时按畸形输入拒绝；
//! - 解码结果始终落在 `Raw` 表示上，不触发任何注册中心查询。

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::DecodeError;
use prost::encoding::{
    self, DecodeContext, WireType, decode_key, encode_key, encode_varint, encoded_len_varint,
    key_len, skip_field,
};

use crate::envelope::{ANY_TYPE_NAME, Any};
use crate::error::{AnyError, Result};
use crate::transcode::Transcoder;

/// `type_url` 字段编号。
pub const TYPE_URL_FIELD: u32 = 1;
/// `value` 字段编号。
pub const VALUE_FIELD: u32 = 2;

/// 将 `prost` 的解码失败包装为指定类型的 [`AnyError::BinaryDecode`]。
pub fn decode_failure(type_name: &str, err: DecodeError) -> AnyError {
    AnyError::binary_decode(type_name, err.to_string())
}

fn length_delimited_len(field: u32, len: usize) -> usize {
    key_len(field) + encoded_len_varint(len as u64) + len
}

fn put_length_delimited(buf: &mut BytesMut, field: u32, data: &[u8]) {
    encode_key(field, WireType::LengthDelimited, buf);
    encode_varint(data.len() as u64, buf);
    buf.put_slice(data);
}

impl Any {
    /// 以全局注册中心编码信封的线格式。
    pub fn encode_wire(&self) -> Result<Bytes> {
        self.encode_wire_with(&Transcoder::global())
    }

    /// 以指定转码器编码信封的线格式。
    ///
    /// # 契约说明（What）
    /// - `value` 字段取自 [`Transcoder::project`]；空信封只输出 `type_url`（若非空）；
    /// - 非空负载却无法投影时返回 [`AnyError::UnresolvableType`]，不会静默丢弃内容。
    pub fn encode_wire_with(&self, transcoder: &Transcoder<'_>) -> Result<Bytes> {
        let value = if self.is_empty() {
            Bytes::new()
        } else {
            transcoder
                .project(self)
                .ok_or_else(|| AnyError::unresolvable(self.type_url()))?
        };

        let mut buf = BytesMut::with_capacity(
            length_delimited_len(TYPE_URL_FIELD, self.type_url().len())
                + length_delimited_len(VALUE_FIELD, value.len()),
        );
        if !self.type_url().is_empty() {
            put_length_delimited(&mut buf, TYPE_URL_FIELD, self.type_url().as_bytes());
        }
        if !value.is_empty() {
            put_length_delimited(&mut buf, VALUE_FIELD, &value);
        }
        Ok(buf.freeze())
    }

    /// 从线格式解码信封，结果以 `Raw` 表示保存。
    pub fn decode_wire(data: &[u8]) -> Result<Any> {
        let decode_err = |err| decode_failure(ANY_TYPE_NAME, err);
        let mut buf = data;
        let mut type_url = String::new();
        let mut value: Option<Bytes> = None;

        while buf.has_remaining() {
            let (field, wire_type) = decode_key(&mut buf).map_err(decode_err)?;
            let merged = match field {
                TYPE_URL_FIELD => encoding::string::merge(
                    wire_type,
                    &mut type_url,
                    &mut buf,
                    DecodeContext::default(),
                ),
                VALUE_FIELD => encoding::bytes::merge(
                    wire_type,
                    value.get_or_insert_with(Bytes::new),
                    &mut buf,
                    DecodeContext::default(),
                ),
                _ => skip_field(wire_type, field, &mut buf, DecodeContext::default()),
            };
            merged.map_err(decode_err)?;
        }

        let mut any = Any::new();
        any.set_type_url(type_url);
        if let Some(value) = value {
            any.set_raw_bytes(value);
        }
        Ok(any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryTypeRegistry;
    use crate::test_stubs::Widget;

    #[test]
    fn envelope_matches_reference_encoding() {
        let mut any = Any::new();
        any.set_type_url("t/a.B");
        any.set_raw_bytes(Bytes::from_static(&[0x08, 0x96, 0x02]));

        let encoded = any
            .encode_wire_with(&Transcoder::new(&InMemoryTypeRegistry::new()))
            .expect("raw payload encodes");
        assert_eq!(
            &encoded[..],
            &[0x0a, 0x05, b't', b'/', b'a', b'.', b'B', 0x12, 0x03, 0x08, 0x96, 0x02]
        );
    }

    #[test]
    fn envelope_wire_round_trip_keeps_url_and_projection() {
        let registry = InMemoryTypeRegistry::new();
        let transcoder = Transcoder::new(&registry);
        let any = Any::pack(Widget { field: 7, label: "w".into() });

        let encoded = any.encode_wire_with(&transcoder).expect("typed payload encodes");
        let decoded = Any::decode_wire(&encoded).expect("well-formed input");

        assert_eq!(decoded.type_url(), "type.googleapis.com/pkg.Widget");
        assert_eq!(decoded.raw_bytes(), transcoder.project(&any).as_ref());
    }

    #[test]
    fn decode_skips_unknown_fields_and_keeps_last_value() {
        let mut buf = BytesMut::new();
        encoding::uint64::encode(9, &42, &mut buf);
        put_length_delimited(&mut buf, VALUE_FIELD, b"first");
        encoding::string::encode(15, &"ignored".to_owned(), &mut buf);
        put_length_delimited(&mut buf, TYPE_URL_FIELD, b"t/pkg.Widget");
        put_length_delimited(&mut buf, VALUE_FIELD, b"second");

        let any = Any::decode_wire(&buf).expect("unknown fields are skipped");
        assert_eq!(any.type_url(), "t/pkg.Widget");
        assert_eq!(any.raw_bytes().map(|b| &b[..]), Some(&b"second"[..]));
    }

    #[test]
    fn decode_of_empty_input_is_empty_envelope() {
        let any = Any::decode_wire(&[]).expect("empty input is a default envelope");
        assert!(any.is_empty());
        assert_eq!(any.type_url(), "");
    }

    #[test]
    fn field_number_beyond_32_bits_is_rejected() {
        let mut buf = BytesMut::new();
        encode_varint((((1u64 << 32) + 1) << 3) | 2, &mut buf);
        encode_varint(5, &mut buf);
        buf.put_slice(b"a/b.C");

        let err = Any::decode_wire(&buf).expect_err("key does not fit a field number");
        assert!(matches!(err, AnyError::BinaryDecode { .. }), "{err:?}");
    }

    #[test]
    fn reserved_field_zero_is_rejected() {
        let err = Any::decode_wire(&[0x02, 0x00]).expect_err("field 0 is reserved");
        assert!(matches!(err, AnyError::BinaryDecode { .. }), "{err:?}");
    }

    #[test]
    fn known_field_with_wrong_wire_type_is_rejected() {
        let err = Any::decode_wire(&[0x08, 0x01]).expect_err("type_url must be length-delimited");
        assert!(matches!(err, AnyError::BinaryDecode { .. }), "{err:?}");
    }

    #[test]
    fn non_utf8_type_url_is_rejected() {
        let err = Any::decode_wire(&[0x0a, 0x02, 0xff, 0xfe]).expect_err("invalid UTF-8");
        assert!(matches!(err, AnyError::BinaryDecode { .. }), "{err:?}");
    }

    #[test]
    fn encode_fails_when_fragment_type_is_unknown() {
        let registry = InMemoryTypeRegistry::new();
        let transcoder = Transcoder::new(&registry);
        let mut any = Any::new();
        any.set_type_url("type.googleapis.com/pkg.Unknown");
        any.set_structured_fragment(serde_json::Map::new())
            .expect("url is set");

        let err = any.encode_wire_with(&transcoder).expect_err("no canonical bytes");
        assert!(matches!(err, AnyError::UnresolvableType { .. }));
    }
}
