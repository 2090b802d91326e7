//! 信封契约测试使用的消息桩集合。
//!
//! # 设计定位（Why）
//! - 信封本身不解释任何 schema，验证打包、解包与转码时需要几个带真实线格式的具体类型；
//! - 单元测试、集成测试与基准共用同一组桩，接口调整时只需改动这里。
//!
//! # 使用方式（How）
//! - [`Widget`]（`pkg.Widget`）与 [`Gadget`]（`pkg.Gadget`）实现完整的二进制、结构化文本与文本格式映射；
//! - [`CountingMessage`] 通过共享的 [`CallCounter`] 记录编解码调用次数，用于断言“打包不触发编码”；
//! - [`Broken`] 的编码总是失败，用于覆盖投影降级路径。
//!
//! # 风险与权衡（Trade-offs）
//! - 桩类型随 crate 公开，仅面向测试与示例；生产代码不应依赖它们的线格式。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::{Buf, BytesMut};
use prost::encoding::{self, DecodeContext, decode_key, skip_field, string, uint64};
use serde_json::Value;

use crate::error::{AnyError, Result};
use crate::message::{JsonObject, Message};
use crate::text::{TextScanner, TextWriter};
use crate::wire::decode_failure;

/// 两字段消息：`field`（#1，varint）与 `label`（#2，字符串）。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Widget {
    /// 字段 1。
    pub field: u64,
    /// 字段 2。
    pub label: String,
}

impl Message for Widget {
    const TYPE_NAME: &'static str = "pkg.Widget";

    fn encode_raw(&self, buf: &mut BytesMut) -> Result<()> {
        if self.field != 0 {
            uint64::encode(1, &self.field, buf);
        }
        if !self.label.is_empty() {
            string::encode(2, &self.label, buf);
        }
        Ok(())
    }

    fn merge_bytes(&mut self, mut data: &[u8]) -> Result<()> {
        while data.has_remaining() {
            let (field, wire_type) =
                decode_key(&mut data).map_err(|err| decode_failure(Self::TYPE_NAME, err))?;
            let ctx = DecodeContext::default();
            let merged = match field {
                1 => uint64::merge(wire_type, &mut self.field, &mut data, ctx),
                2 => string::merge(wire_type, &mut self.label, &mut data, ctx),
                _ => skip_field(wire_type, field, &mut data, ctx),
            };
            merged.map_err(|err| decode_failure(Self::TYPE_NAME, err))?;
        }
        Ok(())
    }

    fn merge_json(&mut self, fields: &JsonObject) -> Result<()> {
        for (key, value) in fields {
            match key.as_str() {
                "field" => self.field = json_u64(Self::TYPE_NAME, key, value)?,
                "label" => self.label = json_str(Self::TYPE_NAME, key, value)?.to_owned(),
                other => {
                    return Err(AnyError::structured_decode(
                        Self::TYPE_NAME,
                        format!("unknown field `{other}`"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<JsonObject> {
        let mut object = JsonObject::new();
        if self.field != 0 {
            object.insert("field".to_owned(), Value::from(self.field));
        }
        if !self.label.is_empty() {
            object.insert("label".to_owned(), Value::from(self.label.clone()));
        }
        Ok(object)
    }

    fn merge_text(&mut self, scanner: &mut TextScanner<'_>) -> Result<()> {
        while !scanner.at_field_list_end() {
            let offset = scanner.position();
            match scanner.read_field_name()? {
                "field" => self.field = scanner.read_u64()?,
                "label" => self.label = scanner.read_string()?,
                other => {
                    return Err(AnyError::TextDecode {
                        offset,
                        detail: format!("unknown field `{other}` in {}", Self::TYPE_NAME),
                    });
                }
            }
            scanner.skip_field_separator();
        }
        Ok(())
    }

    fn write_text(&self, writer: &mut TextWriter) -> Result<()> {
        if self.field != 0 {
            writer.field_u64("field", self.field);
        }
        if !self.label.is_empty() {
            writer.field_str("label", &self.label);
        }
        Ok(())
    }
}

/// 带重复字段的消息：`enabled`（#1，bool）与 `tags`（#2，重复字符串，合并时追加）。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Gadget {
    /// 字段 1。
    pub enabled: bool,
    /// 字段 2。
    pub tags: Vec<String>,
}

impl Message for Gadget {
    const TYPE_NAME: &'static str = "pkg.Gadget";

    fn encode_raw(&self, buf: &mut BytesMut) -> Result<()> {
        if self.enabled {
            encoding::bool::encode(1, &self.enabled, buf);
        }
        string::encode_repeated(2, &self.tags, buf);
        Ok(())
    }

    fn merge_bytes(&mut self, mut data: &[u8]) -> Result<()> {
        while data.has_remaining() {
            let (field, wire_type) =
                decode_key(&mut data).map_err(|err| decode_failure(Self::TYPE_NAME, err))?;
            let ctx = DecodeContext::default();
            let merged = match field {
                1 => encoding::bool::merge(wire_type, &mut self.enabled, &mut data, ctx),
                2 => string::merge_repeated(wire_type, &mut self.tags, &mut data, ctx),
                _ => skip_field(wire_type, field, &mut data, ctx),
            };
            merged.map_err(|err| decode_failure(Self::TYPE_NAME, err))?;
        }
        Ok(())
    }

    fn merge_json(&mut self, fields: &JsonObject) -> Result<()> {
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("enabled", Value::Bool(enabled)) => self.enabled = *enabled,
                ("tags", Value::Array(items)) => {
                    for item in items {
                        self.tags.push(json_str(Self::TYPE_NAME, key, item)?.to_owned());
                    }
                }
                (other, _) => {
                    return Err(AnyError::structured_decode(
                        Self::TYPE_NAME,
                        format!("unexpected field `{other}`"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<JsonObject> {
        let mut object = JsonObject::new();
        if self.enabled {
            object.insert("enabled".to_owned(), Value::Bool(true));
        }
        if !self.tags.is_empty() {
            object.insert(
                "tags".to_owned(),
                Value::Array(self.tags.iter().cloned().map(Value::String).collect()),
            );
        }
        Ok(object)
    }

    fn merge_text(&mut self, scanner: &mut TextScanner<'_>) -> Result<()> {
        while !scanner.at_field_list_end() {
            let offset = scanner.position();
            match scanner.read_field_name()? {
                "enabled" => self.enabled = scanner.read_bool()?,
                "tags" => self.tags.push(scanner.read_string()?),
                other => {
                    return Err(AnyError::TextDecode {
                        offset,
                        detail: format!("unknown field `{other}` in {}", Self::TYPE_NAME),
                    });
                }
            }
            scanner.skip_field_separator();
        }
        Ok(())
    }

    fn write_text(&self, writer: &mut TextWriter) -> Result<()> {
        if self.enabled {
            writer.field_bool("enabled", true);
        }
        for tag in &self.tags {
            writer.field_str("tags", tag);
        }
        Ok(())
    }
}

/// 共享的编解码调用计数器，克隆后仍指向同一组计数。
#[derive(Clone, Debug, Default)]
pub struct CallCounter {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    encodes: AtomicUsize,
    decodes: AtomicUsize,
}

impl CallCounter {
    /// 编码调用次数。
    pub fn encodes(&self) -> usize {
        self.counters.encodes.load(Ordering::SeqCst)
    }

    /// 解码调用次数（二进制与结构化文本合计）。
    pub fn decodes(&self) -> usize {
        self.counters.decodes.load(Ordering::SeqCst)
    }

    /// 全部编解码调用次数。
    pub fn total(&self) -> usize {
        self.encodes() + self.decodes()
    }
}

/// 记录编解码调用的消息（`pkg.Counting`，字段 `value` #1 varint）。
#[derive(Clone, Debug, Default)]
pub struct CountingMessage {
    /// 字段 1。
    pub value: u64,
    calls: CallCounter,
}

impl CountingMessage {
    /// 构造消息并返回与之共享的调用计数器。
    pub fn with_counter(value: u64) -> (Self, CallCounter) {
        let calls = CallCounter::default();
        (
            Self {
                value,
                calls: calls.clone(),
            },
            calls,
        )
    }

    /// 本实例关联的计数器。
    pub fn calls(&self) -> &CallCounter {
        &self.calls
    }
}

impl Message for CountingMessage {
    const TYPE_NAME: &'static str = "pkg.Counting";

    fn encode_raw(&self, buf: &mut BytesMut) -> Result<()> {
        self.calls.counters.encodes.fetch_add(1, Ordering::SeqCst);
        if self.value != 0 {
            uint64::encode(1, &self.value, buf);
        }
        Ok(())
    }

    fn merge_bytes(&mut self, mut data: &[u8]) -> Result<()> {
        self.calls.counters.decodes.fetch_add(1, Ordering::SeqCst);
        while data.has_remaining() {
            let (field, wire_type) =
                decode_key(&mut data).map_err(|err| decode_failure(Self::TYPE_NAME, err))?;
            let ctx = DecodeContext::default();
            let merged = match field {
                1 => uint64::merge(wire_type, &mut self.value, &mut data, ctx),
                _ => skip_field(wire_type, field, &mut data, ctx),
            };
            merged.map_err(|err| decode_failure(Self::TYPE_NAME, err))?;
        }
        Ok(())
    }

    fn merge_json(&mut self, fields: &JsonObject) -> Result<()> {
        self.calls.counters.decodes.fetch_add(1, Ordering::SeqCst);
        if let Some(value) = fields.get("value") {
            self.value = json_u64(Self::TYPE_NAME, "value", value)?;
        }
        Ok(())
    }
}

/// 编码必然失败的消息（`pkg.Broken`）。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Broken;

impl Message for Broken {
    const TYPE_NAME: &'static str = "pkg.Broken";

    fn encode_raw(&self, _buf: &mut BytesMut) -> Result<()> {
        Err(AnyError::binary_encode(Self::TYPE_NAME, "encoder always fails"))
    }

    fn merge_bytes(&mut self, _data: &[u8]) -> Result<()> {
        Ok(())
    }
}

fn json_u64(type_name: &str, key: &str, value: &Value) -> Result<u64> {
    let parsed = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        AnyError::structured_decode(type_name, format!("`{key}` must be an unsigned integer"))
    })
}

fn json_str<'v>(type_name: &str, key: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| AnyError::structured_decode(type_name, format!("`{key}` must be a string")))
}
