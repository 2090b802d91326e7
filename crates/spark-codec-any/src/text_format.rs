//! # text_format 模块：`Any` 的文本格式桥接
//!
//! ## 角色定位（Why）
//! - 文本格式允许两种写法表示同一个信封：
//!   - 详细形式 `[type.googleapis.com/pkg.Widget] { field: 1 }`，内部字段按目标类型的文本映射书写；
//!   - 标准形式 `type_url: "..." value: "\010\001"`，负载是转义后的已编码字节；
//! - 详细形式只有在类型已注册时才能解释，因此解析路径必须查询注册中心。
//!
//! ## 行为契约（What）
//! - 分支由 [`TextScanner::try_read_any_type_url`] 决定：读到 `[.../...]` 前导即为详细形式；
//! - 详细形式立即解码为活对象并以 `Typed` 保存，标准形式以 `Raw` 保存；
//! - 任一分支结束后仍有非空白输入时返回 [`AnyError::TrailingInput`]。
//!
//! ## 风险提示（Trade-offs）
//! - 详细形式的解析是急切的：文本中的字段错误在解析阶段就会暴露，而不是推迟到解包。

use crate::config::AnyConfig;
use crate::envelope::{Any, Payload};
use crate::error::{AnyError, Result};
use crate::registry::TypeRegistry;
use crate::text::{TextScanner, TextWriter};
use crate::transcode::Transcoder;

const TYPE_URL_FIELD: &str = "type_url";
const VALUE_FIELD: &str = "value";

/// 以进程级注册中心解析文本格式。
pub fn parse_text(input: &str) -> Result<Any> {
    TextFormat::global().parse(input)
}

/// 以进程级注册中心输出文本格式。
pub fn print_text(any: &Any) -> Result<String> {
    TextFormat::global().print(any)
}

/// 绑定注册中心与配置的文本格式编解码器。
#[derive(Debug, Clone)]
pub struct TextFormat<'r> {
    transcoder: Transcoder<'r>,
}

impl<'r> TextFormat<'r> {
    /// 以缺省配置构造。
    pub fn new(registry: &'r dyn TypeRegistry) -> Self {
        Self {
            transcoder: Transcoder::new(registry),
        }
    }

    /// 以指定配置构造。
    pub fn with_config(registry: &'r dyn TypeRegistry, config: AnyConfig) -> Self {
        Self {
            transcoder: Transcoder::with_config(registry, config),
        }
    }

    /// 解析单个信封。
    pub fn parse(&self, input: &str) -> Result<Any> {
        let mut scanner =
            TextScanner::with_max_depth(input, self.transcoder.config().text.max_depth);
        let any = match scanner.try_read_any_type_url() {
            Some(type_url) => self.parse_verbose(&mut scanner, type_url)?,
            None => Self::parse_standard(&mut scanner)?,
        };
        if !scanner.is_at_end() {
            return Err(AnyError::TrailingInput {
                offset: scanner.position(),
            });
        }
        Ok(any)
    }

    /// 输出单行文本格式。
    ///
    /// # 行为逻辑（How）
    /// 1. 配置偏好详细形式、负载能物化且类型具备文本映射时，输出 `[type_url] { ... }`；
    /// 2. 否则输出标准形式，`value` 取自规范字节投影；
    /// 3. 负载非空却既无法物化也无法投影时返回 [`AnyError::UnresolvableType`]。
    pub fn print(&self, any: &Any) -> Result<String> {
        if self.transcoder.config().text.prefer_verbose && !any.type_url().is_empty() {
            match self.print_verbose(any) {
                Ok(text) => return Ok(text),
                Err(err) => {
                    tracing::debug!(
                        type_url = any.type_url(),
                        error.code = err.code(),
                        "verbose text form unavailable, using standard form"
                    );
                }
            }
        }

        let mut writer = TextWriter::new();
        if !any.type_url().is_empty() {
            writer.field_str(TYPE_URL_FIELD, any.type_url());
        }
        if !any.is_empty() {
            let value = self
                .transcoder
                .project(any)
                .ok_or_else(|| AnyError::unresolvable(any.type_url()))?;
            if !value.is_empty() {
                writer.field_bytes(VALUE_FIELD, &value);
            }
        }
        Ok(writer.finish())
    }

    fn print_verbose(&self, any: &Any) -> Result<String> {
        let message = self.transcoder.materialize(any)?;
        let mut writer = TextWriter::new();
        writer.begin_any(any.type_url());
        message.write_text_dyn(&mut writer)?;
        writer.end_nested();
        Ok(writer.finish())
    }

    fn parse_verbose(&self, scanner: &mut TextScanner<'_>, type_url: String) -> Result<Any> {
        let mut message = self.transcoder.instantiate(&type_url)?;
        let close = scanner.begin_message()?;
        message.merge_text_dyn(scanner)?;
        scanner.end_message(close)?;

        let mut any = Any::new();
        any.set_type_url(type_url);
        any.replace_payload(Payload::Typed(message));
        Ok(any)
    }

    fn parse_standard(scanner: &mut TextScanner<'_>) -> Result<Any> {
        let mut type_url = None;
        let mut value = None;
        while !scanner.at_field_list_end() {
            let offset = scanner.position();
            match scanner.read_field_name()? {
                TYPE_URL_FIELD => type_url = Some(scanner.read_string()?),
                VALUE_FIELD => value = Some(scanner.read_bytes()?),
                other => {
                    return Err(AnyError::TextDecode {
                        offset,
                        detail: format!("unknown field `{other}` in google.protobuf.Any"),
                    });
                }
            }
            scanner.skip_field_separator();
        }

        let mut any = Any::new();
        if let Some(type_url) = type_url {
            any.set_type_url(type_url);
        }
        if let Some(value) = value {
            any.set_raw_bytes(value);
        }
        Ok(any)
    }
}

impl TextFormat<'static> {
    /// 基于进程级注册中心的文本格式编解码器。
    pub fn global() -> Self {
        Self {
            transcoder: Transcoder::global(),
        }
    }
}
