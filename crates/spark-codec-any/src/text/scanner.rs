use crate::error::AnyError;

/// 文本格式的最小扫描器。
///
/// # 设计背景（Why）
/// - 文本格式下嵌套消息的语法取决于目标类型自己的字段名，因此扫描器只负责词法：标识符、数字、
///   带转义的字符串、标点，以及 `Any` 专用的 `[type/url]` 前导；
/// - 字段语义交给各消息类型的 [`Message::merge_text`](crate::Message::merge_text)。
///
/// # 契约说明（What）
/// - 空白与 `#` 行注释在每次读取前被跳过；
/// - 所有读取失败都返回带字节偏移的 [`AnyError::TextDecode`]；
/// - 嵌套深度受 `max_depth` 约束，超限视为畸形输入。
#[derive(Debug, Clone)]
pub struct TextScanner<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

/// 默认嵌套深度上限。
pub const DEFAULT_MAX_DEPTH: usize = 64;

impl<'a> TextScanner<'a> {
    /// 以默认深度上限构造扫描器。
    pub fn new(input: &'a str) -> Self {
        Self::with_max_depth(input, DEFAULT_MAX_DEPTH)
    }

    /// 指定嵌套深度上限。
    pub fn with_max_depth(input: &'a str, max_depth: usize) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// 下一个未消费字符的字节偏移（已跳过空白）。
    pub fn position(&mut self) -> usize {
        self.skip_whitespace();
        self.pos
    }

    /// 当前嵌套深度。
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 是否已到输入末尾。
    pub fn is_at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    /// 在当前位置构造文本解析错误。
    pub fn error(&self, detail: impl Into<String>) -> AnyError {
        AnyError::TextDecode {
            offset: self.pos,
            detail: detail.into(),
        }
    }

    /// 下一个字符是否为 `symbol`，不消费。
    pub fn peek_symbol(&mut self, symbol: char) -> bool {
        self.skip_whitespace();
        self.rest().starts_with(symbol)
    }

    /// 若下一个字符为 `symbol` 则消费并返回 `true`。
    pub fn try_consume_symbol(&mut self, symbol: char) -> bool {
        if self.peek_symbol(symbol) {
            self.pos += symbol.len_utf8();
            true
        } else {
            false
        }
    }

    /// 消费 `symbol`，缺失时报错。
    pub fn expect_symbol(&mut self, symbol: char) -> Result<(), AnyError> {
        if self.try_consume_symbol(symbol) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{symbol}`")))
        }
    }

    /// 是否位于字段列表末尾：输入结束，或下一个字符为 `}` / `>`。
    pub fn at_field_list_end(&mut self) -> bool {
        self.is_at_end() || self.peek_symbol('}') || self.peek_symbol('>')
    }

    /// 跳过字段之间可选的 `,` 或 `;`。
    pub fn skip_field_separator(&mut self) {
        if !self.try_consume_symbol(',') {
            self.try_consume_symbol(';');
        }
    }

    /// 读取标识符（字段名或枚举值）。
    pub fn read_identifier(&mut self) -> Result<&'a str, AnyError> {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(idx, c)| {
                !(c.is_ascii_alphanumeric() || *c == '_') || (*idx == 0 && c.is_ascii_digit())
            })
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected identifier"));
        }
        let ident = &rest[..len];
        self.pos += len;
        Ok(ident)
    }

    /// 读取字段名并消费其后的 `:`。
    ///
    /// 消息类型字段的 `:` 可以省略，因此冒号可选；调用方根据字段类型决定后续读取方式。
    pub fn read_field_name(&mut self) -> Result<&'a str, AnyError> {
        let name = self.read_identifier()?;
        self.try_consume_symbol(':');
        Ok(name)
    }

    /// 尝试读取 `Any` 的详细形式前导 `[prefix/pkg.Type]`。
    ///
    /// # 契约说明（What）
    /// - 命中时消费括号及其内容，返回去除空白的 URL；
    /// - URL 中必须包含 `/`，否则视为普通扩展字段名，不消费任何输入并返回 `None`；
    /// - 未命中时扫描器位置保持不变。
    pub fn try_read_any_type_url(&mut self) -> Option<String> {
        let saved = self.pos;
        if !self.try_consume_symbol('[') {
            return None;
        }
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-')))
            .unwrap_or(rest.len());
        let url = &rest[..len];
        self.pos += len;
        if url.contains('/') && self.try_consume_symbol(']') {
            Some(url.to_owned())
        } else {
            self.pos = saved;
            None
        }
    }

    /// 读取无符号整数，支持十进制与 `0x` 十六进制。
    pub fn read_u64(&mut self) -> Result<u64, AnyError> {
        let start = self.position();
        let literal = self.read_number_literal()?;
        let parsed = match literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => literal.parse::<u64>(),
        };
        parsed.map_err(|err| AnyError::TextDecode {
            offset: start,
            detail: format!("invalid unsigned integer `{literal}`: {err}"),
        })
    }

    /// 读取有符号整数。
    pub fn read_i64(&mut self) -> Result<i64, AnyError> {
        let start = self.position();
        let negative = self.try_consume_symbol('-');
        let magnitude = self.read_u64()?;
        let value = if negative {
            0i64.checked_sub_unsigned(magnitude)
        } else {
            i64::try_from(magnitude).ok()
        };
        value.ok_or_else(|| AnyError::TextDecode {
            offset: start,
            detail: "integer out of range for int64".to_owned(),
        })
    }

    /// 读取布尔值：`true`/`false`/`t`/`f`/`1`/`0`。
    pub fn read_bool(&mut self) -> Result<bool, AnyError> {
        let start = self.position();
        if self.rest().starts_with(|c: char| c.is_ascii_digit()) {
            return match self.read_number_literal()? {
                "1" => Ok(true),
                "0" => Ok(false),
                other => Err(AnyError::TextDecode {
                    offset: start,
                    detail: format!("invalid bool literal `{other}`"),
                }),
            };
        }
        match self.read_identifier()? {
            "true" | "t" | "True" => Ok(true),
            "false" | "f" | "False" => Ok(false),
            other => Err(AnyError::TextDecode {
                offset: start,
                detail: format!("invalid bool literal `{other}`"),
            }),
        }
    }

    /// 读取一个或多个相邻的引号字符串并拼接为字节。
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, AnyError> {
        let mut out = Vec::new();
        self.read_quoted_into(&mut out)?;
        while self.peek_symbol('"') || self.peek_symbol('\'') {
            self.read_quoted_into(&mut out)?;
        }
        Ok(out)
    }

    /// 读取字符串，要求结果为合法 UTF-8。
    pub fn read_string(&mut self) -> Result<String, AnyError> {
        let start = self.position();
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|err| AnyError::TextDecode {
            offset: start,
            detail: format!("string is not valid UTF-8: {err}"),
        })
    }

    /// 进入嵌套消息：消费可选的 `:` 与开括号，返回对应的闭括号。
    pub fn begin_message(&mut self) -> Result<char, AnyError> {
        self.try_consume_symbol(':');
        let close = if self.try_consume_symbol('{') {
            '}'
        } else if self.try_consume_symbol('<') {
            '>'
        } else {
            return Err(self.error("expected `{` or `<` to open a message"));
        };
        if self.depth >= self.max_depth {
            return Err(self.error(format!(
                "message nesting exceeds limit of {}",
                self.max_depth
            )));
        }
        self.depth += 1;
        Ok(close)
    }

    /// 离开嵌套消息，消费 `close`。
    pub fn end_message(&mut self, close: char) -> Result<(), AnyError> {
        self.expect_symbol(close)?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    /// 跳过一个未知字段的值（标量、字符串或嵌套消息），值前至多一个 `:`。
    pub fn skip_value(&mut self) -> Result<(), AnyError> {
        self.try_consume_symbol(':');
        if self.peek_symbol('{') || self.peek_symbol('<') {
            let close = self.begin_message()?;
            while !self.at_field_list_end() {
                self.read_field_name()?;
                self.skip_value()?;
                self.skip_field_separator();
            }
            return self.end_message(close);
        }
        if self.peek_symbol('"') || self.peek_symbol('\'') {
            return self.read_bytes().map(|_| ());
        }
        if self.peek_symbol('-') {
            self.try_consume_symbol('-');
        }
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-')))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a value"));
        }
        self.pos += len;
        Ok(())
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with('#') {
                let line_end = trimmed.find('\n').map(|idx| idx + 1).unwrap_or(trimmed.len());
                self.pos += line_end;
            } else {
                return;
            }
        }
    }

    fn read_number_literal(&mut self) -> Result<&'a str, AnyError> {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        if len == 0 || !rest.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(self.error("expected a number"));
        }
        let literal = &rest[..len];
        self.pos += len;
        Ok(literal)
    }

    fn read_quoted_into(&mut self, out: &mut Vec<u8>) -> Result<(), AnyError> {
        self.skip_whitespace();
        let bytes = self.input.as_bytes();
        let quote = match bytes.get(self.pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        let mut idx = self.pos + 1;
        loop {
            let Some(&byte) = bytes.get(idx) else {
                return Err(AnyError::TextDecode {
                    offset: self.pos,
                    detail: "unterminated string".to_owned(),
                });
            };
            idx += 1;
            match byte {
                b if b == quote => break,
                b'\n' => {
                    return Err(AnyError::TextDecode {
                        offset: idx - 1,
                        detail: "newline inside string".to_owned(),
                    });
                }
                b'\\' => {
                    let (decoded, consumed) = unescape(&bytes[idx..]).ok_or(AnyError::TextDecode {
                        offset: idx - 1,
                        detail: "invalid escape sequence".to_owned(),
                    })?;
                    out.push(decoded);
                    idx += consumed;
                }
                other => out.push(other),
            }
        }
        self.pos = idx;
        Ok(())
    }
}

/// 解析反斜杠之后的转义序列，返回 `(字节, 消耗长度)`。
fn unescape(rest: &[u8]) -> Option<(u8, usize)> {
    let first = *rest.first()?;
    let simple = match first {
        b'n' => Some(b'\n'),
        b'r' => Some(b'\r'),
        b't' => Some(b'\t'),
        b'a' => Some(0x07),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'v' => Some(0x0b),
        b'\\' => Some(b'\\'),
        b'\'' => Some(b'\''),
        b'"' => Some(b'"'),
        b'?' => Some(b'?'),
        _ => None,
    };
    if let Some(byte) = simple {
        return Some((byte, 1));
    }
    if first == b'x' || first == b'X' {
        let digits: Vec<u8> = rest[1..]
            .iter()
            .take(2)
            .take_while(|b| b.is_ascii_hexdigit())
            .copied()
            .collect();
        if digits.is_empty() {
            return None;
        }
        let text = std::str::from_utf8(&digits).ok()?;
        return Some((u8::from_str_radix(text, 16).ok()?, 1 + digits.len()));
    }
    if (b'0'..=b'7').contains(&first) {
        let digits: Vec<u8> = rest
            .iter()
            .take(3)
            .take_while(|b| (b'0'..=b'7').contains(*b))
            .copied()
            .collect();
        let text = std::str::from_utf8(&digits).ok()?;
        let value = u16::from_str_radix(text, 8).ok()?;
        return Some((u8::try_from(value).ok()?, digits.len()));
    }
    None
}
