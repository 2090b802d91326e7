use std::fmt::Write as _;

/// 单行文本格式输出器，形如 `field: 1 label: "x" nested { a: 2 }`。
///
/// 字段之间以单个空格分隔；字符串与字节按 C 风格转义，非 ASCII 字节输出为三位八进制。
#[derive(Debug, Default, Clone)]
pub struct TextWriter {
    out: String,
}

impl TextWriter {
    /// 构造空输出器。
    pub fn new() -> Self {
        Self::default()
    }

    /// 写出无符号整数字段。
    pub fn field_u64(&mut self, name: &str, value: u64) {
        self.separate();
        let _ = write!(self.out, "{name}: {value}");
    }

    /// 写出有符号整数字段。
    pub fn field_i64(&mut self, name: &str, value: i64) {
        self.separate();
        let _ = write!(self.out, "{name}: {value}");
    }

    /// 写出布尔字段。
    pub fn field_bool(&mut self, name: &str, value: bool) {
        self.separate();
        let _ = write!(self.out, "{name}: {value}");
    }

    /// 写出字符串字段。
    pub fn field_str(&mut self, name: &str, value: &str) {
        self.field_bytes(name, value.as_bytes());
    }

    /// 写出字节字段。
    pub fn field_bytes(&mut self, name: &str, value: &[u8]) {
        self.separate();
        self.out.push_str(name);
        self.out.push_str(": ");
        push_escaped(&mut self.out, value);
    }

    /// 打开嵌套消息 `name {`。
    pub fn begin_nested(&mut self, name: &str) {
        self.separate();
        self.out.push_str(name);
        self.out.push_str(" {");
    }

    /// 打开 `Any` 详细形式 `[type_url] {`。
    pub fn begin_any(&mut self, type_url: &str) {
        self.separate();
        self.out.push('[');
        self.out.push_str(type_url);
        self.out.push_str("] {");
    }

    /// 关闭最近打开的嵌套消息。
    pub fn end_nested(&mut self) {
        self.out.push_str(" }");
    }

    /// 取回输出。
    pub fn finish(self) -> String {
        self.out
    }

    /// 当前输出的只读视图。
    pub fn as_str(&self) -> &str {
        &self.out
    }

    fn separate(&mut self) {
        if !self.out.is_empty() {
            self.out.push(' ');
        }
    }
}

fn push_escaped(out: &mut String, value: &[u8]) {
    out.push('"');
    for &byte in value {
        match byte {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b'"' => out.push_str("\\\""),
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(byte)),
            other => {
                let _ = write!(out, "\\{other:03o}");
            }
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextScanner;

    #[test]
    fn fields_are_space_separated() {
        let mut writer = TextWriter::new();
        writer.field_u64("field", 1);
        writer.begin_nested("inner");
        writer.field_bool("on", true);
        writer.end_nested();
        writer.field_i64("delta", -2);
        assert_eq!(writer.finish(), "field: 1 inner { on: true } delta: -2");
    }

    #[test]
    fn escaped_bytes_scan_back_to_the_same_value() {
        let raw = b"q\"\\\n\x00\xff'".to_vec();
        let mut writer = TextWriter::new();
        writer.field_bytes("value", &raw);
        let text = writer.finish();

        let mut scanner = TextScanner::new(&text);
        assert_eq!(scanner.read_field_name().expect("name"), "value");
        assert_eq!(scanner.read_bytes().expect("escaped"), raw);
    }
}
