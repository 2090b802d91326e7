//! 文本格式词法层：[`TextScanner`] 负责读取，[`TextWriter`] 负责输出。
//!
//! 二者只处理词法与转义，字段语义由各消息类型的文本映射决定；`Any` 的两种文本形式由
//! [`crate::text_format`] 负责区分。

mod scanner;
mod writer;

pub use scanner::{DEFAULT_MAX_DEPTH, TextScanner};
pub use writer::TextWriter;
