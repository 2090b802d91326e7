//! 类型 URL 的构造与解析。
//!
//! 类型 URL 形如 `prefix/fully.qualified.TypeName`，最后一个 `/` 之后的片段即注册名。
//! 解析阶段容忍畸形输入：缺少 `/` 时整串视为类型名，交由注册中心查找阶段失败。

use std::fmt;

/// 默认的类型 URL 前缀。
pub const DEFAULT_PREFIX: &str = "type.googleapis.com";

/// `TypeUrl` 是 [`build`] 的产物，保证以 `/<type_name>` 结尾。
///
/// # 契约说明（What）
/// - 构造后不可变；
/// - [`TypeUrl::type_name`] 与 [`extract_type_name`] 语义一致；
/// - 通过 `From<TypeUrl> for String` 存入信封，信封本身允许空 URL。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeUrl(String);

impl TypeUrl {
    /// 返回完整字符串。
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 返回最后一个 `/` 之后的类型名。
    pub fn type_name(&self) -> &str {
        extract_type_name(&self.0)
    }

    /// 返回最后一个 `/` 之前的前缀（不含分隔符）。
    pub fn prefix(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// 取回内部字符串。
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TypeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TypeUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<TypeUrl> for String {
    fn from(value: TypeUrl) -> Self {
        value.0
    }
}

/// 拼接类型 URL。
///
/// # 行为逻辑（How）
/// 1. 以 `prefix` 起始，若末尾缺少 `/` 则补齐；
/// 2. 追加 `type_name`。
///
/// `type_name` 不做校验，调用方需保证它就是该类型的注册名。
pub fn build(type_name: &str, prefix: &str) -> TypeUrl {
    let mut url = String::with_capacity(prefix.len() + type_name.len() + 1);
    url.push_str(prefix);
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(type_name);
    TypeUrl(url)
}

/// 使用 [`DEFAULT_PREFIX`] 拼接类型 URL。
pub fn build_default(type_name: &str) -> TypeUrl {
    build(type_name, DEFAULT_PREFIX)
}

/// 返回最后一个 `/` 之后的子串；没有 `/` 时返回整个输入。
pub fn extract_type_name(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[idx + 1..],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_inserts_missing_separator() {
        let url = build("pkg.Widget", "type.googleapis.com");
        assert_eq!(url.as_str(), "type.googleapis.com/pkg.Widget");
        assert_eq!(url.type_name(), "pkg.Widget");
        assert_eq!(url.prefix(), "type.googleapis.com");
    }

    #[test]
    fn build_keeps_existing_separator() {
        let url = build("pkg.Widget", "example.com/types/");
        assert_eq!(url.as_str(), "example.com/types/pkg.Widget");
        assert_eq!(url.prefix(), "example.com/types");
    }

    #[test]
    fn build_with_empty_prefix_still_ends_with_slash_name() {
        let url = build("pkg.Widget", "");
        assert_eq!(url.as_str(), "/pkg.Widget");
    }

    #[test]
    fn extract_tolerates_missing_slash() {
        assert_eq!(extract_type_name("pkg.Widget"), "pkg.Widget");
        assert_eq!(extract_type_name(""), "");
        assert_eq!(extract_type_name("a/b/c.D"), "c.D");
        assert_eq!(extract_type_name("trailing/"), "");
    }
}
