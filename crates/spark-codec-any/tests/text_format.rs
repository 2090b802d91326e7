//! 文本格式桥接的外部契约。
//!
//! - 详细形式必须立即解码为类型化负载，且投影等于对应实例的编码；
//! - 标准形式保存为字节负载，不依赖注册中心；
//! - 两种形式之后的多余输入都以 `TrailingInput` 拒绝。

use spark_codec_any::test_stubs::{Gadget, Widget};
use spark_codec_any::{
    Any, AnyConfig, AnyError, EmptyRegistry, InMemoryTypeRegistry, Message, RepresentationKind,
    TextFormat, parse_text, print_text, register_global,
};

fn registry() -> InMemoryTypeRegistry {
    let registry = InMemoryTypeRegistry::new();
    registry.register::<Widget>().expect("注册 Widget 应成功");
    registry.register::<Gadget>().expect("注册 Gadget 应成功");
    registry
}

/// 性质 9：详细形式解析为 `Typed`，投影与 `Widget { field: 1 }` 的编码一致。
#[test]
fn verbose_literal_becomes_typed_payload() {
    let registry = registry();
    let any = TextFormat::new(&registry)
        .parse("[type.googleapis.com/pkg.Widget] { field: 1 }")
        .expect("已注册类型");

    assert_eq!(any.representation(), RepresentationKind::Typed);
    assert_eq!(
        any.current_bytes_with(&registry),
        Some(Widget { field: 1, label: String::new() }.encode_to_bytes().expect("编码"))
    );
}

#[test]
fn verbose_literal_with_comments_and_repeated_fields() {
    let registry = registry();
    let text = "# 设备标签\n[type.googleapis.com/pkg.Gadget] {\n  enabled: true\n  tags: \"a\"; tags: 'b'\n}\n";
    let gadget = TextFormat::new(&registry)
        .parse(text)
        .expect("合法文本")
        .unpack::<Gadget>()
        .expect("同类型");
    assert_eq!(gadget, Gadget { enabled: true, tags: vec!["a".into(), "b".into()] });
}

#[test]
fn verbose_field_errors_surface_at_parse_time() {
    let registry = registry();
    let err = TextFormat::new(&registry)
        .parse("[type.googleapis.com/pkg.Widget] { colour: 1 }")
        .expect_err("未知字段");
    assert!(matches!(err, AnyError::TextDecode { offset: 35, .. }), "{err:?}");
}

#[test]
fn trailing_input_after_standard_form() {
    let err = TextFormat::new(&EmptyRegistry)
        .parse("type_url: \"t/pkg.Widget\" }")
        .expect_err("多余的闭括号");
    assert_eq!(err, AnyError::TrailingInput { offset: 25 });
}

#[test]
fn configured_depth_admits_single_level_literal() {
    let registry = registry();
    let config = AnyConfig::from_toml_str("[text]\nmax_depth = 1\n").expect("合法配置");
    let format = TextFormat::with_config(&registry, config);

    format
        .parse("[type.googleapis.com/pkg.Widget] { field: 2 }")
        .expect("单层嵌套在上限之内");
}

#[test]
fn empty_input_is_empty_envelope() {
    let any = TextFormat::new(&EmptyRegistry).parse("   ").expect("空输入");
    assert!(any.is_empty());
    assert_eq!(any.type_url(), "");
}

#[test]
fn global_print_parse_round_trip() {
    register_global::<Gadget>().expect("全局注册中心未封存");
    let any = Any::pack(Gadget { enabled: true, tags: vec!["x\ny".into()] });

    let text = print_text(&any).expect("可输出");
    assert_eq!(text, "[type.googleapis.com/pkg.Gadget] { enabled: true tags: \"x\\ny\" }");

    let parsed = parse_text(&text).expect("可解析");
    assert_eq!(parsed, any);
}

#[test]
fn unprintable_payload_is_reported() {
    let mut any = Any::new();
    any.set_type_url("type.googleapis.com/pkg.Unknown");
    any.set_structured_fragment(serde_json::Map::new())
        .expect("URL 已设置");

    let err = TextFormat::new(&EmptyRegistry).print(&any).expect_err("既无法物化也无法投影");
    assert_eq!(err, AnyError::unresolvable("type.googleapis.com/pkg.Unknown"));
}
