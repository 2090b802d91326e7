use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use spark_codec_any::test_stubs::Widget;
use spark_codec_any::{Any, InMemoryTypeRegistry, Message, Transcoder};

/// 对比延迟打包与急切投影的开销。
///
/// # 设计目的（Why）
/// - `pack` 只转移所有权，应与消息大小无关；`project` 每次都重新编码；
/// - 结构化片段的投影还包含注册中心查找与字段合并，单独列出便于观察转码成本。
fn bench_projection(c: &mut Criterion) {
    let registry = InMemoryTypeRegistry::new();
    let _ = registry.register::<Widget>();
    let transcoder = Transcoder::new(&registry);
    let widget = Widget {
        field: 1_234_567,
        label: "projection-benchmark".repeat(8),
    };

    c.bench_function("pack_deferred", |b| {
        b.iter(|| Any::pack(black_box(widget.clone())))
    });

    let typed = Any::pack(widget.clone());
    c.bench_function("project_typed", |b| {
        b.iter(|| transcoder.project(black_box(&typed)))
    });

    let mut structured = Any::new();
    structured.set_type_url(typed.type_url());
    if let Ok(fields) = widget.to_json() {
        let _ = structured.set_structured_fragment(fields);
    }
    c.bench_function("project_structured", |b| {
        b.iter(|| transcoder.project(black_box(&structured)))
    });
}

criterion_group!(any_benches, bench_projection);
criterion_main!(any_benches);
