#![warn(missing_docs)]
#![deny(unsafe_code)]
#![doc = "spark-codec-any: 延迟序列化、类型擦除的 `Any` 信封。"]
#![doc = ""]
#![doc = "信封以类型 URL 标识负载类型，负载可以是已编码字节、活的类型化对象或未解析的结构化片段，"]
#![doc = "三者任一时刻至多一种有效；规范字节只在被观察时由转码引擎按需计算。"]

//! # 模块地图（How）
//! - [`type_url`]：类型 URL 的拼接与拆解；
//! - [`message`]：消息能力的泛型层 [`Message`] 与对象层 [`DynMessage`]；
//! - [`registry`]：类型名到空实例工厂的注册中心，支持注入与封存；
//! - [`envelope`]：三态信封 [`Any`] 及其相等/哈希语义；
//! - `pack`：`Any::pack` / `Any::unpack_to` 等打包解包协议；
//! - [`transcode`]：投影、物化与就地归一化；
//! - [`structured`]、[`text_format`]、[`wire`]：结构化文本、文本格式与二进制线格式映射；
//! - [`config`]：可从 TOML 加载的行为配置；
//! - [`test_stubs`]：契约测试共用的消息桩。
//!
//! # 快速示例
//! ```
//! use spark_codec_any::test_stubs::Widget;
//! use spark_codec_any::{Any, InMemoryTypeRegistry, Transcoder};
//!
//! let registry = InMemoryTypeRegistry::new();
//! registry.register::<Widget>().expect("fresh registry");
//!
//! let any = Any::pack(Widget { field: 1, label: "hello".into() });
//! assert_eq!(any.type_url(), "type.googleapis.com/pkg.Widget");
//!
//! let bytes = Transcoder::new(&registry).project(&any).expect("typed payload encodes");
//! assert!(!bytes.is_empty());
//! assert_eq!(any.unpack::<Widget>().expect("same type").label, "hello");
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod message;
mod pack;
pub mod registry;
pub mod structured;
pub mod test_stubs;
pub mod text;
pub mod text_format;
pub mod transcode;
pub mod type_url;
pub mod wire;

pub use config::{AnyConfig, TextConfig};
pub use envelope::{ANY_TYPE_NAME, Any, Payload, RepresentationKind};
pub use error::{AnyError, Result};
pub use message::{DynMessage, JsonObject, Message, MessageFactory, TypedMessageFactory};
pub use registry::{EmptyRegistry, InMemoryTypeRegistry, TypeRegistry, register_global};
pub use text_format::{TextFormat, parse_text, print_text};
pub use transcode::Transcoder;
pub use type_url::{DEFAULT_PREFIX, TypeUrl};
