//! # registry 模块：消息类型注册中心
//!
//! ## 核心意图（Why）
//! - 以“注册名 → 空实例工厂”的映射替代运行时反射，为转码引擎提供动态分发入口；
//! - 注册中心以 [`TypeRegistry`] trait 注入，测试可替换为桩实现，而不必触碰进程级全局状态。
//!
//! ## 行为契约（What）
//! - 注册阶段只追加，同名类型以首次注册为准；
//! - [`InMemoryTypeRegistry::seal`] 结束注册阶段，之后的注册返回 [`AnyError::RegistrySealed`]；
//! - 查找未命中返回 `None`，调用方将其视为“无法转码”，从不 panic。
//!
//! ## 风险提示（Trade-offs）
//! - `DashMap` 读路径无全局锁，但持有条目引用期间会阻塞同分片写入；查找只克隆出 `Arc` 后立即释放。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::error::{AnyError, Result};
use crate::message::{Message, MessageFactory, TypedMessageFactory};

/// 注册中心的只读查询面。
pub trait TypeRegistry: Send + Sync {
    /// 按完全限定名查找工厂。
    fn lookup(&self, type_name: &str) -> Option<Arc<dyn MessageFactory>>;
}

/// 不包含任何类型的注册中心。
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyRegistry;

impl TypeRegistry for EmptyRegistry {
    fn lookup(&self, _type_name: &str) -> Option<Arc<dyn MessageFactory>> {
        None
    }
}

/// `InMemoryTypeRegistry` 是基于 `DashMap` 的注册中心实现。
///
/// # 教案式说明
/// - **意图 (Why)**：生成代码或业务启动钩子在首次使用信封前登记类型，之后只读查询；
/// - **契约 (What)**：
///   - `register*` 返回 `Ok(true)` 表示新增条目，`Ok(false)` 表示同名条目已存在且保持不变；
///   - `seal` 之后所有注册都被拒绝，查询不受影响；
/// - **风险 (Trade-offs)**：重复注册同名但不同实现的类型不会报错，只记录 `warn` 日志。
#[derive(Default)]
pub struct InMemoryTypeRegistry {
    entries: DashMap<&'static str, Arc<dyn MessageFactory>>,
    sealed: AtomicBool,
}

impl InMemoryTypeRegistry {
    /// 构造空注册中心。
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记泛型消息类型。
    pub fn register<M: Message>(&self) -> Result<bool> {
        self.register_factory(Arc::new(TypedMessageFactory::<M>::new()))
    }

    /// 登记对象层工厂。
    pub fn register_factory(&self, factory: Arc<dyn MessageFactory>) -> Result<bool> {
        let type_name = factory.type_name();
        if self.is_sealed() {
            tracing::warn!(type_name, "registration rejected: registry is sealed");
            return Err(AnyError::RegistrySealed {
                type_name: type_name.to_owned(),
            });
        }

        match self.entries.entry(type_name) {
            Entry::Occupied(_) => {
                tracing::warn!(type_name, "type already registered, keeping first factory");
                Ok(false)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(factory);
                tracing::debug!(type_name, "message type registered");
                Ok(true)
            }
        }
    }

    /// 结束注册阶段。
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    /// 是否已封存。
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// 是否包含指定类型。
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// 已登记类型数量。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 已登记的类型名，按字典序排列。
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.iter().map(|entry| *entry.key()).collect();
        names.sort_unstable();
        names
    }
}

impl TypeRegistry for InMemoryTypeRegistry {
    fn lookup(&self, type_name: &str) -> Option<Arc<dyn MessageFactory>> {
        self.entries
            .get(type_name)
            .map(|entry| Arc::clone(entry.value()))
    }
}

impl core::fmt::Debug for InMemoryTypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryTypeRegistry")
            .field("types", &self.type_names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl<R: TypeRegistry + ?Sized> TypeRegistry for Arc<R> {
    fn lookup(&self, type_name: &str) -> Option<Arc<dyn MessageFactory>> {
        (**self).lookup(type_name)
    }
}

static GLOBAL: OnceLock<InMemoryTypeRegistry> = OnceLock::new();

/// 进程级注册中心，首次访问时惰性创建。
pub fn global() -> &'static InMemoryTypeRegistry {
    GLOBAL.get_or_init(InMemoryTypeRegistry::new)
}

/// 向进程级注册中心登记类型。
pub fn register_global<M: Message>() -> Result<bool> {
    global().register::<M>()
}
