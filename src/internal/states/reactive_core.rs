//! # ReactiveProperty：响应式属性内核
//!
//! 下载状态与下载进度都挂在这里：引擎在 registry 锁内写入，
//! 外部通过 [`ReactiveProperty::watch`] 异步监听，或用 [`ReactiveProperty::wait_until`] 等待某个状态。
//!
//! 本模块**不对外导出**，对外使用 [`super::unlock_reactive`] 中的别名。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tokio::sync::watch::Ref;
use tokio::sync::watch::error::RecvError;

// ──────────────────────────── Error ────────────────────────────

/// 响应式属性统一错误类型
#[derive(Debug, Error)]
pub enum ReactivePropertyError {
    /// 监听器已被销毁
    #[error("监听器已被销毁")]
    WatcherClosed,

    /// 属性已被销毁
    #[error("属性已被销毁")]
    Destroyed,

    /// watch 通道接收失败
    #[error("接收失败: {0}")]
    RecvError(#[from] RecvError),
}

// ──────────────────────────── Inner ────────────────────────────

/// 内部共享状态，包含值发送器和销毁标志。
#[derive(Debug)]
pub(crate) struct Inner<T> {
    pub(crate) sender: watch::Sender<Option<T>>,
    pub(crate) is_dropped: AtomicBool,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        self.is_dropped.store(true, Ordering::Relaxed);
        let _ = self.sender.send(None);
    }
}

// ──────────────────────────── ReactiveProperty ────────────────────────────

/// 响应式属性内核：new / update / update_field / get_current / watch / wait_until。
#[derive(Clone, Debug)]
pub struct ReactiveProperty<T: Clone + Send + Sync> {
    pub(crate) inner: Arc<Inner<T>>,
    pub(crate) cache_receiver: watch::Receiver<Option<T>>,
}

impl<T> ReactiveProperty<T>
where
    T: Clone + Send + Sync,
{
    /// 创建一个新的响应式属性。
    pub fn new(value: T) -> Self {
        let (sender, _) = watch::channel(Some(value));
        let cache_receiver = sender.subscribe();
        Self {
            inner: Arc::new(Inner {
                sender,
                is_dropped: AtomicBool::new(false),
            }),
            cache_receiver,
        }
    }

    /// 更新属性的值，所有监听者都会收到通知。
    pub fn update(
        &self,
        new_value: T,
    ) -> Result<&Self, ReactivePropertyError> {
        if self.inner.is_dropped.load(Ordering::Relaxed) {
            return Err(ReactivePropertyError::Destroyed);
        }
        // 没有监听者时 send 会返回 Err，但值仍需写入缓存
        self.inner.sender.send_replace(Some(new_value));
        Ok(self)
    }

    /// 使用闭包更新属性的部分字段。
    pub fn update_field<F, R>(
        &self,
        updater: F,
    ) -> Result<&Self, ReactivePropertyError>
    where
        F: FnOnce(&mut T) -> R,
    {
        if self.inner.is_dropped.load(Ordering::Relaxed) {
            return Err(ReactivePropertyError::Destroyed);
        }

        let mut current = match self.cache_receiver.borrow().clone() {
            Some(val) => val,
            None => return Err(ReactivePropertyError::Destroyed),
        };

        updater(&mut current);
        self.inner.sender.send_replace(Some(current));
        Ok(self)
    }

    /// 获取当前属性值的快照（会 clone）。
    pub fn get_current(&self) -> Option<T> {
        self.cache_receiver
            .borrow()
            .as_ref()
            .cloned()
    }

    /// 获取当前属性值的只读借用（零拷贝）。
    pub fn get_current_borrow(&'_ self) -> Ref<'_, Option<T>> {
        self.cache_receiver.borrow()
    }

    /// 获取当前值，如果属性已销毁则返回默认值。
    pub fn get_or_default(&self) -> T
    where
        T: Default,
    {
        self.get_current().unwrap_or_default()
    }

    /// 创建一个监听器，用于异步监听属性值的变化。
    pub fn watch(&self) -> PropertyWatcher<T> {
        PropertyWatcher {
            receiver: self.inner.sender.subscribe(),
            inner: Arc::clone(&self.inner),
        }
    }

    /// 挂起直到当前值满足 `predicate`，返回满足条件的值。
    ///
    /// 当前值已满足时立即返回；期间属性被销毁则返回 [`ReactivePropertyError::Destroyed`]。
    pub async fn wait_until<F>(
        &self,
        mut predicate: F,
    ) -> Result<T, ReactivePropertyError>
    where
        F: FnMut(&T) -> bool,
    {
        let mut receiver = self.inner.sender.subscribe();
        let value = receiver
            .wait_for(|v| match v {
                Some(v) => predicate(v),
                None => true,
            })
            .await?;
        match &*value {
            Some(v) => Ok(v.clone()),
            None => Err(ReactivePropertyError::Destroyed),
        }
    }
}

// ──────────────────────────── PropertyWatcher ────────────────────────────

/// 属性监听器，用于异步接收属性值的变化。
pub struct PropertyWatcher<T> {
    receiver: watch::Receiver<Option<T>>,
    #[allow(dead_code)]
    inner: Arc<Inner<T>>,
}

impl<T> PropertyWatcher<T>
where
    T: Clone + Send + Sync,
{
    /// 异步等待属性值的变化，返回新值。
    pub async fn changed(&mut self) -> Result<T, ReactivePropertyError> {
        self.receiver.changed().await?;
        match self.receiver.borrow_and_update().as_ref() {
            None => Err(ReactivePropertyError::WatcherClosed),
            Some(value) => Ok(value.clone()),
        }
    }

    /// 同步获取当前值的克隆。
    pub fn borrow(&self) -> Option<T> {
        self.receiver.borrow().clone()
    }
}
