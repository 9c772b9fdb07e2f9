//! Recycling pool for expensive, resettable panes.
//! 可重複使用、可重設之面板物件的回收池。
//!
//! Panes (editor surfaces, output views, ...) are costly to construct, so the
//! pool hands out idle instances first and only builds a new one when the idle
//! queue is empty. Released panes are cleared and queued again; the pool never
//! drops an instance on its own.
//! 面板建構成本高，因此優先重用閒置實例，只有在佇列為空時才建立新的實例。

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};

use log::debug;
use thiserror::Error;

/// Boxed error produced by a failing pane factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A resource that can be returned to a clean, idle state.
/// 可以重設回乾淨閒置狀態的資源。
pub trait Pane {
    /// Erases all content so the next user sees a pristine instance.
    /// 清除所有內容，讓下一個使用者取得全新的實例。
    fn clear(&mut self);
}

/// Raised when the factory cannot build a new pane.
/// 工廠函式無法建立新面板時的錯誤。
///
/// A broken factory is a configuration defect, so the pool never retries.
#[derive(Debug, Error)]
#[error("failed to construct pane #{ordinal}: {source}")]
pub struct PoolConstructionError {
    pub ordinal: usize,
    #[source]
    pub source: BoxError,
}

type Factory<P> = Box<dyn FnMut() -> Result<P, BoxError>>;
type OnCreated<P> = Box<dyn FnMut(&mut P)>;

/// FIFO pool of idle panes with lazy construction.
/// 具延遲建構的先進先出面板池。
///
/// The pool is meant for a single owner; all operations take `&mut self`.
pub struct PanePool<P: Pane> {
    idle: VecDeque<P>,
    factory: Factory<P>,
    on_created: OnCreated<P>,
    created: usize,
}

impl<P: Pane> PanePool<P> {
    /// Builds a pool around an infallible factory.
    /// 以不會失敗的工廠函式建立面板池。
    pub fn new<F, H>(mut factory: F, on_created: H) -> Self
    where
        F: FnMut() -> P + 'static,
        H: FnMut(&mut P) + 'static,
    {
        Self::from_parts(Box::new(move || Ok(factory())), Box::new(on_created))
    }

    /// Builds a pool around a factory that may fail.
    /// 以可能失敗的工廠函式建立面板池。
    pub fn try_new<F, E, H>(mut factory: F, on_created: H) -> Self
    where
        F: FnMut() -> Result<P, E> + 'static,
        E: Into<BoxError>,
        H: FnMut(&mut P) + 'static,
    {
        Self::from_parts(
            Box::new(move || factory().map_err(Into::into)),
            Box::new(on_created),
        )
    }

    fn from_parts(factory: Factory<P>, on_created: OnCreated<P>) -> Self {
        Self {
            idle: VecDeque::new(),
            factory,
            on_created,
            created: 0,
        }
    }

    /// Hands out the oldest idle pane, or builds and initialises a new one.
    /// 取出最舊的閒置面板；若沒有則建立並初始化新的面板。
    pub fn obtain(&mut self) -> Result<P, PoolConstructionError> {
        if let Some(pane) = self.idle.pop_front() {
            debug!("reusing pooled pane ({} still idle)", self.idle.len());
            return Ok(pane);
        }

        let ordinal = self.created + 1;
        let mut pane =
            (self.factory)().map_err(|source| PoolConstructionError { ordinal, source })?;
        (self.on_created)(&mut pane);
        self.created = ordinal;
        debug!("constructed pane #{ordinal}");
        Ok(pane)
    }

    /// Clears the pane and queues it behind the other idle panes.
    /// 清除面板內容並排入閒置佇列尾端。
    pub fn release(&mut self, mut pane: P) {
        pane.clear();
        self.idle.push_back(pane);
    }

    /// Obtains a pane wrapped in a guard that releases it when dropped.
    /// 取得會在離開作用域時自動歸還的面板。
    pub fn lease(&mut self) -> Result<PaneLease<'_, P>, PoolConstructionError> {
        let pane = self.obtain()?;
        Ok(PaneLease {
            pool: self,
            pane: Some(pane),
        })
    }

    /// Runs `f` against a leased pane; the pane goes back to the pool on every exit path.
    pub fn with_pane<R>(
        &mut self,
        f: impl FnOnce(&mut P) -> R,
    ) -> Result<R, PoolConstructionError> {
        let mut lease = self.lease()?;
        Ok(f(&mut lease))
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Number of panes the factory has built so far.
    pub fn created_count(&self) -> usize {
        self.created
    }
}

impl<P: Pane> fmt::Debug for PanePool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanePool")
            .field("idle", &self.idle.len())
            .field("created", &self.created)
            .finish()
    }
}

/// Scoped checkout of a pooled pane.
/// 面板的作用域租借。
pub struct PaneLease<'a, P: Pane> {
    pool: &'a mut PanePool<P>,
    // Always `Some` until `drop` hands the pane back.
    pane: Option<P>,
}

impl<P: Pane> Deref for PaneLease<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.pane.as_ref().expect("lease holds its pane until dropped")
    }
}

impl<P: Pane> DerefMut for PaneLease<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.pane.as_mut().expect("lease holds its pane until dropped")
    }
}

impl<P: Pane> Drop for PaneLease<'_, P> {
    fn drop(&mut self) {
        if let Some(pane) = self.pane.take() {
            self.pool.release(pane);
        }
    }
}
