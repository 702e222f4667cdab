//! 一次性初始化槽
//!
//! 与 `OnceCell` 相同，每个槽只成功构建一次；区别在于构建期间不持有锁，
//! 并记录构建线程：其他线程阻塞等待结果，同一线程重入则立即报错。

use crate::error::{Error, Result};
use crate::instance::Instance;
use parking_lot::{Condvar, Mutex};
use std::thread::{self, ThreadId};

enum State {
    Empty,
    /// 正在由该线程构建
    Building(ThreadId),
    Ready(Instance),
}

pub(crate) struct OnceSlot {
    state: Mutex<State>,
    ready: Condvar,
}

impl OnceSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::Empty),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn get(&self) -> Option<Instance> {
        match &*self.state.lock() {
            State::Ready(instance) => Some(instance.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), State::Ready(_))
    }

    /// 返回已构建的值，否则运行 `init`。
    ///
    /// 失败或 panic 后槽位恢复为空，等待中的线程之一会重新构建。
    pub(crate) fn get_or_try_init<I, R>(&self, init: I, reentered: R) -> Result<Instance>
    where
        I: FnOnce() -> Result<Instance>,
        R: FnOnce() -> Error,
    {
        let current = thread::current().id();
        {
            let mut state = self.state.lock();
            loop {
                let wait = match &*state {
                    State::Ready(instance) => return Ok(instance.clone()),
                    State::Building(owner) if *owner == current => return Err(reentered()),
                    State::Building(_) => true,
                    State::Empty => false,
                };
                if !wait {
                    *state = State::Building(current);
                    break;
                }
                self.ready.wait(&mut state);
            }
        }

        let mut guard = BuildGuard {
            slot: self,
            armed: true,
        };
        let outcome = init();
        guard.armed = false;

        let mut state = self.state.lock();
        *state = match &outcome {
            Ok(instance) => State::Ready(instance.clone()),
            Err(_) => State::Empty,
        };
        self.ready.notify_all();
        outcome
    }
}

impl Default for OnceSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// 构建线程 panic 时重置槽位并唤醒等待者
struct BuildGuard<'a> {
    slot: &'a OnceSlot,
    armed: bool,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.slot.state.lock() = State::Empty;
            self.slot.ready.notify_all();
        }
    }
}
