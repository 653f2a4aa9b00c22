use crate::error::{Result, WqbError};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// 外部取消信号
///
/// 所有轮询、等待、退避都经过这里，保证长批次可以在任意等待点被打断。
/// 发送端被丢弃视为永不取消。
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// 配套的发送端，`send(true)` 即取消
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(rx))
    }

    pub fn never() -> Self {
        let (_tx, signal) = Self::channel();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消发生；发送端已丢弃时永远挂起
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// 可取消的睡眠
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return self.check();
        }
        self.run(tokio::time::sleep(duration)).await
    }

    /// 可取消地执行一个 future（例如一次阻塞的轮询请求）
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        self.check()?;
        tokio::select! {
            out = fut => Ok(out),
            _ = self.cancelled() => Err(WqbError::Cancelled),
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(WqbError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
