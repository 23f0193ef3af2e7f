//! 优雅关闭
//!
//! 监听 Ctrl+C / SIGTERM，取消 CancellationToken；HTTP 服务据此停止接受新请求，对话记录在退出前落盘。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// 关闭信号管理器
#[derive(Clone, Default)]
pub struct ShutdownManager {
    shutdown_token: CancellationToken,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取关闭 token（用于取消正在进行的任务）
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                manager.shutdown();
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                    manager.shutdown();
                }
            });
        }
    }
}
