//! 核心：错误类型与优雅关闭

pub mod error;
pub mod shutdown;

pub use error::{PrecinctError, Result};
pub use shutdown::ShutdownManager;
