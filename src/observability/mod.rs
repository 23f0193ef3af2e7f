//! 可观测性：tracing 订阅者初始化（默认 info，可通过 RUST_LOG 覆盖）

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = match "info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
