//! 日志初始化
//!
//! `RUST_LOG` 优先于配置中的 `log.level`

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// 初始化全局 tracing subscriber
///
/// `extra_directives` 追加在默认过滤规则之后，例如 `tower_http=debug`
pub fn init_tracing(log: &LogConfig, extra_directives: &[&str]) {
    let mut directives = vec![log.level.clone(), format!("imagine={}", log.level)];
    directives.extend(extra_directives.iter().map(|d| d.to_string()));
    let default_filter = directives.join(",");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&default_filter));

    if log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
