//! Banyan Server - 家谱管理系统服务端
//!
//! # 架构概述
//!
//! 本模块是 Banyan Server 的主入口，提供以下核心功能：
//!
//! - **数据库** (`db`): 嵌入式 SQLite 存储 (sqlx, WAL 模式)
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **HTTP API** (`api`): RESTful API 接口 (家谱/成员/上传)
//!
//! # 模块结构
//!
//! ```text
//! banyan-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

pub fn print_banner() {
    println!(
        r#"
    ____
   / __ )____ _____  __  ______ _____
  / __  / __ `/ __ \/ / / / __ `/ __ \
 / /_/ / /_/ / / / / /_/ / /_/ / / / /
/_____/\__,_/_/ /_/\__, /\__,_/_/ /_/
                  /____/
    "#
    );
}
