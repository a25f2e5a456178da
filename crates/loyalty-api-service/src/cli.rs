//! 命令行参数
//!
//! 参数优先级最高，覆盖配置文件与环境变量中的同名设置

use clap::Parser;
use loyalty_shared::config::AppConfig;
use loyalty_shared::error::Result;

/// 积分账本服务
#[derive(Parser, Debug, Default)]
#[command(name = "loyalty-api")]
#[command(version, about = "积分账本 HTTP 服务与对账 Worker")]
pub struct Cli {
    /// 服务监听地址，如 `localhost:8080` 或 `:8080`
    #[arg(short = 'a', long = "address")]
    pub address: Option<String>,

    /// PostgreSQL 连接串
    #[arg(short = 'd', long = "database-uri")]
    pub database_uri: Option<String>,

    /// 积分计算系统地址
    #[arg(short = 'r', long = "accrual-address")]
    pub accrual_address: Option<String>,
}

impl Cli {
    /// 把命令行参数覆盖到已加载的配置上
    pub fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(address) = &self.address {
            config.server.set_address(address)?;
        }
        if let Some(uri) = &self.database_uri {
            config.database.url = uri.clone();
        }
        if let Some(addr) = &self.accrual_address {
            config.accrual.base_url = addr.clone();
        }
        Ok(())
    }
}
