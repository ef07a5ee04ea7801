// ==========================================
// 商品同步连接器 - 命令行入口
// ==========================================
// 职责: 后端登记 / 提交导入任务 / 运行任务执行器 / 查看队列与检查点
// ==========================================

use anyhow::{Context, Result};
use catalog_sync::config::{resolve_db_path, ConfigManager};
use catalog_sync::db::{open_shared, SharedConnection};
use catalog_sync::domain::{ModelName, NewBackend};
use catalog_sync::importer::ExtensionRegistry;
use catalog_sync::jobs::{
    http_adapter_provider, ConnectorJob, JobQueue, JobRunner, JobStatus, PRIORITY_DEFAULT,
    PRIORITY_MEDIUM,
};
use catalog_sync::repository::{BackendRepository, CheckpointRepository};
use catalog_sync::{logging, VERSION};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "catalog-sync", version, about = "电商平台商品同步连接器")]
struct Cli {
    /// 数据库路径（默认: CATALOG_SYNC_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<String>,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true, default_value_t = false)]
    json_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// 初始化数据库 schema
    InitDb,
    /// 后端管理
    Backend {
        #[command(subcommand)]
        command: BackendCommands,
    },
    /// 提交增量导入分类与商品任务
    ImportProducts {
        #[arg(long)]
        backend: i64,
        /// 只导入该时间之后更新的记录（默认取上次导入时间）
        #[arg(long)]
        since: Option<String>,
    },
    /// 提交单个商品导入任务
    ImportProduct {
        #[arg(long)]
        backend: i64,
        /// 远程商品 id
        id: String,
    },
    /// 提交库存导入任务
    ImportInventory {
        #[arg(long)]
        backend: i64,
    },
    /// 提交商品供应商信息同步任务
    ImportSupplierinfo {
        #[arg(long)]
        backend: i64,
        /// 远程商品 id
        id: String,
    },
    /// 运行任务执行器
    Work {
        /// 处理完当前队列后退出
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// 打印队列统计
    QueueStats,
    /// 取消待执行的任务
    CancelJob {
        /// 任务 id
        job_id: String,
    },
    /// 打印待复核的检查点
    Checkpoints {
        #[arg(long)]
        backend: i64,
        /// 包含已复核的检查点
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum BackendCommands {
    /// 登记新后端
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        api_url: String,
        #[arg(long)]
        api_key: String,
        #[arg(long, default_value_t = 1)]
        company_id: i64,
        /// 多语言字段取值所用语言 id
        #[arg(long)]
        language_id: Option<String>,
        /// 后端价格含税
        #[arg(long, default_value_t = false)]
        taxes_included: bool,
        #[arg(long, default_value_t = 1)]
        stock_location_id: i64,
    },
    /// 列出已登记的后端
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }

    let db_path = resolve_db_path(cli.db.as_deref());
    tracing::info!(version = VERSION, db_path = %db_path, "商品同步连接器启动");
    let conn = open_shared(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;

    match cli.command {
        Commands::InitDb => {
            println!("数据库已初始化: {}", db_path);
        }
        Commands::Backend { command } => run_backend_command(conn, command)?,
        Commands::ImportProducts { backend, since } => {
            let stored = BackendRepository::from_connection(conn.clone())
                .get(backend)?
                .import_products_since;
            let since = since.or(stored);
            submit(&conn, backend, &ConnectorJob::ImportProducts { since }, PRIORITY_DEFAULT)?;
        }
        Commands::ImportProduct { backend, id } => {
            let job = ConnectorJob::ImportRecord {
                model: ModelName::ProductTemplate,
                remote_id: id,
                record: None,
            };
            submit(&conn, backend, &job, PRIORITY_MEDIUM)?;
        }
        Commands::ImportInventory { backend } => {
            submit(&conn, backend, &ConnectorJob::ImportInventory, PRIORITY_DEFAULT)?;
        }
        Commands::ImportSupplierinfo { backend, id } => {
            let job = ConnectorJob::ImportSupplierInfo { product_id: id };
            submit(&conn, backend, &job, PRIORITY_DEFAULT)?;
        }
        Commands::Work { once } => run_worker(conn, once).await?,
        Commands::QueueStats => {
            let stats = open_queue(&conn)?.get_queue_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::CancelJob { job_id } => {
            if open_queue(&conn)?.cancel_job(&job_id)? {
                println!("任务已取消: {}", job_id);
            } else {
                println!("任务不存在或已不在待执行状态: {}", job_id);
            }
        }
        Commands::Checkpoints { backend, all } => {
            let checkpoints = CheckpointRepository::from_connection(conn).list(backend, !all)?;
            println!("{}", serde_json::to_string_pretty(&checkpoints)?);
        }
    }
    Ok(())
}

fn run_backend_command(conn: SharedConnection, command: BackendCommands) -> Result<()> {
    let repo = BackendRepository::from_connection(conn);
    match command {
        BackendCommands::Add {
            name,
            api_url,
            api_key,
            company_id,
            language_id,
            taxes_included,
            stock_location_id,
        } => {
            let id = repo.create(&NewBackend {
                name,
                api_url,
                api_key,
                company_id,
                language_id,
                taxes_included,
                stock_location_id,
            })?;
            println!("后端已登记: id={}", id);
        }
        BackendCommands::List => {
            for backend in repo.list()? {
                println!(
                    "{}\t{}\t{}\tsince={}",
                    backend.id,
                    backend.name,
                    backend.api_url,
                    backend.import_products_since.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

fn open_queue(conn: &SharedConnection) -> Result<JobQueue> {
    let max_retries = ConfigManager::from_connection(conn.clone()).max_retries()?;
    Ok(JobQueue::new(conn.clone(), max_retries)?)
}

fn submit(conn: &SharedConnection, backend_id: i64, job: &ConnectorJob, priority: i32) -> Result<()> {
    BackendRepository::from_connection(conn.clone()).get(backend_id)?;
    let job_id = open_queue(conn)?.enqueue(backend_id, job, priority)?;
    println!("任务已提交: {} ({})", job_id, job.kind());
    Ok(())
}

async fn run_worker(conn: SharedConnection, once: bool) -> Result<()> {
    let config = ConfigManager::from_connection(conn.clone());
    let snapshot = config.get_config_snapshot()?;
    tracing::info!(config = ?snapshot, "任务执行器配置");

    let queue = open_queue(&conn)?;
    queue.requeue_running()?;

    let adapters = http_adapter_provider(config.http_timeout_ms()?, config.http_user_agent()?);
    let extensions = Arc::new(ExtensionRegistry::from_inventory());
    tracing::info!(extensions = ?extensions.names(), "映射扩展已加载");
    let runner = JobRunner::new(conn.clone(), queue, adapters, extensions)
        .with_page_size(config.page_size()?);

    if once {
        let outcomes = runner.process_all().await?;
        let failed = outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
            .count();
        println!("已处理任务: {}，失败: {}", outcomes.len(), failed);
        return Ok(());
    }

    let poll_interval = Duration::from_millis(config.poll_interval_ms()?);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到中断信号，任务执行器退出");
                break;
            }
            next = runner.process_next() => {
                if next?.is_none() {
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
    Ok(())
}
