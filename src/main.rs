// ==========================================
// 多节点补货计划系统 - 命令行入口
// ==========================================
// 子命令: init-db（建表） / plan（执行一次计划运行）
// 参数优先级: 命令行 > config_kv > 默认值
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use replenishment_planner::api::{export_report, PlanningRequest, PlanningService};
use replenishment_planner::config::{ConfigManager, PlanningConfig};
use replenishment_planner::db::{get_default_db_path, init_schema, open_sqlite_connection, read_schema_version};
use replenishment_planner::importer::FileSnapshotSource;
use replenishment_planner::repository::{PlanResultRepository, PlanResultSink, PlanningDataSource, SqlitePlanningSource};
use replenishment_planner::{logging, APP_NAME, VERSION};

#[derive(Parser)]
#[command(
    name = "replenishment-planner",
    about = "多节点补货计划: 库存推演与补货收敛",
    version,
    propagate_version = true
)]
struct Cli {
    /// 数据库路径（默认: REPLENISHMENT_PLANNER_DB_PATH 或用户数据目录）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 输出 debug 日志（RUST_LOG 优先）
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化数据库（建表,幂等）
    InitDb,

    /// 执行一次计划运行
    Plan(PlanArgs),
}

#[derive(Args)]
struct PlanArgs {
    /// 计划范围（供应商/计划组）
    #[arg(long)]
    scope: String,

    /// 消耗加成（0.15 = +15%）
    #[arg(long)]
    boost: Option<f64>,

    /// 从快照目录读取输入（CSV/XLSX）,不指定时读取数据库
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// 预测天数
    #[arg(long)]
    horizon: Option<u32>,

    /// 截止星期（0=周一 ... 6=周日）
    #[arg(long)]
    cutoff: Option<u32>,

    /// 最大迭代次数
    #[arg(long)]
    max_iterations: Option<u32>,

    /// 不将可见库存截断为 0
    #[arg(long)]
    no_clamp: bool,

    /// 运行日期（YYYY-MM-DD,默认今天）
    #[arg(long)]
    today: Option<NaiveDate>,

    /// 排除物料（逗号分隔）
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// 执行调拨/工厂直供/制造批次/分配
    #[arg(long)]
    with_manufacturing: bool,

    /// CSV 导出目录
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// 不写入结果表
    #[arg(long)]
    no_persist: bool,
}

impl PlanArgs {
    /// 命令行覆写
    fn apply(&self, config: &mut PlanningConfig) {
        if let Some(boost) = self.boost {
            config.consumption_boost = boost;
        }
        if let Some(horizon) = self.horizon {
            config.horizon_days = horizon;
        }
        if let Some(cutoff) = self.cutoff {
            config.cutoff_weekday = cutoff;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if self.no_clamp {
            config.clamp_to_zero = false;
        }
        if self.today.is_some() {
            config.today = self.today;
        }
        if !self.exclude.is_empty() {
            config.excluded_items = self.exclude.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);

    info!(version = VERSION, db_path = %db_path, "{}", APP_NAME);

    let conn = open_sqlite_connection(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("建表失败")?;

    match cli.command {
        Commands::InitDb => {
            let version = read_schema_version(&conn)?;
            println!("数据库已初始化: {} (schema_version={:?})", db_path, version);
            Ok(())
        }
        Commands::Plan(args) => run_plan(Arc::new(Mutex::new(conn)), args).await,
    }
}

async fn run_plan(conn: Arc<Mutex<rusqlite::Connection>>, args: PlanArgs) -> anyhow::Result<()> {
    let config_manager = ConfigManager::from_connection(conn.clone());
    let mut config = config_manager.load_planning_config()?;
    args.apply(&mut config);

    let source: Arc<dyn PlanningDataSource> = match &args.input_dir {
        Some(dir) => Arc::new(FileSnapshotSource::new(dir.clone())),
        None => Arc::new(SqlitePlanningSource::from_connection(conn.clone())),
    };
    let sink: Option<Arc<dyn PlanResultSink>> = if args.no_persist {
        None
    } else {
        Some(Arc::new(PlanResultRepository::from_connection(conn)))
    };

    let request = PlanningRequest {
        scope_id: args.scope.clone(),
        config,
        with_manufacturing: args.with_manufacturing,
    };
    let report = PlanningService::new(source, sink).run(&request).await?;

    println!("run_id:      {}", report.run_id);
    println!("scope:       {}", report.scope_id);
    println!("outcome:     {}", report.outcome);
    println!("iterations:  {}", report.iterations);
    println!("orders:      {}", report.order_count());
    if let Some(warning) = &report.warning {
        println!("warning:     {}", warning);
    }
    if let Some(plan) = &report.manufacturing {
        println!("mfg orders:  {}", plan.manufacturing_orders.len());
        println!("allocations: {}", plan.all_deliveries().len());
    }

    if let Some(out_dir) = &args.out_dir {
        for path in export_report(&report, out_dir)? {
            println!("written:     {}", path.display());
        }
    }
    Ok(())
}
