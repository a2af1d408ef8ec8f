// ==========================================
// 智能配送路由系统 - 命令行入口
// ==========================================
// 用法:
//   smart-routing run --input stops.xlsx --trucks 3 [--driver 名称]... [--output out.csv]
//   smart-routing config [--config path]    输出生效配置(API Key 脱敏)
// ==========================================

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use smart_routing::config::ConfigManager;
use smart_routing::domain::{DriverRoster, Stop, StopStatus, WorkflowPhase};
use smart_routing::engine::{FixOutcome, FixRequest, WorkflowContext};
use smart_routing::export::{truck_summary, CsvExporter, ExportSink};
use smart_routing::{logging, DispatchApi};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "smart-routing", version, about = "配送站点地址解析与车辆分配")]
struct Cli {
    /// 以 JSON 行格式输出日志
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 导入 → 解析 → 修正 → 分配 → 导出
    Run(RunArgs),
    /// 输出生效配置
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// 站点文件 (.xlsx / .xls / .csv)
    #[arg(long, short)]
    input: PathBuf,

    /// 车辆数
    #[arg(long, short)]
    trucks: usize,

    /// 司机名称(按车辆顺序,可重复)
    #[arg(long = "driver")]
    drivers: Vec<String>,

    /// 配置文件 (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 导出 CSV 路径
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// 调度起点地址(默认取配置)
    #[arg(long)]
    dispatch: Option<String>,

    /// 已解析站点需逐个确认
    #[arg(long)]
    explicit_confirm: bool,

    /// 非交互模式: 自动采用第一个候选地址,确认全部已解析站点
    #[arg(long)]
    non_interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Config { config } => {
            let manager = ConfigManager::load(config.as_deref()).context("加载配置失败")?;
            println!("{}", manager.snapshot());
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    if args.trucks == 0 {
        bail!("--trucks 必须 >= 1");
    }

    let manager = ConfigManager::load(args.config.as_deref()).context("加载配置失败")?;
    let mut config = manager.config().clone();
    if args.explicit_confirm {
        config.workflow.require_explicit_confirmation = true;
    }

    info!("==================================================");
    info!("{} v{}", smart_routing::APP_NAME, smart_routing::VERSION);
    info!("==================================================");

    let api = DispatchApi::from_config(config)?;
    let mut ctx = api.ingest_file(&args.input)?;
    println!("已导入 {} 个站点", ctx.stops().len());

    // Ctrl-C 中止批量解析
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let summary = api.resolve_all(&mut ctx, &cancel).await?;
    if summary.cancelled {
        bail!("解析已中止: 已处理 {} 个站点,{} 个未处理", summary.attempted, summary.skipped);
    }
    println!(
        "解析完成: 成功 {} / 需修正 {}",
        summary.resolved, summary.needs_fix
    );

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    if args.non_interactive {
        auto_fix(&api, &mut ctx).await?;
    } else {
        interactive_fix(&api, &mut ctx, &mut stdin).await?;
    }

    if ctx.policy().require_explicit_confirmation {
        confirm_resolved(&api, &mut ctx, &mut stdin, args.non_interactive).await?;
    }

    if ctx.phase() != WorkflowPhase::AllConfirmed {
        let counts = ctx.counts();
        bail!(
            "仍有站点未确认 (需修正 {}, 待确认 {}, 失败 {})",
            counts.needs_fix,
            counts.resolved,
            counts.failed
        );
    }

    let assignment = api.assign(&mut ctx, args.trucks)?;
    let roster = if args.drivers.is_empty() {
        DriverRoster::numbered(args.trucks)
    } else {
        DriverRoster::from_names(&args.drivers, args.trucks)
    };

    match api.resolve_dispatch_point(args.dispatch.as_deref()).await {
        Ok(point) => println!(
            "调度起点: {} ({:.6}, {:.6})",
            point.label, point.coordinates.latitude, point.coordinates.longitude
        ),
        Err(e) => warn!(error = %e, "调度起点无法解析,继续输出分配结果"),
    }

    let rows = api.export_rows(&ctx, &roster)?;
    println!("分配完成: {} 个站点 → {} 辆车", assignment.len(), args.trucks);
    for (truck, driver, stops, weight) in truck_summary(&rows) {
        println!("  车辆 {} ({}): {} 个站点, {:.1} kg", truck, driver, stops, weight);
    }

    if let Some(output) = args.output {
        let exporter = CsvExporter::new(&output);
        exporter.export(&rows)?;
        println!("已导出: {}", output.display());
    }

    Ok(())
}

fn print_stop(stop: &Stop) {
    println!();
    println!("[{}] {} - {}", stop.id, stop.client, stop.raw_address);
    if stop.suggestions.is_empty() {
        println!("  (无候选地址)");
    }
    for (idx, suggestion) in stop.suggestions.iter().enumerate() {
        println!("  {}. {}", idx + 1, suggestion);
    }
}

/// 交互修正: 输入候选编号 / 手工地址;空行跳过本轮,q 退出
async fn interactive_fix(
    api: &DispatchApi,
    ctx: &mut WorkflowContext,
    stdin: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    loop {
        let pending: Vec<Stop> = ctx
            .stops_with_status(StopStatus::NeedsFix)
            .into_iter()
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        println!();
        println!("{} 个站点需要修正", pending.len());
        let mut submitted = 0;

        for stop in pending {
            print_stop(&stop);
            println!("输入候选编号或新地址 (回车跳过, q 退出):");

            let Some(line) = stdin.next_line().await? else {
                return Ok(());
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input.eq_ignore_ascii_case("q") {
                return Ok(());
            }

            let request = match input.parse::<usize>() {
                Ok(n) if n >= 1 && n <= stop.suggestions.len() => FixRequest::Suggestion(n - 1),
                _ => FixRequest::Manual(input.to_string()),
            };

            match api.submit_fix(ctx, stop.id, request).await {
                Ok(outcome) => {
                    submitted += 1;
                    report_fix(&outcome);
                }
                Err(e) => println!("  修正无效: {}", e),
            }
        }

        if submitted == 0 {
            return Ok(());
        }
    }
}

/// 非交互修正: 每个站点采用第一个候选地址(仅一轮)
async fn auto_fix(api: &DispatchApi, ctx: &mut WorkflowContext) -> Result<()> {
    let candidates: Vec<_> = ctx
        .stops_with_status(StopStatus::NeedsFix)
        .into_iter()
        .filter(|s| !s.suggestions.is_empty())
        .map(|s| s.id)
        .collect();

    for id in &candidates {
        api.stage_fix(ctx, *id, FixRequest::Suggestion(0))?;
    }
    for outcome in api.apply_staged_fixes(ctx).await? {
        report_fix(&outcome);
    }
    Ok(())
}

async fn confirm_resolved(
    api: &DispatchApi,
    ctx: &mut WorkflowContext,
    stdin: &mut Lines<BufReader<Stdin>>,
    non_interactive: bool,
) -> Result<()> {
    let resolved = ctx.stops_with_status(StopStatus::Resolved);
    if resolved.is_empty() {
        return Ok(());
    }

    if !non_interactive {
        println!();
        for stop in &resolved {
            println!(
                "[{}] {} → {}",
                stop.id,
                stop.raw_address,
                stop.resolved_address().unwrap_or_default()
            );
        }
        println!("确认以上 {} 个站点? [Y/n]", resolved.len());
        let answer = stdin.next_line().await?.unwrap_or_default();
        if answer.trim().eq_ignore_ascii_case("n") {
            return Ok(());
        }
    }

    let confirmed = api.confirm_all(ctx)?;
    println!("已确认 {} 个站点", confirmed);
    Ok(())
}

fn report_fix(outcome: &FixOutcome) {
    match outcome {
        FixOutcome::Resolved { stop, location } => println!("  {} 已解析: {}", stop, location.label),
        FixOutcome::StillUnresolved { stop, attempts } => {
            println!("  {} 仍无法解析 (已尝试 {} 次)", stop, attempts)
        }
        FixOutcome::Failed { stop, attempts } => {
            println!("  {} 已放弃 (尝试 {} 次达到上限)", stop, attempts)
        }
    }
}
