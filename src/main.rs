// ==========================================
// TIKTUY 批量导入 - 命令行入口
// ==========================================
// 用法:
//   tiktuy-import preview <file> [orders|products]
//   tiktuy-import commit <file> [orders|products] [--courier <id>]
//
// 环境变量: TIKTUY_API_TOKEN / TIKTUY_ROLE / TIKTUY_API_URL / TIKTUY_LOCALE
// ==========================================

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tiktuy_import::api::TiktuyApiClient;
use tiktuy_import::config::{config_keys, ClientConfig, ConfigManager};
use tiktuy_import::domain::{ImportKind, OrderGroup, ProductRow, ReferenceSets, Role};
use tiktuy_import::i18n::{self, t_with_args};
use tiktuy_import::importer::{
    find_duplicate_orders, ImportServices, ImportTarget, LocalPreviewSource, PreviewRow,
    PreviewSource, ReferenceLoader, ReviewSession, SpreadsheetFile,
};
use tiktuy_import::{logging, OrderImportWorkflow, ProductImportWorkflow, Session};
use tracing::info;

enum Command {
    Preview {
        file: PathBuf,
        kind: ImportKind,
    },
    Commit {
        file: PathBuf,
        kind: ImportKind,
        courier: Option<i64>,
    },
}

const USAGE: &str = "用法: tiktuy-import <preview|commit> <file> [orders|products] [--courier <id>]";

fn parse_args(args: Vec<String>) -> anyhow::Result<Command> {
    let mut args = args.into_iter();
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let file = args.next().map(PathBuf::from).ok_or_else(|| anyhow!(USAGE))?;

    let mut kind = ImportKind::Orders;
    let mut courier = None;
    while let Some(arg) = args.next() {
        if arg == "--courier" {
            let raw = args.next().ok_or_else(|| anyhow!("--courier 缺少参数"))?;
            courier = Some(
                raw.trim()
                    .parse::<i64>()
                    .with_context(|| format!("courier 无效: {}", raw))?,
            );
        } else {
            kind = ImportKind::parse(&arg).ok_or_else(|| anyhow!("未知导入类型: {}", arg))?;
        }
    }

    match command.as_str() {
        "preview" => Ok(Command::Preview { file, kind }),
        "commit" => Ok(Command::Commit {
            file,
            kind,
            courier,
        }),
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }
}

/// 从环境变量构造会话（无令牌时返回 None）
fn session_from_env() -> Option<Session> {
    let token = std::env::var(config_keys::API_TOKEN)
        .ok()
        .filter(|t| !t.trim().is_empty())?;
    let role = std::env::var(config_keys::ROLE)
        .ok()
        .and_then(|r| Role::parse(&r))
        .unwrap_or(Role::Ecommerce);
    Some(Session::new(token.trim(), role))
}

/// 行级报告
fn row_report<T: PreviewRow>(review: &ReviewSession<T>) -> Vec<Value> {
    review
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let outcome = row.validation();
            json!({
                "row": idx + 1,
                "valid": outcome.valid,
                "errors": outcome
                    .issues
                    .iter()
                    .map(|issue| json!({ "code": issue.code(), "message": issue.message() }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect()
}

fn failed_sources(refs: &ReferenceSets) -> Vec<String> {
    refs.failed_sources()
        .into_iter()
        .map(|(kind, message)| {
            t_with_args(
                "import.reference_failed",
                &[("source", kind.to_string().as_str()), ("message", message.as_str())],
            )
        })
        .collect()
}

fn review_report<T: PreviewRow>(kind: ImportKind, review: &ReviewSession<T>) -> Value {
    json!({
        "kind": kind,
        "state": review.state().to_string(),
        "summary": review.summary(),
        "rows": row_report(review),
        "failed_sources": failed_sources(review.refs()),
    })
}

/// 本地预览: 本地解析 + （有令牌时）远端参照数据
async fn run_preview(config: &ClientConfig, file: PathBuf, kind: ImportKind) -> anyhow::Result<()> {
    let file = SpreadsheetFile::from_path(&file).map_err(|e| anyhow!(e.user_message()))?;
    file.ensure_supported().map_err(|e| anyhow!(e.user_message()))?;

    let session = session_from_env();
    let refs = match &session {
        Some(session) => {
            let client = TiktuyApiClient::new(config).map_err(|e| anyhow!(e.user_message()))?;
            ReferenceLoader::new(&client).load(session).await
        }
        None => {
            info!("未设置 {}，跳过参照数据加载", config_keys::API_TOKEN);
            ReferenceSets::default()
        }
    };

    let source = LocalPreviewSource::default();
    let offline = Session::new("", Role::Ecommerce);
    let session = session.unwrap_or(offline);

    let report = match kind {
        ImportKind::Orders => {
            let mut review: ReviewSession<OrderGroup> = ReviewSession::new();
            let ticket = review.begin_loading().map_err(|e| anyhow!(e.to_string()))?;
            let groups = source
                .preview_orders(&session, &file)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            review.finish_loading(ticket, groups, refs);

            let mut report = review_report(kind, &review);
            report["duplicates"] = json!(find_duplicate_orders(review.rows()));
            report
        }
        ImportKind::Products => {
            let mut review: ReviewSession<ProductRow> = ReviewSession::new();
            let ticket = review.begin_loading().map_err(|e| anyhow!(e.to_string()))?;
            let rows = source
                .preview_products(&session, &file)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            review.finish_loading(ticket, rows, refs);
            review_report(kind, &review)
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// 完整流程: 后端预览 → 校验 → 提交
async fn run_commit(
    config: &ClientConfig,
    file: PathBuf,
    kind: ImportKind,
    courier: Option<i64>,
) -> anyhow::Result<()> {
    let session = session_from_env()
        .ok_or_else(|| anyhow!("需要设置 {}", config_keys::API_TOKEN))?;
    let file = SpreadsheetFile::from_path(&file).map_err(|e| anyhow!(e.user_message()))?;

    let client = Arc::new(TiktuyApiClient::new(config).map_err(|e| anyhow!(e.user_message()))?);
    let services = ImportServices {
        preview: client.clone(),
        references: client.clone(),
        backend: client,
        rules: Arc::new(config.clone()),
    };

    let summary = match kind {
        ImportKind::Orders => {
            let mut workflow = OrderImportWorkflow::new(services);
            workflow
                .open(&session, file)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;

            let mut target = ImportTarget::for_session(&session);
            if let Some(id) = courier {
                target = target.with_courier(id);
            }
            match workflow.submit(&session, &target).await {
                Ok(summary) => summary,
                Err(e) => {
                    eprintln!("{}", serde_json::to_string_pretty(&review_report(kind, workflow.review()))?);
                    bail!(e.user_message());
                }
            }
        }
        ImportKind::Products => {
            let mut workflow = ProductImportWorkflow::new(services);
            workflow
                .open(&session, file)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;

            match workflow.submit(&session).await {
                Ok(summary) => summary,
                Err(e) => {
                    eprintln!("{}", serde_json::to_string_pretty(&review_report(kind, workflow.review()))?);
                    bail!(e.user_message());
                }
            }
        }
    };

    println!(
        "{}",
        t_with_args(
            "submit.success",
            &[("count", summary.inserted.to_string().as_str())]
        )
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let command = parse_args(std::env::args().skip(1).collect())?;
    let config = ConfigManager::load().map_err(|e| anyhow!("配置加载失败: {}", e))?;
    i18n::set_locale(&config.locale);

    info!(version = tiktuy_import::VERSION, "{}", tiktuy_import::APP_NAME);

    match command {
        Command::Preview { file, kind } => run_preview(&config, file, kind).await,
        Command::Commit {
            file,
            kind,
            courier,
        } => run_commit(&config, file, kind, courier).await,
    }
}
