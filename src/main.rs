//! 程序入口：初始化日志、加载配置，把命令行参数中的文件逐个打开到工作区面板中处理

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::fmt::SubscriberBuilder;

use juzhen_geshihua::model::json_tree::JsonTreeRow;
use juzhen_geshihua::model::search::{find_matches, match_lines};
use juzhen_geshihua::utils::fs::{detect_format, display_name, read_text_file};
use juzhen_geshihua::vm::bridge::*;
use juzhen_geshihua::{Config, DocFormat, LargeDocPolicy, Panel, ViewMode, Workspace};

#[derive(Parser, Debug)]
#[command(name = "juzhen_geshihua", version, about = "JSON/XML 多面板格式化工具")]
struct Cli {
    /// JSON 配置文件（大文件阈值、日志级别）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 美化或压缩文件，每个文件占一个面板（最多3个）
    Format {
        files: Vec<PathBuf>,
        /// 压缩而不是美化
        #[arg(long)]
        minify: bool,
        /// 强制指定格式，缺省按扩展名/内容识别
        #[arg(long = "as", value_enum)]
        format: Option<FormatArg>,
    },
    /// 以树视图显示文件
    Tree {
        file: PathBuf,
        /// 全部折叠（仅JSON）
        #[arg(long)]
        collapse: bool,
        #[arg(long = "as", value_enum)]
        format: Option<FormatArg>,
    },
    /// 在文件中搜索（忽略大小写的子串匹配）
    Search {
        file: PathBuf,
        query: String,
        /// 在树视图的呈现内容中搜索
        #[arg(long)]
        tree: bool,
        #[arg(long = "as", value_enum)]
        format: Option<FormatArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Json,
    Xml,
}

impl From<FormatArg> for DocFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => DocFormat::Json,
            FormatArg::Xml => DocFormat::Xml,
        }
    }
}

/// 读取文件并打开为新面板；面板已满时返回 None
fn open_file<'a>(
    ws: &'a mut Workspace,
    path: &Path,
    forced: Option<FormatArg>,
) -> anyhow::Result<Option<&'a mut Panel>> {
    let text = read_text_file(path).with_context(|| format!("读取 {} 失败", path.display()))?;
    let format = forced
        .map(DocFormat::from)
        .unwrap_or_else(|| detect_format(path, &text));
    let panel = ws.open_document(display_name(path), text, format);
    if panel.is_none() {
        tracing::warn!("{}，跳过 {}", STATUS_PANEL_LIMIT, path.display());
    }
    Ok(panel)
}

/// 逐个处理文件；单个文件读取或格式化失败只计数，不影响后续文件
fn run_format(ws: &mut Workspace, files: &[PathBuf], minify: bool, forced: Option<FormatArg>) -> anyhow::Result<()> {
    let mut failures = 0;
    for path in files {
        let panel = match open_file(ws, path, forced) {
            Ok(Some(panel)) => panel,
            Ok(None) => continue,
            Err(e) => {
                failures += 1;
                eprintln!("{}", error_status(&format!("{:#}", e)));
                continue;
            }
        };
        let result = if minify { panel.minify() } else { panel.format() };
        match result {
            Ok(()) => {
                if files.len() > 1 {
                    println!("== {} ==", panel.title);
                }
                println!("{}", panel.raw_text);
                tracing::info!("{}: {}", panel.title, if minify { STATUS_MINIFIED } else { STATUS_FORMATTED });
            }
            Err(e) => {
                failures += 1;
                eprintln!("{}: {}", panel.title, error_status(&e));
            }
        }
    }
    tracing::debug!("{}", tab_bar(ws));
    if failures > 0 {
        bail!("{} 个文件处理失败", failures);
    }
    Ok(())
}

fn print_json_rows(rows: &[JsonTreeRow]) {
    for row in rows.iter().filter(|r| r.visible) {
        let marker = if row.children == 0 {
            " "
        } else if row.expanded {
            "▾"
        } else {
            "▸"
        };
        println!("{}{} {}: {}", "  ".repeat(row.depth as usize), marker, row.name, row.preview);
    }
}

fn run_tree(
    ws: &mut Workspace,
    file: &Path,
    collapse: bool,
    forced: Option<FormatArg>,
    policy: &LargeDocPolicy,
) -> anyhow::Result<()> {
    let Some(panel) = open_file(ws, file, forced)? else {
        return Ok(());
    };
    panel.set_collapse_all(collapse);
    if panel.should_warn_large(policy) {
        tracing::warn!("{}: {}", panel.title, STATUS_LARGE_FILE);
    }
    panel.set_mode(ViewMode::Tree).map_err(|e| anyhow::anyhow!(error_status(&e)))?;

    match panel.selected_format {
        DocFormat::Json => {
            if let Some(rows) = panel.json_rows() {
                print_json_rows(&rows);
            }
        }
        DocFormat::Xml => println!("{}", panel.rendered_content()),
    }
    eprintln!("{}", panel_status(panel, policy));
    Ok(())
}

fn run_search(
    ws: &mut Workspace,
    file: &Path,
    query: &str,
    tree: bool,
    forced: Option<FormatArg>,
    policy: &LargeDocPolicy,
) -> anyhow::Result<()> {
    let Some(panel) = open_file(ws, file, forced)? else {
        return Ok(());
    };
    if tree {
        panel.set_mode(ViewMode::Tree).map_err(|e| anyhow::anyhow!(error_status(&e)))?;
    }
    panel.set_search_input(query);
    let total = panel.commit_search();

    let content = panel.rendered_content();
    let ranges = find_matches(&content, &panel.active_search_query);
    for (i, hit) in match_lines(&content, &ranges).iter().enumerate() {
        println!("{}/{} 行 {}: {}", i + 1, total, hit.line_no, hit.line.trim());
    }
    eprintln!("{}", panel_status(panel, policy));
    Ok(())
}

/// 日志初始化之后再报告配置来源，之前的日志事件没有订阅者会被丢弃
fn report_config(path: Option<&Path>, config: &Config) {
    match path {
        Some(p) => tracing::info!("配置已加载: {}", p.display()),
        None => tracing::debug!("未指定配置文件，使用默认配置"),
    }
    tracing::debug!(
        "大文件阈值: {} 字节 / {} 个节点",
        config.large_text_bytes,
        config.large_node_count
    );
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;

    // 初始化日志输出（写到 stderr，stdout 只留结果）
    let _ = SubscriberBuilder::default()
        .with_max_level(config.tracing_level()?)
        .with_writer(std::io::stderr)
        .try_init();
    report_config(cli.config.as_deref(), &config);
    tracing::debug!("{}", STATUS_READY);

    let policy = config.large_doc_policy();
    let mut ws = Workspace::new();
    match cli.command {
        Command::Format { files, minify, format } => run_format(&mut ws, &files, minify, format),
        Command::Tree { file, collapse, format } => run_tree(&mut ws, &file, collapse, format, &policy),
        Command::Search { file, query, tree, format } => {
            run_search(&mut ws, &file, &query, tree, format, &policy)
        }
    }
}
