use clap::Parser;
use hsse_etl::config::{Command, UserCommand};
use hsse_etl::core::assistant;
use hsse_etl::core::dashboard::{self, DashboardStats};
use hsse_etl::core::importer::ImportSummary;
use hsse_etl::core::records::{self, RecordFilter, RecordView};
use hsse_etl::core::users::{UserAdmin, UserStats};
use hsse_etl::core::{ConfigProvider, Record, SessionProvider};
use hsse_etl::utils::error::ErrorSeverity;
use hsse_etl::utils::{logger, validation::Validate};
use hsse_etl::{
    Assistant, BackendClient, CliConfig, HsseError, HttpChatClient, ImportEngine, LocalStorage, TomlConfig,
};

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(e: &HsseError) -> i32 {
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    exit_code(e.severity())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting hsse-etl");
    if cli.verbose {
        tracing::debug!("CLI arguments: {:?}", cli);
    }

    let config = match TomlConfig::from_file(&cli.config).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration from {} is unusable: {}", cli.config.display(), e);
            std::process::exit(report_failure(&e));
        }
    };

    if let Err(e) = run(cli, config).await {
        let code = report_failure(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}

async fn run(cli: CliConfig, config: TomlConfig) -> hsse_etl::Result<()> {
    let backend = BackendClient::from_config(&config)?;

    match cli.command {
        Command::Import {
            file,
            category,
            dry_run,
        } => {
            let override_category = match category {
                Some(category) => Some(category),
                None => config.default_category()?,
            };
            let monitor_enabled = cli.monitor || config.monitoring_enabled();
            if monitor_enabled {
                tracing::info!("🔍 System monitoring enabled");
            }

            let engine = ImportEngine::new_with_monitoring(backend.clone(), monitor_enabled)
                .with_dry_run(dry_run || config.import.dry_run);
            let summary = engine
                .run_file(&LocalStorage::default(), &backend, &file.to_string_lossy(), override_category)
                .await?;
            print_import_summary(&summary);
        }
        Command::Dashboard { json } => {
            let operator = backend.current_operator().await?;
            tracing::info!("📊 Loading dashboard for {}", operator.id);
            let stats = dashboard::load_dashboard(&backend, chrono::Local::now().date_naive()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_dashboard(&stats);
            }
        }
        Command::Records { view, filter, json } => {
            backend.current_operator().await?;
            let set = records::load_all(&backend).await?;
            let rows = RecordFilter::from(filter).apply(set.view(view));
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_records(view, &rows);
            }
        }
        Command::SetStatus { view, id, status } => {
            backend.current_operator().await?;
            records::update_status(&backend, view, &id, &status).await?;
            println!("✅ {} record {} set to {}", view, id, status);
        }
        Command::Delete { view, ids } => {
            let operator = backend.current_operator().await?;
            let deleted = records::bulk_delete(&backend, &operator, view, &ids).await?;
            println!("✅ Deleted {} {} records", deleted, view);
        }
        Command::Users { action } => {
            let operator = backend.current_operator().await?;
            let admin = UserAdmin::for_operator(&backend, &operator).await?;
            match action {
                UserCommand::List => {
                    let users = admin.list_users().await?;
                    for user in &users {
                        println!(
                            "{}  {:<24} {:<16} {:<6} {}",
                            user.id,
                            user.full_name.as_deref().unwrap_or("-"),
                            user.department.as_deref().unwrap_or("-"),
                            if user.role == hsse_etl::domain::model::Role::Admin { "admin" } else { "user" },
                            if user.is_active { "active" } else { "inactive" }
                        );
                    }
                    let stats = UserStats::from_profiles(&users);
                    println!(
                        "\nTotal users: {}  Administrators: {}  Active users: {}",
                        stats.total, stats.admins, stats.active
                    );
                }
                UserCommand::ToggleRole { user_id } => {
                    let role = admin.toggle_role(&user_id).await?;
                    println!("✅ User role updated to {:?}", role);
                }
                UserCommand::ToggleActive { user_id } => {
                    let active = admin.toggle_active(&user_id).await?;
                    println!("✅ User {}", if active { "activated" } else { "deactivated" });
                }
                UserCommand::Delete { user_id } => {
                    admin.delete_user(&user_id).await?;
                    println!("✅ User deleted");
                }
            }
        }
        Command::Ask { message, once } => {
            backend.current_operator().await?;
            let chat = HttpChatClient::from_config(&config)?;
            let text = message.join(" ");
            if once {
                println!("{}", assistant::ask_once(&chat, &text).await?);
            } else {
                let mut assistant = Assistant::new(backend.clone(), chat, config.assistant_context());
                let reply = assistant.ask(&text).await?;
                println!("{}", reply.content);
            }
        }
    }

    Ok(())
}

fn print_import_summary(summary: &ImportSummary) {
    println!("✅ {}", summary.message());
    for line in summary.detail_lines() {
        println!("   {}", line);
    }
    for skipped in &summary.skipped_sheets {
        println!("⏭️  Skipped sheet \"{}\": {}", skipped.sheet, skipped.reason);
    }
    if !summary.failures.is_empty() {
        println!("❌ {} rows failed:", summary.failures.len());
        for failure in &summary.failures {
            println!(
                "   \"{}\" row {} ({}): {}",
                failure.sheet, failure.row, failure.category, failure.message
            );
        }
    }
}

fn print_dashboard(stats: &DashboardStats) {
    let sections = [
        ("Near Miss", &stats.near_miss),
        ("Incidents", &stats.incidents),
        ("Audits", &stats.audits),
    ];
    for (label, counts) in sections {
        println!(
            "{:<10} total {:>4}  open {:>4}  in progress {:>4}  closed {:>4}",
            label, counts.total, counts.open, counts.in_progress, counts.closed
        );
    }
    println!(
        "{:<10} total {:>4}  valid {:>3}  expiring soon {:>4}  expired {:>4}",
        "Training", stats.training.total, stats.training.valid, stats.training.expiring_soon, stats.training.expired
    );
}

fn print_records(view: RecordView, rows: &[&Record]) {
    println!("{} ({} records)", view, rows.len());
    for record in rows {
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| record.str_field(n).filter(|v| !v.is_empty()))
                .unwrap_or("-")
                .to_string()
        };
        let last = match (view, record.risk()) {
            (RecordView::RiskAssessments, Some((score, band))) => format!("risk {} ({})", score, band),
            _ => field(&["location", "location_id"]),
        };
        println!(
            "{}  {}  {:<32}  {:<14}  {}",
            record.id().unwrap_or_default(),
            field(&["incident_date", "inspection_date", "completion_date"]),
            field(&["title", "training_name"]),
            field(&["status"]),
            last,
        );
    }
}
