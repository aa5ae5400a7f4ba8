//! Statement import and export command implementations

use std::path::Path;

use anyhow::{Context, Result};
use kosh_core::{
    import_csv, import_text, CoreConfig, CsvColumnMap, Database, ExportOptions, ImportOptions,
    ImportSummary, ProcessorClient,
};

use super::resolve_account;

fn print_summary(summary: &ImportSummary) {
    println!();
    println!("📊 Import Results");
    println!("   ─────────────────────────────");
    println!("   ✅ Added: {}", summary.added);
    if summary.duplicates > 0 {
        println!("   ♻️  Skipped duplicates: {}", summary.duplicates);
    }
    if !summary.errors.is_empty() {
        println!("   ⚠️  Rows with errors: {}", summary.errors.len());
        for err in &summary.errors {
            println!("      line {}: {}", err.line, err.message);
        }
    }
}

pub fn cmd_import(
    db: &Database,
    config: &CoreConfig,
    file: &Path,
    account: &str,
    format: &str,
    allow_duplicates: bool,
    map: CsvColumnMap,
) -> Result<()> {
    println!("📥 Importing {}...", file.display());

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let is_csv = match format {
        "csv" => true,
        "text" => false,
        "auto" => file
            .extension()
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false),
        other => anyhow::bail!("Unknown format: {} (expected auto, csv, or text)", other),
    };

    let account_id = db.upsert_account(account, None, None)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string());
    let options = ImportOptions {
        allow_duplicates,
        source_file_name: file_name,
    };

    let summary = if is_csv {
        println!("   Format: CSV");
        import_csv(db, account_id, &content, &map, &options, &config.scoring, None)?
    } else {
        println!("   Format: plain text");
        import_text(db, account_id, &content, &options, &config.scoring, None)?
    };

    print_summary(&summary);
    if summary.added > 0 {
        println!();
        println!("Next: kosh detect");
    }
    Ok(())
}

pub async fn cmd_process(
    db: &Database,
    config: &CoreConfig,
    file: &Path,
    account: &str,
    password: Option<&str>,
    allow_duplicates: bool,
) -> Result<()> {
    let client = ProcessorClient::from_env();
    println!("📄 Sending {} to {}...", file.display(), client.base_url());

    let account_id = db.upsert_account(account, None, None)?;

    // Explicit password wins over the account's stored one
    let stored = db
        .get_account(account_id)?
        .and_then(|a| a.pdf_password);
    let effective = password.or(stored.as_deref());

    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "statement".to_string());

    let response = client
        .process_document(&file_name, bytes, effective)
        .await
        .context("Document processing failed")?;

    println!(
        "   Extracted {} transactions via {}",
        response.transaction_count, response.processing_method
    );
    if let Some(validation) = &response.validation {
        if validation.found_footer {
            match validation.matches {
                Some(true) => println!("   ✅ Counts match the statement footer"),
                Some(false) => println!(
                    "   ⚠️  Footer mismatch: expected {} DR / {} CR, got {} / {}",
                    validation.expected_dr_count,
                    validation.expected_cr_count,
                    validation.actual_dr_count,
                    validation.actual_cr_count
                ),
                None => {}
            }
        }
    }

    // A password that worked is worth keeping for next time
    if let Some(pw) = password {
        db.update_account_password(account_id, Some(pw))?;
    }

    let candidates: Vec<_> = response
        .transactions
        .into_iter()
        .map(|t| t.into_candidate())
        .collect();
    let options = ImportOptions {
        allow_duplicates,
        source_file_name: Some(file_name),
    };
    let summary = kosh_core::import_candidates(
        db,
        account_id,
        &candidates,
        &options,
        &config.scoring,
        None,
    )?;

    print_summary(&summary);
    Ok(())
}

pub fn cmd_backup(db: &Database, output: &Path) -> Result<()> {
    let backup = db.export_full_backup()?;
    let json = serde_json::to_string_pretty(&backup)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "✅ Backup written to {} ({} records)",
        output.display(),
        backup.metadata.total_records
    );
    Ok(())
}

pub fn cmd_restore(db: &Database, file: &Path, clear: bool) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let backup: kosh_core::FullBackup =
        serde_json::from_str(&json).context("Backup file is not valid JSON")?;

    println!(
        "📦 Restoring backup from {} (created {}, version {})...",
        file.display(),
        backup.metadata.created_at,
        backup.metadata.version
    );
    if clear {
        println!("   ⚠️  Clearing existing data first (--clear)");
    }

    let stats = db.import_full_backup(&backup, clear)?;
    println!(
        "✅ Restored {} accounts, {} merchants, {} subscriptions, {} transactions",
        stats.accounts, stats.merchants, stats.subscriptions, stats.transactions
    );
    Ok(())
}

pub fn cmd_export(
    db: &Database,
    output: Option<&Path>,
    from: Option<&str>,
    to: Option<&str>,
    account: Option<&str>,
) -> Result<()> {
    let from = from
        .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --from date format (use YYYY-MM-DD)")?;
    let to = to
        .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --to date format (use YYYY-MM-DD)")?;
    let account_id = account.map(|name| resolve_account(db, name)).transpose()?;

    let csv = db.export_transactions_csv(&ExportOptions {
        account_id,
        from,
        to,
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let rows = csv.lines().count().saturating_sub(1);
            println!("✅ Exported {} transactions to {}", rows, path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}
