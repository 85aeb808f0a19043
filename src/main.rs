use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indexmap::IndexMap;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fieldbook::{
    config::Config,
    export::{self, share},
    import::parse_import,
    record::Record,
    schema::{derive_columns, sanitize_field_name, Column},
    store::{notice_channel, open_store, NoticeReceiver, RecordStore},
    view::{apply_view, ViewState},
};

#[derive(Parser)]
#[command(name = "fieldbook", about = "Dynamic-field record keeper")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a record from key=value pairs
    Add { pairs: Vec<String> },
    /// Show records as a table
    List {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Replace the fields of an existing record
    Edit { id: String, pairs: Vec<String> },
    /// Delete one record by id
    Delete { id: String },
    /// Delete every record
    Clear,
    /// Import a JSON array of flat objects
    Import { file: PathBuf },
    /// Export the current view to a file or stdout
    Export {
        #[arg(value_enum)]
        format: ExportFormat,
        /// Output path; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Print a third-party export shortcut for the current view
    Share {
        #[arg(value_enum)]
        target: ShareTarget,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// Case-insensitive substring to filter on
    #[arg(long, default_value = "")]
    search: String,
    /// Column key to sort by
    #[arg(long)]
    sort: Option<String>,
    /// Sort descending instead of ascending
    #[arg(long)]
    desc: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ShareTarget {
    Mailto,
    Clipboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let (notices, mut notice_rx) = notice_channel();
    let store = open_store(&config, notices).await?;

    run(cli.command, store.as_ref(), &mut notice_rx).await?;
    drain_notices(&mut notice_rx);
    Ok(())
}

async fn run(
    command: Command,
    store: &dyn RecordStore,
    notices: &mut NoticeReceiver,
) -> Result<()> {
    match command {
        Command::Add { pairs } => {
            let fields = parse_pairs(&pairs)?;
            // a blank submission comes back as None and is silently ignored
            if let Some(record) = store.create(fields).await? {
                info!("created record {}", record.id);
                let listed = |rs: &[Record]| rs.iter().any(|r| r.id == record.id);
                match await_mutation(store, notices, listed).await {
                    Some(notice) => println!("{}", notice),
                    None => println!("Added {}.", record.id),
                }
            }
        }
        Command::List { view } => {
            let records = store.list().await?;
            let columns = derive_columns(&records);
            let shown = apply_view(&records, &view.search, view_state(&view).sort());
            println!("{}", render_table(&shown, &columns));
        }
        Command::Edit { id, pairs } => {
            let fields = parse_pairs(&pairs)?;
            if store.update(&id, fields.clone()).await? {
                let echoed =
                    |rs: &[Record]| rs.iter().any(|r| r.id == id && r.fields == fields);
                match await_mutation(store, notices, echoed).await {
                    Some(notice) => println!("{}", notice),
                    None => println!("Updated {}.", id),
                }
            } else {
                println!("No record with id {}.", id);
            }
        }
        Command::Delete { id } => {
            store.delete(&id).await?;
            let unlisted = |rs: &[Record]| !rs.iter().any(|r| r.id == id);
            match await_mutation(store, notices, unlisted).await {
                Some(notice) => println!("{}", notice),
                None => println!("Deleted {}.", id),
            }
        }
        Command::Clear => {
            store.delete_all().await?;
            println!("Cleared all records.");
        }
        Command::Import { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading import file {:?}", file))?;
            let existing = store.list().await?;
            let records = parse_import(&text, &existing)?;
            let accepted = store.append_imported(records).await?;
            println!("Imported {} records.", accepted);
        }
        Command::Export { format, out, view } => {
            let (shown, columns) = current_view(store, &view).await?;
            let text = match format {
                ExportFormat::Csv => export::to_csv(&shown, &columns),
                ExportFormat::Json => export::to_json(&shown)?,
            };
            match out {
                Some(path) => {
                    fs::write(&path, &text)
                        .with_context(|| format!("writing export to {:?}", path))?;
                    println!("Wrote {}.", path.display());
                }
                None => println!("{}", text),
            }
        }
        Command::Share { target, view } => {
            let (shown, columns) = current_view(store, &view).await?;
            let payload = match target {
                ShareTarget::Mailto => share::mailto_url("Fieldbook export", &shown, &columns),
                ShareTarget::Clipboard => share::clipboard_payload(&shown, &columns),
            };
            println!("{}", payload);
        }
    }
    Ok(())
}

/// Filtered/sorted view plus the column set of the full collection.
async fn current_view(
    store: &dyn RecordStore,
    view: &ViewArgs,
) -> Result<(Vec<Record>, Vec<Column>)> {
    let records = store.list().await?;
    let columns = derive_columns(&records);
    let shown = apply_view(&records, &view.search, view_state(view).sort());
    Ok((shown, columns))
}

/// Parse `key=value` arguments into an ordered field map. Keys are sanitized;
/// an empty or duplicate key aborts the whole submission with a message.
fn parse_pairs(pairs: &[String]) -> Result<IndexMap<String, String>> {
    let mut fields = IndexMap::with_capacity(pairs.len());
    for pair in pairs {
        let (raw_key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got `{}`", pair))?;
        let taken: Vec<String> = fields.keys().cloned().collect();
        let key = sanitize_field_name(raw_key, &taken)?;
        fields.insert(key, value.to_string());
    }
    Ok(fields)
}

/// Map the CLI sort flags onto the toggle semantics: naming a key sorts it
/// ascending, `--desc` is a second toggle of the same key.
fn view_state(view: &ViewArgs) -> ViewState {
    let mut state = ViewState::default();
    if let Some(key) = &view.sort {
        state.toggle(key);
        if view.desc {
            state.toggle(key);
        }
    }
    state
}

/// Wait until the store's change feed satisfies `done`, or until the store
/// resolves the write with a notice instead. The remote backend only
/// publishes after its poll observes the write, so the visible list may lag
/// the call that just returned; a rejected write never echoes, and its
/// failure notice ends the wait. There is deliberately no timeout.
async fn await_mutation(
    store: &dyn RecordStore,
    notices: &mut NoticeReceiver,
    done: impl Fn(&[Record]) -> bool,
) -> Option<String> {
    let mut feed = store.watch();
    loop {
        if done(&feed.borrow()) {
            return None;
        }
        tokio::select! {
            changed = feed.changed() => {
                if changed.is_err() {
                    return None;
                }
            }
            notice = notices.recv() => return notice,
        }
    }
}

fn drain_notices(notices: &mut NoticeReceiver) {
    while let Ok(message) = notices.try_recv() {
        println!("{}", message);
    }
}

/// Plain fixed-width table: an Id column followed by the derived columns.
fn render_table(records: &[Record], columns: &[Column]) -> String {
    let mut headers = vec!["Id".to_string()];
    headers.extend(columns.iter().map(|c| c.label.clone()));

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let mut row = vec![record.id.clone()];
        row.extend(columns.iter().map(|c| record.value(&c.key).to_string()));
        rows.push(row);
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_row = |row: &[String]| {
        row.iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<1$}", cell, *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(&headers));
    for row in &rows {
        lines.push(format_row(row));
    }
    lines.join("\n")
}
