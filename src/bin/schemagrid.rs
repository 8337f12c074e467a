use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use schemagrid::schema::SchemaNormalizer;
use schemagrid::{
    ActionCapabilities, EngineConfig, FilterClause, ProjectionEngine, SortKey, StaticOptions,
    render_cell,
};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemagrid")]
#[command(about = "Inspect how schemas project into tables and forms")]
struct Cli {
    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the schema with allOf folded, then its diagnostics
    Normalize { schema: PathBuf },
    /// Print column (or form field) descriptors as JSON
    Describe {
        schema: PathBuf,
        #[arg(long)]
        fields: bool,
        #[arg(long)]
        editable: bool,
        #[arg(long)]
        actions: bool,
    },
    /// Render rows as a tab-separated table
    Render {
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        rows: PathBuf,
        /// Reference options: [{"catalog", "kind", "entities"}]
        #[arg(long)]
        options: Option<PathBuf>,
        /// `field` or `field:desc`; repeatable
        #[arg(long)]
        sort: Vec<String>,
        /// `field=value`; repeatable
        #[arg(long)]
        filter: Vec<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 0)]
        page_size: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Normalize { schema } => normalize_schema(&config, &schema),
        Command::Describe {
            schema,
            fields,
            editable,
            actions,
        } => {
            let editable = editable || config.editable_default;
            describe(config.editable_default(editable), &schema, fields, actions)
        }
        Command::Render {
            schema,
            rows,
            options,
            sort,
            filter,
            page,
            page_size,
        } => {
            let request = RenderRequest {
                sort: sort.iter().map(|s| parse_sort(s)).collect(),
                filter: filter.iter().map(|f| parse_filter(f)).collect::<Result<_>>()?,
                page,
                page_size,
            };
            render(config, &schema, &rows, options.as_deref(), request).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EngineConfig::from_json_str(&raw).map_err(|err| anyhow!("invalid config {}: {}", path.display(), err))
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn normalize_schema(config: &EngineConfig, path: &Path) -> Result<()> {
    let normalized = SchemaNormalizer::new(config.merge_policy).normalize(&read_json(path)?);
    println!("{}", serde_json::to_string_pretty(&normalized.to_value())?);
    for diagnostic in normalized.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    Ok(())
}

fn describe(config: EngineConfig, path: &Path, fields: bool, actions: bool) -> Result<()> {
    let engine = ProjectionEngine::new(config, Arc::new(StaticOptions::new()))?;
    let actions = actions.then(ActionCapabilities::all);
    let projection = engine.project(&read_json(path)?, actions);

    let output = if fields {
        serde_json::to_string_pretty(&projection.fields)?
    } else {
        serde_json::to_string_pretty(&projection.columns)?
    };
    println!("{}", output);
    for diagnostic in &projection.diagnostics {
        eprintln!("{}", diagnostic);
    }
    Ok(())
}

struct RenderRequest {
    sort: Vec<SortKey>,
    filter: Vec<FilterClause>,
    page: usize,
    page_size: usize,
}

async fn render(
    config: EngineConfig,
    schema: &Path,
    rows: &Path,
    options: Option<&Path>,
    request: RenderRequest,
) -> Result<()> {
    let options = match options {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            StaticOptions::from_json_str(&raw)
                .with_context(|| format!("failed to parse options {}", path.display()))?
        }
        None => StaticOptions::new(),
    };

    let engine = ProjectionEngine::new(config, Arc::new(options))?;
    let projection = engine.project(&read_json(schema)?, None);
    let failed = engine.prefetch(&projection).await;
    if failed > 0 {
        eprintln!("{} reference collection(s) unavailable; showing raw ids", failed);
    }

    let rows = match read_json(rows)? {
        JsonValue::Array(rows) => rows,
        _ => return Err(anyhow!("rows file must contain a JSON array")),
    };

    let table = engine.table(&projection);
    let visible = table.apply(&rows, &request.sort, &request.filter);
    let page = table.paginate(&visible, request.page, request.page_size);

    let header: Vec<&str> = projection.columns.iter().map(|c| c.title.as_str()).collect();
    println!("key\t{}", header.join("\t"));
    for row in &page.rows {
        let cells: Vec<String> = projection
            .columns
            .iter()
            .map(|column| render_cell(column, row.get(&column.key), engine.resolver()))
            .collect();
        println!("{}\t{}", row.key(), cells.join("\t"));
    }
    eprintln!(
        "page {}/{} ({} rows)",
        page.page,
        page.page_count.max(1),
        page.total_rows
    );
    Ok(())
}

fn parse_sort(raw: &str) -> SortKey {
    match raw.rsplit_once(':') {
        Some((field, "desc")) => SortKey::desc(field),
        Some((field, "asc")) => SortKey::asc(field),
        _ => SortKey::asc(raw),
    }
}

fn parse_filter(raw: &str) -> Result<FilterClause> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("filter '{}' must look like field=value", raw))?;
    Ok(FilterClause::new(field, value))
}
