use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tagsheet_broker::{BrokerTransport, FileCredentials};
use tagsheet_catalog::{Catalog, Selection};
use tagsheet_printing::{
    items_per_row, run_print_action, Channel, ChannelOutcome, ChannelRouter, LabelRasterizer,
    LayoutSettings, Orientation, PrintReport, PrintTransport, PrinterGroup, PrinterProfile,
};
use tagsheet_settings::{
    AppConfig, ConfigStore, PrinterGroupStore, CONFIG_FILE_NAME, LOCATIONS_FILE_NAME,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tagsheet",
    about = "Print price labels on sheets or through a local print broker",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace holding tagsheet.json and locations.json (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 提高記錄詳細程度（可重複）。 / Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出或搜尋商品目錄。 / List or search the item catalog.
    Catalog(CatalogArgs),
    /// 將選取的標籤輸出為 PDF 檔。 / Render the selected labels into a downloadable PDF.
    Download(DownloadArgs),
    /// 透過列印代理程式送出兩個通道。 / Send both label channels to the print broker.
    Print(PrintArgs),
    /// 管理印表機位置。 / Manage printer locations.
    #[command(subcommand)]
    Locations(LocationsCommand),
    /// 檢視或修改設定。 / Show or change the configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
struct CatalogArgs {
    /// 商品目錄 JSON 檔。 / Catalog JSON file.
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,
    /// 依名稱或 SKU 篩選。 / Filter by name or SKU.
    #[arg(long, value_name = "TERM")]
    search: Option<String>,
}

#[derive(Args)]
struct JobArgs {
    /// 商品目錄 JSON 檔。 / Catalog JSON file.
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,
    /// 以 ID=數量 選取標籤（可重複）。 / Select labels as ID=QTY (repeatable).
    #[arg(long = "select", value_name = "ID=QTY")]
    select: Vec<String>,
    /// 從 JSON 檔載入選取（{"id": qty}）。 / Load a selection from a JSON file ({"id": qty}).
    #[arg(long, value_name = "FILE")]
    selection: Option<PathBuf>,
    /// 將商品改列為永久標籤（可重複）。 / Route this item to the permanent channel (repeatable).
    #[arg(long = "permanent", value_name = "ID")]
    permanent: Vec<String>,
    /// 將商品改列為非永久標籤（可重複）。 / Route this item to the non-permanent channel (repeatable).
    #[arg(long = "non-permanent", value_name = "ID")]
    non_permanent: Vec<String>,
    /// 覆寫設定中的字型。 / Font file overriding the configured one.
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
}

#[derive(Args)]
struct DownloadArgs {
    #[command(flatten)]
    job: JobArgs,
    /// 輸出檔案；預設為工作區內的 labels.pdf。 / Output file (defaults to labels.pdf in the workspace).
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct PrintArgs {
    #[command(flatten)]
    job: JobArgs,
    /// 使用指定位置（名稱或 ID）而非目前位置。 / Use this location (name or id) instead of the active one.
    #[arg(long, value_name = "LOCATION")]
    location: Option<String>,
}

#[derive(Subcommand)]
enum LocationsCommand {
    /// 列出所有位置。 / List all locations.
    List,
    /// 新增位置。 / Add a location.
    Add {
        name: String,
        /// 新增後設為目前位置。 / Make it the active location.
        #[arg(long = "use")]
        activate: bool,
    },
    /// 重新命名位置。 / Rename a location.
    Rename { location: String, name: String },
    /// 設定位置的通道印表機。 / Configure one channel printer of a location.
    SetPrinter(SetPrinterArgs),
    /// 刪除位置。 / Remove a location.
    Remove { location: String },
    /// 設定目前位置。 / Select the active location.
    Use { location: String },
}

#[derive(Args)]
struct SetPrinterArgs {
    location: String,
    #[arg(long, value_enum)]
    channel: ChannelChoice,
    /// 代理程式中的印表機名稱。 / Printer name as known to the broker.
    #[arg(long)]
    name: Option<String>,
    /// 紙張寬度（mm）。 / Media width in mm.
    #[arg(long)]
    width: Option<f64>,
    /// 紙張高度（mm）。 / Media height in mm.
    #[arg(long)]
    height: Option<f64>,
    #[arg(long, value_enum)]
    orientation: Option<OrientationChoice>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// 顯示目前設定。 / Print the current configuration.
    Show,
    /// 修改標籤版面（mm）。 / Change the label grid (mm).
    SetLayout(SetLayoutArgs),
    /// 設定列印代理程式。 / Configure the print broker.
    SetBroker(SetBrokerArgs),
    /// 設定點陣化參數與字型。 / Configure rasterization and the font.
    SetRaster(SetRasterArgs),
}

#[derive(Args)]
struct SetLayoutArgs {
    #[arg(long)]
    page_width: Option<f64>,
    #[arg(long)]
    margin_top: Option<f64>,
    #[arg(long)]
    margin_left: Option<f64>,
    #[arg(long)]
    gap_x: Option<f64>,
    #[arg(long)]
    gap_y: Option<f64>,
    #[arg(long)]
    label_width: Option<f64>,
    #[arg(long)]
    label_height: Option<f64>,
}

#[derive(Args)]
struct SetBrokerArgs {
    /// 代理程式 websocket 位址。 / Broker websocket URL.
    #[arg(long)]
    url: Option<String>,
    /// 憑證 PEM 檔。 / Certificate PEM file.
    #[arg(long, value_name = "FILE")]
    certificate: Option<PathBuf>,
    /// 私鑰 PEM 檔（PKCS#1 或 PKCS#8）。 / Private key PEM file (PKCS#1 or PKCS#8).
    #[arg(long, value_name = "FILE")]
    private_key: Option<PathBuf>,
}

#[derive(Args)]
struct SetRasterArgs {
    /// 每 CSS 像素的裝置像素數。 / Device pixels per CSS pixel.
    #[arg(long)]
    scale: Option<f32>,
    /// JPEG 品質（1-100）。 / JPEG quality (1-100).
    #[arg(long)]
    jpeg_quality: Option<u8>,
    /// 標籤文字使用的字型檔。 / Font file for label text.
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ChannelChoice {
    Permanent,
    #[value(name = "non-permanent", aliases = ["nonpermanent", "paper"])]
    NonPermanent,
}

impl From<ChannelChoice> for Channel {
    fn from(choice: ChannelChoice) -> Self {
        match choice {
            ChannelChoice::Permanent => Channel::Permanent,
            ChannelChoice::NonPermanent => Channel::NonPermanent,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrientationChoice {
    Portrait,
    Landscape,
}

impl From<OrientationChoice> for Orientation {
    fn from(choice: OrientationChoice) -> Self {
        match choice {
            OrientationChoice::Portrait => Orientation::Portrait,
            OrientationChoice::Landscape => Orientation::Landscape,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);
    let workspace_root = resolve_workspace(workspace)?;
    match command {
        Commands::Catalog(args) => execute_catalog(args),
        Commands::Download(args) => execute_download(args, &workspace_root),
        Commands::Print(args) => execute_print(args, &workspace_root),
        Commands::Locations(command) => execute_locations_command(command, &workspace_root),
        Commands::Config(command) => execute_config_command(command, &workspace_root),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn execute_catalog(args: CatalogArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let items = match args.search.as_deref() {
        Some(term) => catalog.search(term),
        None => catalog.items().iter().collect(),
    };
    for item in items {
        let price = item
            .price
            .map(|price| format!("{price:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<10} {:<32} {:>9}  {}",
            item.id,
            item.sku,
            item.name,
            price,
            Channel::for_item(item.is_permanent)
        );
    }
    Ok(())
}

fn execute_download(args: DownloadArgs, workspace_root: &Path) -> Result<()> {
    let config = load_config(workspace_root)?;
    let catalog = load_job_catalog(&args.job)?;
    let selection = load_selection(&args.job)?;
    let router = build_router(config.config(), args.job.font.as_deref(), workspace_root)?;

    let labels = router.split(&selection, &catalog).units();
    let artifact = router
        .sheet(&selection, &catalog)
        .context("failed to render label sheet")?
        .to_download();
    let output = match args.output {
        Some(path) => resolve_input_path(&path)?,
        None => workspace_root.join(&artifact.file_name),
    };
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&output, &artifact.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Wrote {} label(s) to {} ({})",
        labels,
        output.display(),
        artifact.mime_type
    );
    Ok(())
}

fn execute_print(args: PrintArgs, workspace_root: &Path) -> Result<()> {
    let config = load_config(workspace_root)?;
    let mut locations = load_locations(workspace_root)?;
    locations.initialize()?;
    let catalog = load_job_catalog(&args.job)?;
    let selection = load_selection(&args.job)?;
    let router = build_router(config.config(), args.job.font.as_deref(), workspace_root)?;

    let group = match args.location.as_deref() {
        Some(location) => Some(find_location(&locations, location)?.clone()),
        None => {
            let id = config.config().active_group_id.ok_or_else(|| {
                anyhow!("no printer location selected; run `tagsheet locations use <LOCATION>`")
            })?;
            locations.get(id).cloned()
        }
    };

    let broker = &config.config().broker;
    let credentials = FileCredentials::new(
        broker
            .certificate_path
            .as_ref()
            .map(|path| workspace_root.join(path)),
        broker
            .private_key_path
            .as_ref()
            .map(|path| workspace_root.join(path)),
    );
    let mut transport = BrokerTransport::new(broker.url.clone(), credentials);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let report = runtime.block_on(async {
        let report =
            run_print_action(&router, &selection, &catalog, group.as_ref(), &mut transport).await;
        transport.disconnect().await;
        report
    })?;

    if let Some(group) = group.as_ref() {
        print_report(&report, group);
    }
    let failures = report.failures().len();
    if failures > 0 {
        bail!("{failures} channel(s) failed");
    }
    Ok(())
}

fn print_report(report: &PrintReport, group: &PrinterGroup) {
    println!("Location: {}", group.name);
    for channel in Channel::ALL {
        match report.outcome(channel) {
            ChannelOutcome::Skipped => println!("  {channel}: no labels"),
            ChannelOutcome::Submitted { pages } => println!(
                "  {channel}: sent {pages} page(s) to {}",
                group.profile(channel).name
            ),
            ChannelOutcome::Failed(err) => println!("  {channel}: failed: {err}"),
            ChannelOutcome::Aborted => println!("  {channel}: aborted"),
        }
    }
}

fn execute_locations_command(command: LocationsCommand, workspace_root: &Path) -> Result<()> {
    let mut config = load_config(workspace_root)?;
    let mut locations = load_locations(workspace_root)?;
    locations.initialize()?;

    match command {
        LocationsCommand::List => {
            let active = config.config().active_group_id;
            for group in locations.list() {
                let marker = if Some(group.id) == active { '*' } else { ' ' };
                println!("{marker} {:>3}  {}", group.id, group.name);
                for channel in Channel::ALL {
                    println!("        {channel}: {}", describe_profile(group.profile(channel)));
                }
            }
        }
        LocationsCommand::Add { name, activate } => {
            let id = locations.add(&name, PrinterProfile::default(), PrinterProfile::default())?;
            if activate {
                config.update(|config| config.active_group_id = Some(id))?;
            }
            println!("Added location {id}: {}", name.trim());
        }
        LocationsCommand::Rename { location, name } => {
            let mut group = find_location(&locations, &location)?.clone();
            group.name = name;
            let id = group.id;
            locations.update(group)?;
            println!("Renamed location {id}");
        }
        LocationsCommand::SetPrinter(args) => {
            let mut group = find_location(&locations, &args.location)?.clone();
            let channel = Channel::from(args.channel);
            let profile = group.profile_mut(channel);
            if let Some(name) = args.name {
                profile.name = name.trim().to_string();
            }
            if let Some(width) = args.width {
                ensure_positive("width", width)?;
                profile.width = width;
            }
            if let Some(height) = args.height {
                ensure_positive("height", height)?;
                profile.height = height;
            }
            if let Some(orientation) = args.orientation {
                profile.orientation = orientation.into();
            }
            let summary = describe_profile(profile);
            let name = group.name.clone();
            locations.update(group)?;
            println!("{name} {channel}: {summary}");
        }
        LocationsCommand::Remove { location } => {
            let id = find_location(&locations, &location)?.id;
            let removed = locations.remove(id)?;
            if config.config().active_group_id == Some(id) {
                config.update(|config| config.active_group_id = None)?;
            }
            println!("Removed location {id}: {}", removed.name);
        }
        LocationsCommand::Use { location } => {
            let group = find_location(&locations, &location)?;
            let (id, name) = (group.id, group.name.clone());
            config.update(|config| config.active_group_id = Some(id))?;
            println!("Active location: {name}");
        }
    }
    Ok(())
}

fn execute_config_command(command: ConfigCommand, workspace_root: &Path) -> Result<()> {
    let mut store = load_config(workspace_root)?;
    match command {
        ConfigCommand::Show => {
            let text = serde_json::to_string_pretty(store.config())
                .context("failed to serialize configuration")?;
            println!("{text}");
        }
        ConfigCommand::SetLayout(args) => {
            let mut layout = store.config().layout;
            apply_layout(&mut layout, &args);
            let per_row = items_per_row(&layout)?;
            store.update(|config| config.layout = layout)?;
            println!("Layout saved: {per_row} label(s) per row");
        }
        ConfigCommand::SetBroker(args) => {
            let certificate = args.certificate.as_deref().map(resolve_input_path).transpose()?;
            let private_key = args.private_key.as_deref().map(resolve_input_path).transpose()?;
            store.update(|config| {
                if let Some(url) = args.url {
                    config.broker.url = url;
                }
                if certificate.is_some() {
                    config.broker.certificate_path = certificate;
                }
                if private_key.is_some() {
                    config.broker.private_key_path = private_key;
                }
            })?;
            println!("Broker: {}", store.config().broker.url);
        }
        ConfigCommand::SetRaster(args) => {
            let font = args.font.as_deref().map(resolve_input_path).transpose()?;
            store.update(|config| {
                if let Some(scale) = args.scale {
                    config.raster.scale = scale;
                }
                if let Some(quality) = args.jpeg_quality {
                    config.raster.jpeg_quality = quality;
                }
                if font.is_some() {
                    config.font_path = font;
                }
            })?;
            let raster = store.config().raster;
            println!(
                "Raster: scale {} / JPEG quality {}",
                raster.scale, raster.jpeg_quality
            );
        }
    }
    Ok(())
}

fn apply_layout(layout: &mut LayoutSettings, args: &SetLayoutArgs) {
    let fields = [
        (&mut layout.page_width, args.page_width),
        (&mut layout.margin_top, args.margin_top),
        (&mut layout.margin_left, args.margin_left),
        (&mut layout.gap_x, args.gap_x),
        (&mut layout.gap_y, args.gap_y),
        (&mut layout.label_width, args.label_width),
        (&mut layout.label_height, args.label_height),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            *field = value;
        }
    }
}

fn ensure_positive(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{field} must be a positive number of millimetres");
    }
    Ok(())
}

fn describe_profile(profile: &PrinterProfile) -> String {
    let name = if profile.is_configured() {
        profile.name.as_str()
    } else {
        "<not configured>"
    };
    format!(
        "{name} ({} x {} mm, {})",
        profile.width, profile.height, profile.orientation
    )
}

fn find_location<'a>(locations: &'a PrinterGroupStore, key: &str) -> Result<&'a PrinterGroup> {
    let by_id = key
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|id| locations.get(id));
    by_id
        .or_else(|| locations.find_by_name(key))
        .ok_or_else(|| anyhow!("printer location '{key}' not found"))
}

fn build_router(
    config: &AppConfig,
    font_override: Option<&Path>,
    workspace_root: &Path,
) -> Result<ChannelRouter<LabelRasterizer>> {
    let mut rasterizer = LabelRasterizer::new(config.raster.options());
    let font = match font_override {
        Some(path) => Some(resolve_input_path(path)?),
        None => config.font_path.as_ref().map(|path| workspace_root.join(path)),
    };
    if let Some(path) = font {
        rasterizer = rasterizer
            .with_font_file(&path)
            .with_context(|| format!("failed to load font {}", path.display()))?;
    }
    Ok(ChannelRouter::new(config.layout, rasterizer))
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let path = resolve_input_path(path)?;
    Catalog::load(&path).with_context(|| format!("failed to load catalog {}", path.display()))
}

/// Loads the catalog with the per-item channel overrides applied.
fn load_job_catalog(args: &JobArgs) -> Result<Catalog> {
    let mut catalog = load_catalog(&args.catalog)?;
    let overrides = args
        .permanent
        .iter()
        .map(|id| (id, true))
        .chain(args.non_permanent.iter().map(|id| (id, false)));
    for (id, is_permanent) in overrides {
        if !catalog.set_permanent(id.trim(), is_permanent) {
            bail!("item '{id}' is not in the catalog");
        }
        tracing::debug!(id = %id, is_permanent, "channel override applied");
    }
    Ok(catalog)
}

fn load_selection(args: &JobArgs) -> Result<Selection> {
    let mut selection = match args.selection.as_deref() {
        Some(path) => {
            let path = resolve_input_path(path)?;
            Selection::load(&path)
                .with_context(|| format!("failed to load selection {}", path.display()))?
        }
        None => Selection::new(),
    };
    for pair in &args.select {
        let (id, quantity) = Selection::parse_pair(pair)?;
        selection.set(id, quantity);
    }
    if selection.is_empty() {
        bail!("no labels selected; pass --select ID=QTY or --selection FILE");
    }
    Ok(selection)
}

fn load_config(workspace_root: &Path) -> Result<ConfigStore> {
    let path = workspace_root.join(CONFIG_FILE_NAME);
    ConfigStore::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn load_locations(workspace_root: &Path) -> Result<PrinterGroupStore> {
    let path = workspace_root.join(LOCATIONS_FILE_NAME);
    PrinterGroupStore::load(&path)
        .with_context(|| format!("failed to load printer locations from {}", path.display()))
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => resolve_input_path(&path),
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
