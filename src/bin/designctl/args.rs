//! Command-line surface for `designctl`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use designctl_api_types::RenderFormat;
use designctl::domain::render::RenderRequest;

#[derive(Parser, Debug)]
#[command(
    name = "designctl",
    version,
    about = "Design-automation API client",
    long_about = None
)]
pub struct Cli {
    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding config.toml and profiles.toml
    #[arg(long, global = true, env = "DESIGNCTL_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Extra runtime settings file (TOML)
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Log level, e.g. `debug`; `RUST_LOG` takes full directives
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Shorthand for `--log-level info`
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in, log out and inspect stored credentials
    Auth(AuthArgs),
    /// Show the account behind the current key
    Whoami,
    /// Design management
    Designs(DesignsArgs),
    /// Browse and instantiate templates
    Templates(TemplatesArgs),
    /// Render a design or template
    Render(RenderArgs),
    /// Inspect asynchronous render jobs
    Renders(RendersArgs),
    /// Render every entry of a batch file
    BatchRender(BatchRenderArgs),
    /// Write a design's JSON to a file
    Export(ExportArgs),
    /// Export every design into a directory
    ExportAll(ExportAllArgs),
    /// Read or replace a design's canvas
    Canvas(CanvasArgs),
    /// Uploaded assets
    Assets(AssetsArgs),
    /// API key management
    ApiKeys(ApiKeysArgs),
    /// Usage for the current billing period
    Usage(UsageArgs),
    /// Plan and billing details
    Billing,
    /// Persisted configuration values
    Config(ConfigArgs),
    /// Named credential profiles
    Profiles(ProfilesArgs),
    /// Write a starter batch file
    Init(InitArgs),
    /// Check a batch or data file without calling the API
    Validate(ValidateArgs),
    /// Re-render whenever a data file changes
    Watch(WatchArgs),
    /// Render every data file dropped into a directory
    WatchDir(WatchDirArgs),
    /// Compare two designs
    Diff(DiffArgs),
    /// Duplicate a design
    Clone(CloneArgs),
    /// Open a design in the web app
    Open(OpenArgs),
    /// Render a design with the stored defaults
    QuickRender(QuickRenderArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthCmd,
}

#[derive(Subcommand, Debug)]
pub enum AuthCmd {
    /// Verify a key and store it
    Login {
        /// Key to store; prompted for when omitted
        #[arg(long)]
        api_key: Option<String>,
        /// Save as a named profile and activate it
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Forget the stored key
    Logout,
    /// Show where the current key comes from
    Status,
}

#[derive(Parser, Debug)]
pub struct DesignsArgs {
    #[command(subcommand)]
    pub action: DesignsCmd,
}

#[derive(Subcommand, Debug)]
pub enum DesignsCmd {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
    },
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Start from a template
        #[arg(long)]
        template: Option<String>,
        /// Initial canvas JSON
        #[arg(long)]
        canvas_file: Option<PathBuf>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Mark or unmark as a reusable template
        #[arg(long)]
        is_template: Option<bool>,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Parser, Debug)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    pub action: TemplatesCmd,
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCmd {
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    Get {
        id: String,
    },
    /// Create a design from a template
    Use {
        id: String,
        #[arg(long)]
        name: Option<String>,
    },
}

/// Exactly one of `--design` / `--template`.
#[derive(Args, Debug, Clone, Default)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    #[arg(long)]
    pub design: Option<String>,
    #[arg(long)]
    pub template: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RenderOptionArgs {
    /// Output format; defaults to the stored default-format, then png
    #[arg(long, short)]
    pub format: Option<RenderFormat>,
    #[arg(long, short)]
    pub quality: Option<u32>,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
}

impl RenderOptionArgs {
    pub fn to_request(
        &self,
        target: &TargetArgs,
        default_format: RenderFormat,
        default_quality: Option<u32>,
    ) -> RenderRequest {
        RenderRequest {
            design_id: target.design.clone(),
            template_id: target.template.clone(),
            format: self.format.unwrap_or(default_format),
            quality: self.quality.or(default_quality),
            width: self.width,
            height: self.height,
            dynamic_data: None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub options: RenderOptionArgs,
    /// Dynamic data as inline JSON
    #[arg(long, conflicts_with = "data_file")]
    pub data: Option<String>,
    /// Dynamic data from a JSON file
    #[arg(long)]
    pub data_file: Option<PathBuf>,
    /// Where to write the result; defaults to `<id>.<format>`
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Submit as a job and return its id
    #[arg(long = "async")]
    pub async_mode: bool,
    /// With --async, wait for the job and download the result
    #[arg(long, requires = "async_mode")]
    pub wait: bool,
    /// Seconds to wait for an async job
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct RendersArgs {
    #[command(subcommand)]
    pub action: RendersCmd,
}

#[derive(Subcommand, Debug)]
pub enum RendersCmd {
    /// Fetch a job's status once
    Status { job_id: String },
    /// Poll a job until it finishes
    Wait {
        job_id: String,
        #[arg(long)]
        timeout: Option<u64>,
        /// Download the result here when the job completes
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Parser, Debug)]
pub struct BatchRenderArgs {
    /// Batch file (JSON array or `{ "renders": [...] }`)
    pub file: PathBuf,
    /// Overrides the file's outputDir
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Format for items that do not name one
    #[arg(long, short)]
    pub format: Option<RenderFormat>,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    pub design_id: String,
    /// Defaults to `<id>.json`; `-` writes to stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ExportAllArgs {
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
    /// Page size used while listing
    #[arg(long, default_value_t = 50)]
    pub limit: u32,
}

#[derive(Parser, Debug)]
pub struct CanvasArgs {
    #[command(subcommand)]
    pub action: CanvasCmd,
}

#[derive(Subcommand, Debug)]
pub enum CanvasCmd {
    Get {
        design_id: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace the canvas with the contents of a JSON file
    Set { design_id: String, file: PathBuf },
}

#[derive(Parser, Debug)]
pub struct AssetsArgs {
    #[command(subcommand)]
    pub action: AssetsCmd,
}

#[derive(Subcommand, Debug)]
pub enum AssetsCmd {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    Upload {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Parser, Debug)]
pub struct ApiKeysArgs {
    #[command(subcommand)]
    pub action: ApiKeysCmd,
}

#[derive(Subcommand, Debug)]
pub enum ApiKeysCmd {
    List,
    Create {
        #[arg(long)]
        name: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Parser, Debug)]
pub struct UsageArgs {
    /// e.g. `current`, `last-month`, `2024-05`
    #[arg(long)]
    pub period: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigCmd,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
    List,
    /// Remove every stored value
    Reset {
        #[arg(long, short)]
        yes: bool,
    },
    /// Print the config file location
    Path,
}

#[derive(Parser, Debug)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub action: ProfilesCmd,
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCmd {
    Add {
        name: String,
        /// Prompted for when omitted
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replace an existing profile of the same name
        #[arg(long)]
        force: bool,
    },
    Remove {
        name: String,
    },
    List,
    Show {
        name: String,
    },
    /// Activate a profile
    Use {
        name: String,
    },
    /// Print the active profile
    Current,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    #[arg(long, default_value = "designctl.batch.json")]
    pub path: PathBuf,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    pub file: PathBuf,
    /// Treat the file as dynamic data rather than a batch file
    #[arg(long)]
    pub data: bool,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// JSON data file to watch
    pub file: PathBuf,
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub options: RenderOptionArgs,
    /// Output path; supports `{{count}}` and `{{timestamp}}`
    #[arg(long, short)]
    pub output: Option<String>,
    /// Overrides watch.debounce_ms
    #[arg(long)]
    pub debounce_ms: Option<u64>,
    /// Shell command run after each render; `$DESIGNCTL_OUTPUT` holds the path
    #[arg(long)]
    pub hook: Option<String>,
}

#[derive(Parser, Debug)]
pub struct WatchDirArgs {
    pub dir: PathBuf,
    #[command(flatten)]
    pub target: TargetArgs,
    #[command(flatten)]
    pub options: RenderOptionArgs,
    #[arg(long, default_value = "renders")]
    pub output_dir: PathBuf,
    /// Extension of data files to pick up
    #[arg(long, default_value = "json")]
    pub ext: String,
    /// Delete each data file after it rendered
    #[arg(long)]
    pub delete_source: bool,
    #[arg(long)]
    pub hook: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    pub left: String,
    pub right: String,
}

#[derive(Parser, Debug)]
pub struct CloneArgs {
    pub design_id: String,
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Parser, Debug)]
pub struct OpenArgs {
    pub design_id: String,
    /// Print the URL instead of launching a browser
    #[arg(long)]
    pub print: bool,
}

#[derive(Parser, Debug)]
pub struct QuickRenderArgs {
    pub design_id: String,
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CompletionArgs {
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_requires_exactly_one_target() {
        assert!(Cli::try_parse_from(["designctl", "render", "--format", "png"]).is_err());
        assert!(
            Cli::try_parse_from(["designctl", "render", "--design", "a", "--template", "b"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["designctl", "render", "--design", "d1", "-f", "jpg"])
            .expect("parse");
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.target.design.as_deref(), Some("d1"));
                assert_eq!(args.options.format, Some(RenderFormat::Jpg));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["designctl", "designs", "list", "--json"]).expect("parse");
        assert!(cli.json);
    }

    #[test]
    fn wait_requires_async() {
        assert!(Cli::try_parse_from(["designctl", "render", "--design", "d", "--wait"]).is_err());
    }
}
