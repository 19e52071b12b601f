use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_lsp::{LspService, Server};

use playbook_lsp::{Backend, Catalogs, CompletionRequest, Config, logging};

#[derive(Parser)]
#[command(name = "playbook-lsp", version)]
#[command(about = "Completion for automation playbooks, as a language server or a one-shot command")]
struct Cli {
    /// Config file (defaults to <config dir>/playbook-lsp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `playbook_lsp=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the language server on stdin/stdout (the default)
    Serve,

    /// Print the completions for a position in a playbook file
    Complete {
        file: PathBuf,
        /// 0-based line (defaults to the end of the file)
        #[arg(long, requires = "column")]
        line: Option<usize>,
        /// 0-based column, in characters
        #[arg(long, requires = "line")]
        column: Option<usize>,
        /// Print JSON instead of one candidate per line
        #[arg(long)]
        json: bool,
    },

    /// List the modules found on the module search paths
    Modules {
        /// Only list modules whose name contains this text
        pattern: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            logging::init(cli.log_level.as_deref());
            tracing::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };
    logging::init(cli.log_level.as_deref().or(config.log_level.as_deref()));

    let catalogs = match Catalogs::initialize(&config) {
        Ok(catalogs) => Arc::new(catalogs),
        Err(err) => {
            tracing::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve(catalogs, config).await;
            ExitCode::SUCCESS
        }
        Command::Complete {
            file,
            line,
            column,
            json,
        } => complete(catalogs, &config, file, line.zip(column), json),
        Command::Modules { pattern } => {
            let pattern = pattern.unwrap_or_default();
            for module in catalogs.modules.iter().filter(|m| m.name.contains(&pattern)) {
                match &module.path {
                    Some(path) => println!("{}\t{}", module.name, path.display()),
                    None => println!("{}", module.name),
                }
            }
            ExitCode::SUCCESS
        }
    }
}

async fn serve(catalogs: Arc<Catalogs>, config: Config) {
    tracing::info!("Starting playbook language server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(move |client| Backend::new(client, Arc::clone(&catalogs), &config));
    Server::new(stdin, stdout, socket).serve(service).await;
}

fn complete(
    catalogs: Arc<Catalogs>,
    config: &Config,
    file: PathBuf,
    position: Option<(usize, usize)>,
    json: bool,
) -> ExitCode {
    let source = match std::fs::read_to_string(&file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("failed to read {}: {}", file.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let mut request = CompletionRequest::new(source).labelled(file.display().to_string());
    if let Some((line, column)) = position {
        request = request.at(line, column);
    }

    let backend = Backend::detached(catalogs, config);
    let candidates = match backend.complete(&request) {
        Ok(candidates) => candidates,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(&candidates) {
            Ok(text) => println!("{}", text),
            Err(err) => {
                eprintln!("{}", err);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for candidate in &candidates {
            let kind = match candidate {
                playbook_lsp::Candidate::Directive(_) => "directive",
                playbook_lsp::Candidate::Module(_) => "module",
                playbook_lsp::Candidate::Parameter { .. } => "parameter",
            };
            println!("{}\t{}", kind, candidate.name());
        }
    }
    ExitCode::SUCCESS
}
