use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "schedpolicy",
    about = "Compile placement policies into scheduler constraints",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a policy for one service and print the constraints as JSON.
    ///
    /// Supported backends: k8s, marathon, metronome.
    Compile {
        /// Placement policy (JSON)
        #[arg(short, long)]
        policy: String,
        /// Service the policy is compiled for
        #[arg(short, long)]
        service: String,
        /// Target scheduler
        #[arg(short, long, default_value = "k8s")]
        backend: String,
        /// Label vocabulary overrides (TOML)
        #[arg(short, long)]
        labels: Option<String>,
        /// Node inventory in hosts-file format, used to pin specific hosts.
        /// Kubernetes only.
        #[arg(long)]
        hosts: Option<String>,
        /// Pod anti-affinity requests (JSON array). Kubernetes only.
        #[arg(long)]
        anti_affinity: Option<String>,
    },
    /// Check a policy for conflicting or ignored settings
    Validate {
        /// Placement policy (JSON)
        #[arg(short, long)]
        policy: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("schedpolicy=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            policy,
            service,
            backend,
            labels,
            hosts,
            anti_affinity,
        } => commands::compile::compile(&commands::compile::CompileArgs {
            policy: &policy,
            service: &service,
            backend: &backend,
            labels: labels.as_deref(),
            hosts: hosts.as_deref(),
            anti_affinity: anti_affinity.as_deref(),
        }),
        Commands::Validate { policy } => commands::validate::validate(&policy),
    }
}
