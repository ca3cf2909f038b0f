use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "workcell-sim")]
#[command(about = "Compose a simulated manipulation work-cell", long_about = None)]
pub struct Cli {
    /// Scene file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Target realtime rate, overrides the scene file (default 1.0)
    #[arg(long)]
    pub target_realtime_rate: Option<f64>,

    /// Simulated duration in seconds, overrides the scene file (default inf)
    #[arg(long)]
    pub duration: Option<f64>,

    /// Print the composed wiring as JSON
    #[arg(long, default_value_t = false)]
    pub report: bool,
}

impl Cli {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
