use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::{ClassificationConfig, ThresholdMethod};
use crate::semester::Semester;

#[derive(Parser, Debug)]
#[command(
    name = "inad-screen",
    version,
    about = "Semester screening of inadmissible-passenger refusals by airline and route"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Semesters(SemestersArgs),
    Analyze(AnalyzeArgs),
    Publish(PublishArgs),
    History(HistoryArgs),
    Compare(CompareArgs),
    Summary(SummaryArgs),
    Codes(CodesArgs),
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Refusal CSV (`airline,last_stop,year,month,refusal_code[,airline_name]`).
    #[arg(long)]
    pub inad: PathBuf,

    /// Passenger CSV (`airline,airport,pax,year,month`).
    #[arg(long)]
    pub pax: PathBuf,

    /// `carrier;last_stop;partner` lines whose passengers are pooled.
    #[arg(long)]
    pub partner_map: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ThresholdMethodArg {
    Median,
    Mean,
    TrimmedMean,
}

impl From<ThresholdMethodArg> for ThresholdMethod {
    fn from(value: ThresholdMethodArg) -> Self {
        match value {
            ThresholdMethodArg::Median => Self::Median,
            ThresholdMethodArg::Mean => Self::Mean,
            ThresholdMethodArg::TrimmedMean => Self::TrimmedMean,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClassificationArgs {
    #[arg(long, default_value_t = 6)]
    pub min_inad: usize,

    #[arg(long, default_value_t = 5000)]
    pub min_pax: u64,

    #[arg(long, default_value_t = 0.10)]
    pub min_density: f64,

    #[arg(long, default_value_t = 1.5)]
    pub high_priority_multiplier: f64,

    #[arg(long, default_value_t = 10)]
    pub high_priority_min_inad: usize,

    #[arg(long, value_enum, default_value_t = ThresholdMethodArg::Median)]
    pub threshold_method: ThresholdMethodArg,

    #[arg(long, default_value_t = 0.1)]
    pub trimmed_percent: f64,

    #[arg(long, default_value_t = 2)]
    pub systemic_semesters: usize,

    #[arg(long, default_value_t = 4)]
    pub pax_completeness_months: usize,
}

impl ClassificationArgs {
    pub fn config(&self) -> ClassificationConfig {
        ClassificationConfig {
            min_inad: self.min_inad,
            min_pax: self.min_pax,
            min_density: self.min_density,
            high_priority_multiplier: self.high_priority_multiplier,
            high_priority_min_inad: self.high_priority_min_inad,
            threshold_method: self.threshold_method.into(),
            trimmed_percent: self.trimmed_percent,
            systemic_semesters: self.systemic_semesters,
            pax_completeness_months: self.pax_completeness_months,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SemestersArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// `2024 H1`, `2024-H2` or `H1 2024`; defaults to the latest semester with data.
    #[arg(long, value_parser = Semester::parse)]
    pub semester: Option<Semester>,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    #[arg(long)]
    pub csv_out: Option<PathBuf>,

    #[arg(long)]
    pub manifest_out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, value_parser = Semester::parse)]
    pub semester: Option<Semester>,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    #[arg(long, value_parser = Semester::parse)]
    pub current: Semester,

    #[arg(long, value_parser = Semester::parse)]
    pub previous: Semester,

    /// Also report route totals for one airline code.
    #[arg(long)]
    pub airline: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, value_parser = Semester::parse)]
    pub semester: Option<Semester>,

    #[command(flatten)]
    pub classification: ClassificationArgs,

    /// Restrict the summary to one airline code.
    #[arg(long)]
    pub airline: Option<String>,

    /// Include systemic cases from every semester up to the selected one.
    #[arg(long, default_value_t = false)]
    pub systemic: bool,

    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CodesArgs {
    #[arg(long)]
    pub inad: PathBuf,

    #[arg(long, value_parser = Semester::parse)]
    pub semester: Option<Semester>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub snapshot: PathBuf,
}
