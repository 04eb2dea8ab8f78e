use crate::models::Province;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aq-bulletin")]
#[command(about = "Daily air-quality bulletins for the provinces of Emilia-Romagna")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Settings file [default: aq-bulletin.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, evaluate and publish bulletins
    Run {
        #[arg(short, long, help = "Day to report (YYYY-MM-DD) [default: yesterday]")]
        date: Option<NaiveDate>,

        #[arg(
            short,
            long = "province",
            help = "Province code or name, repeatable [default: all nine]"
        )]
        provinces: Vec<Province>,

        #[arg(short, long, help = "Output directory [default: from settings]")]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Station registry CSV [default: from settings]")]
        stations_file: Option<PathBuf>,

        #[arg(long, help = "Keep the raw datastore response next to each bulletin")]
        save_raw: bool,

        #[arg(long, help = "Leave charts out of the HTML pages")]
        no_charts: bool,
    },

    /// Print the SQL that would be sent for a province
    Query {
        #[arg(short, long, help = "Day to query [default: yesterday]")]
        date: Option<String>,

        #[arg(short, long)]
        province: Province,

        #[arg(
            short,
            long = "station",
            help = "Station codes to query instead of the registry's, repeatable"
        )]
        stations: Vec<String>,

        #[arg(long, help = "Station registry CSV [default: from settings]")]
        stations_file: Option<PathBuf>,
    },

    /// Re-evaluate a saved raw response offline
    Evaluate {
        #[arg(short, long, help = "Raw datastore response (.raw.json)")]
        input: PathBuf,

        #[arg(short, long)]
        province: Province,

        #[arg(
            short,
            long,
            help = "Day the response covers \
                    [default: from the input's directory name, else yesterday]"
        )]
        date: Option<NaiveDate>,

        #[arg(short, long, help = "Output directory [default: from settings]")]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Station registry CSV [default: from settings]")]
        stations_file: Option<PathBuf>,
    },

    /// List registered stations by province
    Stations {
        #[arg(short, long)]
        province: Option<Province>,

        #[arg(long, help = "Station registry CSV [default: from settings]")]
        stations_file: Option<PathBuf>,
    },

    /// Show the regulatory thresholds that are checked
    Thresholds,
}
