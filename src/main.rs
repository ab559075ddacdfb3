use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rand::thread_rng;

use delta_tilt_ik::config::Config;
use delta_tilt_ik::sweep::{evaluate, pose_grid, sample_poses, write_csv, Summary};
use delta_tilt_ik::{Actuator, Angles, Geometry, KinematicsSolver};

#[derive(Parser)]
#[command(version, about = "Drive angles for a three-armed tilt platform.")]
struct Cli {
    /// Level of verbosity.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML file with geometry and sweep settings.
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    geometry: GeometryArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct GeometryArgs {
    #[clap(long, global = true)]
    base_radius: Option<f64>,
    #[clap(long, global = true)]
    platform_radius: Option<f64>,
    #[clap(long, global = true)]
    proximal_link: Option<f64>,
    #[clap(long, global = true)]
    distal_link: Option<f64>,
}

impl GeometryArgs {
    fn apply(&self, geometry: &mut Geometry) {
        if let Some(v) = self.base_radius {
            geometry.base_radius = v;
        }
        if let Some(v) = self.platform_radius {
            geometry.platform_radius = v;
        }
        if let Some(v) = self.proximal_link {
            geometry.proximal_link = v;
        }
        if let Some(v) = self.distal_link {
            geometry.distal_link = v;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the drive angles for one pose.
    Solve {
        #[clap(allow_hyphen_values(true))]
        height: f64,
        #[clap(allow_hyphen_values(true))]
        tilt_x: f64,
        #[clap(allow_hyphen_values(true))]
        tilt_y: f64,
        /// Only solve for this actuator.
        #[clap(short, long)]
        actuator: Option<Actuator>,
    },
    /// Evaluate a grid of poses and report the reachable workspace.
    Sweep {
        /// Sample this many random poses instead of a regular grid.
        #[clap(short, long)]
        random: Option<usize>,
        #[clap(short, long)]
        steps: Option<usize>,
        #[clap(short, long)]
        tilt_limit: Option<f64>,
        /// Write every sample to this CSV file.
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the effective geometry.
    Geometry,
}

fn init_logger(verbose: u8) -> anyhow::Result<()> {
    let mut log_config = simplelog::ConfigBuilder::new();
    log_config.set_time_level(log::LevelFilter::Off);
    log_config.set_thread_level(log::LevelFilter::Off);
    log_config.set_target_level(log::LevelFilter::Off);
    log_config.set_location_level(log::LevelFilter::Off);

    let log_level = match verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    simplelog::TermLogger::init(
        log_level,
        log_config.build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    return Ok(());
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    cli.geometry.apply(&mut config.geometry);

    log::debug!("{:#?}", config);

    return Ok(config);
}

fn format_angle(angle: f64) -> String {
    if angle.is_finite() {
        return format!("{:9.3}°", angle).green().to_string();
    }
    return format!("{:>9}", angle).red().bold().to_string();
}

fn print_angles(angles: &Angles) {
    for (actuator, angle) in angles.iter() {
        println!("actuator {}: {}", actuator, format_angle(angle));
    }
}

fn solve(solver: &KinematicsSolver, height: f64, tilt_x: f64, tilt_y: f64, actuator: Option<Actuator>) {
    log::info!("Solving pose: height {:.3} tilt ({:.4}, {:.4})", height, tilt_x, tilt_y);

    let reachable = match actuator {
        Some(actuator) => {
            let angle = solver.compute_angle(actuator, height, tilt_x, tilt_y);
            println!("actuator {}: {}", actuator, format_angle(angle));
            angle.is_finite()
        }
        None => {
            let angles = solver.compute_angles(height, tilt_x, tilt_y);
            print_angles(&angles);
            angles.is_finite()
        }
    };

    if !reachable {
        log::warn!("Pose is outside the reach of the mechanism");
        println!("{}", "pose is out of reach, do not drive actuators".red());
    }
}

fn sweep(
    solver: &KinematicsSolver,
    config: &Config,
    random: Option<usize>,
    steps: Option<usize>,
    tilt_limit: Option<f64>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let heights = config.sweep.heights();
    let tilt_limit = tilt_limit.unwrap_or(config.sweep.tilt_limit);

    let poses = match random {
        Some(count) => sample_poses(&mut thread_rng(), count, heights, tilt_limit)?,
        None => pose_grid(heights, tilt_limit, steps.unwrap_or(config.sweep.steps))?,
    };
    log::info!("Evaluating {} poses", poses.len());

    let bar = ProgressBar::new(poses.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );

    let samples = evaluate(solver, &poses, Some(&bar));
    bar.finish_and_clear();

    let summary = Summary::from_samples(&samples);

    println!(
        "reachable: {} / {} ({:.1}%)",
        summary.reachable.to_string().green(),
        summary.total(),
        100.0 * summary.reachable as f64 / summary.total().max(1) as f64
    );
    if summary.unreachable > 0 {
        println!("unreachable: {}", summary.unreachable.to_string().red());
    }
    for actuator in Actuator::ALL {
        match summary.range(actuator) {
            Some(range) => println!("actuator {}: {:9.3}° .. {:9.3}°", actuator, range.min, range.max),
            None => println!("actuator {}: {}", actuator, "no reachable pose".red()),
        }
    }

    if let Some(path) = output {
        let mut writer = BufWriter::new(File::create(&path)?);
        write_csv(&mut writer, &samples)?;
        writer.flush()?;
        log::info!("Wrote {} samples to {}", samples.len(), path.display());
    }

    return Ok(());
}

fn show_geometry(solver: &KinematicsSolver, config: &Config) {
    let geometry = solver.geometry();

    println!("base radius:     {}", geometry.base_radius);
    println!("platform radius: {}", geometry.platform_radius);
    println!("proximal link:   {}", geometry.proximal_link);
    println!("distal link:     {}", geometry.distal_link);

    let height = config.sweep.mid_height();
    println!("neutral pose at height {}:", height);
    print_angles(&solver.compute_angles(height, 0.0, 0.0));
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    init_logger(args.verbose)?;

    let config = load_config(&args)?;
    let solver = KinematicsSolver::from_geometry(config.geometry);

    match args.command {
        Commands::Solve {
            height,
            tilt_x,
            tilt_y,
            actuator,
        } => solve(&solver, height, tilt_x, tilt_y, actuator),
        Commands::Sweep {
            random,
            steps,
            tilt_limit,
            output,
        } => sweep(&solver, &config, random, steps, tilt_limit, output)?,
        Commands::Geometry => show_geometry(&solver, &config),
    }

    return Ok(());
}
