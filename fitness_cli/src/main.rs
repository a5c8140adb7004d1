use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use fitness_core::summary::format_elapsed;
use fitness_core::*;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fitx")]
#[command(about = "Workout session simulator for the FitnessX core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a GPS-tracked session along the park loop
    Track {
        /// Workout type (running, walking, cycling, swimming)
        #[arg(long = "type", default_value = "running")]
        workout_type: String,

        /// Seconds active before the pause
        #[arg(long, default_value_t = 120)]
        active: i64,

        /// Seconds spent paused (0 for no pause)
        #[arg(long, default_value_t = 0)]
        pause: i64,

        /// Seconds active after resuming
        #[arg(long, default_value_t = 0)]
        then: i64,

        /// Photo moments captured during the first active stretch
        #[arg(long, default_value_t = 0)]
        moments: i64,

        /// Movement speed multiplier (clamped to 0.5-3.0)
        #[arg(long)]
        speed: Option<f64>,

        /// Print the finished session as JSON instead of a recap
        #[arg(long)]
        json: bool,
    },

    /// Play a guided workout template set by set
    Guided {
        /// Template id (see `fitx templates`)
        template: String,

        /// Skip every rest interval
        #[arg(long)]
        skip_rest: bool,
    },

    /// List the built-in workout templates
    Templates,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    logging::init_with_level(logging::level_for_verbosity(cli.verbose));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Track {
            workout_type,
            active,
            pause,
            then,
            moments,
            speed,
            json,
        } => cmd_track(
            &config,
            TrackPlan {
                workout_type,
                active,
                pause,
                then,
                moments,
                speed,
                json,
            },
        ),
        Commands::Guided {
            template,
            skip_rest,
        } => cmd_guided(&template, skip_rest),
        Commands::Templates => cmd_templates(),
    }
}

struct TrackPlan {
    workout_type: String,
    active: i64,
    pause: i64,
    then: i64,
    moments: i64,
    speed: Option<f64>,
    json: bool,
}

fn cmd_track(config: &Config, plan: TrackPlan) -> Result<()> {
    let workout_type = WorkoutType::parse(&plan.workout_type)
        .ok_or_else(|| Error::Config(format!("Unknown workout type: {}", plan.workout_type)))?;
    if !workout_type.uses_gps() {
        return Err(Error::Config(format!(
            "{} is not GPS-tracked; use `fitx guided`",
            workout_type.display_name()
        )));
    }
    if plan.active < 0 || plan.pause < 0 || plan.then < 0 || plan.moments < 0 {
        return Err(Error::Config("durations and counts must not be negative".into()));
    }
    if plan.moments > plan.active {
        return Err(Error::Config(format!(
            "{} moments do not fit in {}s of activity",
            plan.moments, plan.active
        )));
    }

    tracing::debug!(
        "Simulating {} session: {}s active, {}s paused, {}s after resume",
        workout_type.display_name(),
        plan.active,
        plan.pause,
        plan.then
    );

    let clock = ManualClock::new(Utc::now());
    let mut controller = SessionController::from_config(clock.clone(), park_loop(), config)?;
    if let Some(speed) = plan.speed {
        controller.set_speed(speed)?;
    }
    let mut media = InMemoryMediaStore::new();

    let marks = moment_marks(plan.active, plan.moments)?;

    controller.start_with_type(workout_type)?;
    for second in 1..=plan.active {
        clock.advance_secs(1);
        controller.poll();
        for _ in marks.iter().filter(|mark| **mark == second) {
            controller.capture_moment(&mut media, b"simulated capture", MediaKind::Photo)?;
        }
    }

    if plan.pause > 0 {
        controller.pause()?;
        clock.advance_secs(plan.pause);
        controller.poll();
        controller.resume()?;
    }

    for _ in 0..plan.then {
        clock.advance_secs(1);
        controller.poll();
    }

    if plan.json {
        let mut reporter = JsonLinesReporter::new(io::stdout().lock());
        controller.end_and_report(&mut reporter)?;
    } else {
        let completed = controller.end()?;
        display_recap(completed);
    }

    Ok(())
}

/// Seconds at which to capture moments, spread evenly over the active stretch
fn moment_marks(active: i64, moments: i64) -> Result<Vec<i64>> {
    (1..=moments)
        .map(|i| {
            i.checked_mul(active)
                .map(|scaled| (scaled / (moments + 1)).max(1))
                .ok_or_else(|| Error::Config("--active is too large".into()))
        })
        .collect()
}

fn display_recap(session: &CompletedSession) {
    let summary = SessionSummary::of(session);
    let title = session
        .workout_type()
        .map_or("WORKOUT", |t| t.display_name());

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {} RECAP", title.to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Duration: {}", summary.formatted_duration());
    println!("  Distance: {}", summary.formatted_distance());
    println!("  Pace:     {}", summary.pace);
    println!("  Samples:  {}", summary.sample_count);
    println!("  Moments:  {}", summary.moment_count);

    for moment in session.moments() {
        println!(
            "    • {} @ {:.5}, {:.5}  {}",
            format_elapsed(moment.timestamp - session.start_time()),
            moment.coordinate.latitude,
            moment.coordinate.longitude,
            moment.media.name
        );
    }
    println!();
}

fn cmd_guided(template_id: &str, skip_rest: bool) -> Result<()> {
    let catalog = get_default_catalog();
    let template = catalog
        .get(template_id)
        .ok_or_else(|| Error::Catalog(format!("Unknown template: {}", template_id)))?;

    let clock = ManualClock::new(Utc::now());
    let started = clock.now();
    let mut player = ExercisePlayer::new(clock.clone(), template.steps())?;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", template.name);
    println!("╰─────────────────────────────────────────╯");
    println!();

    while let Some(step) = player.current_step().cloned() {
        let state = player.state();
        let (target, work_secs) = match step.target {
            StepTarget::Reps(reps) => (format!("{} reps", reps), i64::from(reps) * 3),
            StepTarget::DurationSeconds(secs) => (format!("{}s", secs), i64::from(secs)),
        };
        println!(
            "  [{}/{}] {}  set {}/{}  {}",
            state.step_index + 1,
            player.steps().len(),
            step.name,
            state.set_number,
            step.sets,
            target
        );
        clock.advance(Duration::seconds(work_secs));

        if player.complete_set()? != PlayerPhase::Resting {
            continue;
        }

        let rest = player.state().remaining_rest;
        if skip_rest {
            player.skip_rest()?;
            println!("        rest skipped ({}s)", rest);
        } else {
            while player.phase() == PlayerPhase::Resting {
                clock.advance_secs(1);
                player.poll();
            }
            println!("        rested {}s", rest);
        }
    }

    println!();
    println!("✓ {} complete", template.name);
    println!("  Sets:    {}", template.total_sets());
    println!("  Rested:  {}s", player.rest_consumed());
    println!("  Skipped: {}s", player.rest_skipped());
    println!("  Time:    {}", format_elapsed(clock.now() - started));
    println!();

    Ok(())
}

fn cmd_templates() -> Result<()> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Catalog("Invalid catalog".into()));
    }

    for template in catalog.sorted() {
        println!(
            "{:<18} {:<18} {:<9} {:?}, {} exercises, {} sets, ~{} min",
            template.id,
            template.name,
            template.workout_type.display_name(),
            template.difficulty,
            template.exercises.len(),
            template.total_sets(),
            template.duration_minutes
        );
    }
    Ok(())
}
