use anyhow::Context;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use footfall::config::Config;
use footfall::detector::YoloDetector;
use footfall::drawer::Drawer;
use footfall::video::{Display, VideoSource, VideoWriter};
use footfall::{CancelToken, CountingContext, FrameSource, IouTracker, Pipeline};

const WINDOW_TITLE: &str = "Footfall Counter";

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let level = match config.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .init();

    config.validate()?;

    let mut source = VideoSource::open(&config.input)?;
    let meta = source.meta();
    let line = config.line(&meta);

    let writer = VideoWriter::create(&config.output, &meta)?;
    let cancel = CancelToken::new();
    let display = if config.display {
        Some(Display::new(WINDOW_TITLE, cancel.clone())?)
    } else {
        None
    };

    let model = config.model.to_string_lossy();
    let detector = YoloDetector::new(&model, config.detector_config())
        .with_context(|| format!("loading model {}", model))?;
    let tracker = IouTracker::new(config.tracker_config())?;
    let context = CountingContext::new(line, config.retention())?;

    let mut pipeline = Pipeline::new(detector, tracker, Drawer::default(), config.filter()?, context);
    let mut sink = (writer, display);

    let report = pipeline
        .run(&mut source, &mut sink, &cancel)
        .context("processing video")?;

    println!("\nProcessing complete!");
    println!("Total Entries: {}", report.entries);
    println!("Total Exits: {}", report.exits);

    if let Some(path) = &config.report {
        report
            .save(path)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    Ok(())
}
