use anyhow::{ensure, Context, Result};
use clap::Parser;
use data_transformer::{
    codec, AnnotationRecord, Extent, Phase, RandomDraw, Sample, SampleDescriptor,
    TransformConfigInit, TransformPipeline,
};
use image::ImageFormat;
use log::info;
use ndarray::Axis;
use prettytable::{cell, row, Table};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Debug, Clone, Parser)]
/// Inspect transform configurations and apply them to image files.
enum Opts {
    /// Print the steps and the output shape for an input size.
    Info {
        /// configuration file
        config_file: PathBuf,
        #[clap(long)]
        height: usize,
        #[clap(long)]
        width: usize,
        #[clap(long, default_value = "3")]
        channels: usize,
        /// train or test
        #[clap(long, default_value = "train", possible_values = &["train", "test"])]
        phase: String,
    },
    /// Transform one image and write the result as an image file.
    Apply {
        /// configuration file
        config_file: PathBuf,
        /// input image
        input_file: PathBuf,
        /// output image, whose format follows the extension
        output_file: PathBuf,
        #[clap(long, default_value = "0")]
        seed: u64,
        /// train or test
        #[clap(long, default_value = "train", possible_values = &["train", "test"])]
        phase: String,
        /// crop offsets and mirror value, in the form x,y,mirror
        #[clap(long)]
        draw: Option<String>,
        /// JSON file with a list of annotations of the input
        #[clap(long)]
        annotations: Option<PathBuf>,
        /// where the adjusted annotations are written
        #[clap(long, requires = "annotations")]
        annotations_out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Info {
            config_file,
            height,
            width,
            channels,
            phase,
        } => show_info(
            config_file,
            SampleDescriptor::new(height, width, channels),
            parse_phase(&phase),
        )?,
        Opts::Apply {
            config_file,
            input_file,
            output_file,
            seed,
            phase,
            draw,
            annotations,
            annotations_out,
        } => {
            let draw = draw.as_deref().map(parse_draw).transpose()?;
            apply(
                config_file,
                input_file,
                output_file,
                seed,
                parse_phase(&phase),
                draw,
                annotations,
                annotations_out,
            )?
        }
    }

    Ok(())
}

fn parse_phase(name: &str) -> Phase {
    match name {
        "test" => Phase::Test,
        _ => Phase::Train,
    }
}

fn parse_draw(text: &str) -> Result<RandomDraw> {
    let values: Vec<u32> = text
        .split(',')
        .map(|value| value.trim().parse())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid draw '{}'", text))?;
    ensure!(
        values.len() == 3,
        "the draw must have 3 values, but get '{}'",
        text
    );
    Ok(RandomDraw::new(values[0], values[1], values[2]))
}

fn show_info(config_file: impl AsRef<Path>, descriptor: SampleDescriptor, phase: Phase) -> Result<()> {
    let config_file = config_file.as_ref();
    let config = TransformConfigInit::load(config_file)
        .with_context(|| format!("failed to load {}", config_file.display()))?
        .build()?;

    // print step information
    {
        let mut table = Table::new();
        table.add_row(row!["index", "kind", "random", "height", "width"]);

        let mut extent = Extent::exact(descriptor.height, descriptor.width);
        table.add_row(row!["", "input", "", descriptor.height, descriptor.width]);

        for (index, step) in config.steps().iter().enumerate() {
            extent = step.infer(extent, phase)?;
            let show = |exact: Option<usize>, min: usize| match exact {
                Some(size) => format!("{}", size),
                None => format!(">= {}", min),
            };
            table.add_row(row![
                index,
                step.kind(),
                step.is_random() && phase == Phase::Train,
                show(extent.height.exact, extent.height.min),
                show(extent.width.exact, extent.width.min)
            ]);
        }

        table.printstd();
    }

    let shape = data_transformer::infer_shape(&descriptor, &config, phase)?;
    if shape.is_concrete() {
        println!("output shape: {}", shape);
    } else {
        println!("output shape: {} (varies per sample)", shape);
    }

    Ok(())
}

fn apply(
    config_file: impl AsRef<Path>,
    input_file: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
    seed: u64,
    phase: Phase,
    draw: Option<RandomDraw>,
    annotations_file: Option<PathBuf>,
    annotations_out: Option<PathBuf>,
) -> Result<()> {
    let config_file = config_file.as_ref();
    let input_file = input_file.as_ref();
    let output_file = output_file.as_ref();

    let config = TransformConfigInit::load(config_file)
        .with_context(|| format!("failed to load {}", config_file.display()))?
        .build()?;
    let format = ImageFormat::from_path(output_file)
        .with_context(|| format!("unsupported output format {}", output_file.display()))?;

    let bytes =
        fs::read(input_file).with_context(|| format!("failed to read {}", input_file.display()))?;
    let image = codec::decode(&bytes)?;
    info!(
        "load {} with size {}x{}x{}",
        input_file.display(),
        image.height(),
        image.width(),
        image.channels()
    );

    let annotations = match &annotations_file {
        Some(path) => {
            let reader = BufReader::new(
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
            );
            let records: Vec<AnnotationRecord> = serde_json::from_reader(reader)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            records
                .iter()
                .map(|record| record.to_annotation())
                .collect::<Result<Vec<_>, _>>()?
        }
        None => vec![],
    };

    let mut pipeline = TransformPipeline::new(Arc::new(config), phase, seed);
    let output = pipeline.transform_with(&Sample::new(image).with_annotations(annotations), draw)?;
    let record = &output.record;
    info!(
        "output shape {}, mirror {}, draw {:?}",
        record.shape, record.mirror, record.draw
    );

    let restored = pipeline.restore(output.data.index_axis(Axis(0), 0))?;
    fs::write(output_file, codec::encode(&restored, format)?)
        .with_context(|| format!("failed to write {}", output_file.display()))?;

    if let Some(path) = &annotations_out {
        let records: Vec<AnnotationRecord> = record
            .annotations
            .iter()
            .map(AnnotationRecord::from)
            .collect();
        let writer = BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        );
        serde_json::to_writer_pretty(writer, &records)?;
        info!("write {} annotations to {}", records.len(), path.display());
    }

    Ok(())
}
