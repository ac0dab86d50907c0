#[macro_use]
extern crate slog;

use anyhow::Context;
use clap::{clap_app, App, ArgMatches};
use hyper2color::{
    colorimetry::{ColorSpace, Illuminant, IntegrationStep, Interpolation, OutputFormat},
    common::RenderError,
    cube::{self, CubeMetadata, ManualGeometry},
    render::{Film, RawSink, RenderOptions, Renderer, ScanlineSink},
};
use slog::Drain;
use std::path::Path;

fn new_drain(level: slog::Level) -> slog::Fuse<slog::LevelFilter<slog::Fuse<slog_async::Async>>> {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    drain.filter_level(level).fuse()
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches.value_of(name).ok_or_else(|| {
        RenderError::Configuration(format!("missing required argument '{}'", name)).into()
    })
}

fn parse_count(value: &str, name: &str) -> anyhow::Result<usize> {
    value
        .parse::<usize>()
        .with_context(|| RenderError::Configuration(format!("invalid {} '{}'", name, value)))
}

fn manual_geometry(matches: &ArgMatches) -> anyhow::Result<ManualGeometry> {
    let count = |name: &str, what: &str| {
        matches
            .value_of(name)
            .map(|value| parse_count(value, what))
            .transpose()
    };

    Ok(ManualGeometry {
        width: count("width", "width")?,
        height: count("height", "height")?,
        bands: count("bands", "band count")?,
    })
}

fn open_sink(
    log: &slog::Logger,
    path: &Path,
    metadata: &CubeMetadata,
    options: &RenderOptions,
) -> anyhow::Result<Box<dyn ScanlineSink>> {
    let is_raw = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("raw"))
        .unwrap_or(false);

    if is_raw {
        let row_bytes = options.format.row_bytes(metadata.sample_count);
        return Ok(Box::new(RawSink::create(path, row_bytes)?));
    }

    let dimension = |n: usize| {
        u32::try_from(n).with_context(|| {
            RenderError::Configuration(format!("{} pixels is too large for an image", n))
        })
    };
    let resolution = (
        dimension(metadata.sample_count)?,
        dimension(metadata.scanline_count)?,
    );

    Ok(Box::new(Film::new(
        log,
        path,
        resolution,
        options.color_space,
        options.format,
    )?))
}

fn run(log: &slog::Logger, matches: &ArgMatches) -> anyhow::Result<()> {
    let input = Path::new(required(matches, "input")?);
    let output = Path::new(required(matches, "output")?);

    let bits = required(matches, "bits")?;
    let bits = bits
        .parse::<u32>()
        .with_context(|| RenderError::Configuration(format!("invalid bit depth '{}'", bits)))?;

    let options = RenderOptions {
        illuminant: required(matches, "temperature")?.parse::<Illuminant>()?,
        color_space: required(matches, "space")?.parse::<ColorSpace>()?,
        format: OutputFormat::from_bits(bits)?,
        interpolation: if matches.is_present("linear") {
            Interpolation::Linear
        } else {
            Interpolation::CubicSpline
        },
        step: if matches.is_present("preview") {
            IntegrationStep::Preview
        } else {
            IntegrationStep::Full
        },
        progress: true,
    };
    let renderer = Renderer::new(log, options.clone())?;

    let mut cube = cube::open(log, input, manual_geometry(matches)?)?;
    let metadata = cube.metadata().clone();
    info!(
        log,
        "{}: {}x{} pixels, {} bands from {:.1}nm to {:.1}nm",
        input.display(),
        metadata.sample_count,
        metadata.scanline_count,
        metadata.band_count,
        metadata.wavelengths.first().copied().unwrap_or_default(),
        metadata.wavelengths.last().copied().unwrap_or_default()
    );
    info!(
        log,
        "{} output under {}, {} bits per channel",
        options.color_space,
        options.illuminant,
        options.format.bits()
    );

    let mut sink = open_sink(log, output, &metadata, &options)?;
    renderer.render(cube.as_mut(), sink.as_mut())
}

fn app() -> App<'static, 'static> {
    clap_app!(hyper2color =>
        (version: "0.1")
        (author: "Eric F. <eric1221bday@gmail.com>")
        (about: "Renders true color images from hyperspectral cubes")
        (@arg input: -i --input +takes_value +required "Hyperspectral cube to read")
        (@arg output: -o --output +takes_value +required "Output image (.png, .tif, .exr) or headerless samples (.raw)")
        (@arg temperature: -t --temperature +takes_value default_value("D65") "Illuminant: D65, D50, D75, D93, A or a color temperature in Kelvin")
        (@arg space: -s --space +takes_value default_value("sRGB") "Output color space: CIELAB, sRGB or AdobeRGB")
        (@arg bits: -b --bits +takes_value default_value("8") "Output bits per channel: 8, 16 or 32 (float)")
        (@arg width: -x --width +takes_value "Override the cube width in pixels")
        (@arg height: -y --height +takes_value "Override the cube height in scanlines")
        (@arg bands: -c --bands +takes_value "Override the band count (40, 80 or 160) and use that sensor's wavelengths")
        (@arg linear: --linear "Interpolate spectra linearly instead of with a cubic spline")
        (@arg preview: --preview "Integrate every 5nm instead of every 1nm")
        (@arg verbose: -v --verbose "Print debug information")
    )
}

fn main() {
    let matches = app().get_matches();

    let level = if matches.is_present("verbose") {
        slog::Level::Debug
    } else {
        slog::Level::Info
    };
    let log = slog::Logger::root(new_drain(level), o!());

    if let Err(e) = run(&log, &matches) {
        crit!(log, "{:#}", e);
        // flush the async drain before exiting
        drop(log);
        std::process::exit(1);
    }
}
