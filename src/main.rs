use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use depthcast::DepthFrameBuffer;
use depthcast::capture::DepthTextures;
use depthcast::config::{DemoConfig, app_name, app_version};
use depthcast::frame::{I420Frame, PlanePool};
use depthcast::gpu::software::{SoftwareContext, SoftwareTexture};
use depthcast::gpu::{PixelFormat, TextureDesc};
use depthcast::layout::{PlaneLayout, Topology};
use depthcast::unpack::DepthView;
use depthcast::utils::perf::PackStats;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process;
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt::init();

    let matches = Command::new(app_name())
        .version(app_version())
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON file with the packer settings."),
        )
        .arg(
            Arg::new("slot-width")
                .long("slot-width")
                .value_name("PIXELS")
                .value_parser(clap::value_parser!(u32))
                .help("Width of one rendered texture slot."),
        )
        .arg(
            Arg::new("slot-height")
                .long("slot-height")
                .value_name("PIXELS")
                .value_parser(clap::value_parser!(u32))
                .help("Height of one rendered texture slot."),
        )
        .arg(
            Arg::new("topology")
                .short('t')
                .long("topology")
                .value_name("mono|stereo")
                .value_parser(clap::value_parser!(Topology))
                .help("Side-by-side texture (mono) or two-slot texture array (stereo)."),
        )
        .arg(
            Arg::new("frames")
                .short('n')
                .long("frames")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(u32))
                .help("Number of frames to pack."),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the last packed frame as raw I420."),
        )
        .arg(
            Arg::new("depth-preview")
                .long("depth-preview")
                .value_name("PNG")
                .help("Save the high depth bytes of the last frame as a grayscale PNG."),
        )
        .get_matches();

    if let Err(e) = run(&matches) {
        log::error!("{:#}", e);
        process::exit(1);
    }
}

fn load_config(matches: &ArgMatches) -> Result<DemoConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };

    if let Some(width) = matches.get_one::<u32>("slot-width") {
        config.slot_width = *width;
    }
    if let Some(height) = matches.get_one::<u32>("slot-height") {
        config.slot_height = *height;
    }
    if let Some(topology) = matches.get_one::<Topology>("topology") {
        config.topology = *topology;
    }
    if let Some(frames) = matches.get_one::<u32>("frames") {
        config.frames = *frames;
    }

    Ok(config)
}

/// Textures of a synthetic scene, laid out like a renderer would hand them over.
struct Scene {
    rendered_color: SoftwareTexture,
    staging_color: SoftwareTexture,
    rendered_depth: SoftwareTexture,
    staging_depth: SoftwareTexture,
    desc: TextureDesc,
}

impl Scene {
    fn new(config: &DemoConfig, layout: &PlaneLayout) -> Self {
        let array_size = config.topology.array_size();
        let desc = TextureDesc::new(config.slot_width, config.slot_height, PixelFormat::R8G8B8A8Unorm)
            .with_array_size(array_size);
        let staging = TextureDesc::new(layout.width() as u32, config.slot_height, PixelFormat::R8G8B8A8Unorm);

        let depth_desc = TextureDesc::new(config.slot_width, config.slot_height, PixelFormat::D16Unorm)
            .with_array_size(array_size);
        let depth_staging =
            TextureDesc::new(layout.width() as u32, config.slot_height, PixelFormat::R16Unorm);

        Self {
            rendered_color: SoftwareTexture::new("rendered-color", desc),
            staging_color: SoftwareTexture::new("staging-color", staging),
            rendered_depth: SoftwareTexture::new("rendered-depth", depth_desc),
            staging_depth: SoftwareTexture::new("staging-depth", depth_staging),
            desc,
        }
    }

    /// Draw frame `n`: a moving gradient and a depth ramp per eye.
    fn render(&self, n: u32) {
        let (w, h) = (self.desc.width.max(1), self.desc.height.max(1));
        for slot in 0..self.desc.array_size {
            self.rendered_color.fill_rgba(slot, |x, y| {
                let r = ((x + n * 8) * 255 / w) as u8;
                let g = (y * 255 / h) as u8;
                let b = if slot == 0 { 64 } else { 192 };
                [r, g, b, 255]
            });
            self.rendered_depth
                .fill_depth(slot, |x, y| ((x + y) * u16::MAX as u32 / (w + h)) as u16);
        }
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let layout = config.layout()?;
    log::info!(
        "Packing {} {} frame(s) of {}x{} into {}x{} I420",
        config.frames,
        config.topology,
        config.slot_width,
        config.slot_height,
        layout.width(),
        layout.height()
    );

    let context = SoftwareContext::new();
    let scene = Scene::new(&config, &layout);
    let stats = Arc::new(PackStats::new("demo"));
    let mut pool = PlanePool::new(layout, config.pool_size);

    let last = config.frames.saturating_sub(1);
    for n in 0..config.frames {
        scene.render(n);

        let mut planes = pool.take();
        {
            let depth = DepthTextures::new(
                &scene.staging_depth,
                &scene.rendered_depth,
                scene.rendered_depth.desc().format,
            );
            let mut buffer = DepthFrameBuffer::with_depth(
                &context,
                &scene.staging_color,
                &scene.rendered_color,
                Some(depth),
                planes.targets(),
                scene.desc,
            )
            .with_stats(stats.clone());

            match buffer.to_i420() {
                Some(frame) if n == last => save_outputs(matches, frame, layout)?,
                Some(_) => {}
                None => log::warn!("Frame {} was not packed", n),
            }
        }
        pool.put(planes);
    }

    stats.log_summary();
    Ok(())
}

fn save_outputs(matches: &ArgMatches, frame: I420Frame<'_>, layout: PlaneLayout) -> Result<()> {
    if let Some(path) = matches.get_one::<String>("output") {
        let file = File::create(path).with_context(|| format!("Cannot create {}", path))?;
        let mut out = BufWriter::new(file);
        frame.write_to(&mut out)?;
        log::info!("Wrote {}x{} I420 frame to {}", frame.width(), frame.height(), path);
    }

    if let Some(path) = matches.get_one::<String>("depth-preview") {
        save_depth_preview(frame, layout, Path::new(path))?;
    }

    Ok(())
}

fn save_depth_preview(frame: I420Frame<'_>, layout: PlaneLayout, path: &Path) -> Result<()> {
    let view = DepthView::new(frame, layout)?;
    let image = image::GrayImage::from_raw(
        layout.width() as u32,
        layout.band_height() as u32,
        view.depth_map_high(),
    )
    .ok_or_else(|| anyhow!("Depth map does not fill a {}x{} image", layout.width(), layout.band_height()))?;
    image
        .save(path)
        .with_context(|| format!("Cannot save depth preview to {}", path.display()))?;
    log::info!("Saved depth preview to {}", path.display());
    Ok(())
}
