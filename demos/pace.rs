use {
    anyhow::{Context, Result},
    ccthw_frame_pacer::{logging, timing::FramePacer},
    std::{sync::Arc, thread, time::Instant},
};

const DEFAULT_FPS: i32 = 30;
const DEFAULT_FRAMES: u32 = 10;

/// Usage: `pace [fps] [frames]`
fn main() -> Result<()> {
    let _logger = logging::setup()?;

    let mut args = std::env::args().skip(1);
    let fps = match args.next() {
        Some(arg) => arg
            .parse::<i32>()
            .with_context(|| format!("invalid fps {:?}", arg))?,
        None => DEFAULT_FPS,
    };
    let frames = match args.next() {
        Some(arg) => arg
            .parse::<u32>()
            .with_context(|| format!("invalid frame count {:?}", arg))?,
        None => DEFAULT_FRAMES,
    };

    let pacer = Arc::new(FramePacer::new());
    pacer.configure(fps);
    log::info!(
        "pacing {} frames at {}Hz ({}ms interval)",
        frames,
        pacer.frequency(),
        pacer.get_interval()
    );

    pacer.start()?;

    let render_thread = {
        let pacer = pacer.clone();
        thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                let start = Instant::now();
                let mut last = start;
                for frame in 0..frames {
                    pacer.wait_for_tick();
                    let now = Instant::now();
                    log::info!("frame {} after {:?}", frame, now - last);
                    last = now;
                }
                start.elapsed()
            })
            .context("Unable to spawn the render thread")?
    };

    let elapsed = render_thread
        .join()
        .map_err(|_| anyhow::anyhow!("the render thread panicked"))?;
    pacer.stop();

    log::info!("rendered {} frames in {:?}", frames, elapsed);
    Ok(())
}
