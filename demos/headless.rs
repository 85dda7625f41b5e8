//! Drives the map without a window: a worker-thread loader that pretends to
//! fetch, and a surface that only tracks opacity.
//!
//! Run with `RUST_LOG=glidemap=debug cargo run --example headless`.

use glidemap::animation::fade::FadeTracker;
use glidemap::{
    InputEvent, MapBuilder, MapProfile, Point, ThreadLoader, TileId, TilePlacement, TileRequest,
    TileSurface,
};
use instant::Instant;
use std::thread;
use std::time::Duration;

/// A decoded image stand-in: just the resource key it came from
#[derive(Debug, Clone)]
struct FakeImage(String);

struct FadingSurface {
    fades: FadeTracker<FakeImage>,
    released: usize,
}

impl TileSurface<FakeImage> for FadingSurface {
    fn show(&mut self, id: TileId, image: &FakeImage, placement: TilePlacement, _fade: Duration) {
        log::info!(
            "show {} ({}) at ({:.0}, {:.0}) size {:.1}",
            id,
            image.0,
            placement.left,
            placement.top,
            placement.size
        );
        self.fades.fade_in(id, Instant::now());
    }

    fn place(&mut self, _id: TileId, _image: &FakeImage, _placement: TilePlacement) {}

    fn retire(&mut self, id: TileId, image: Option<FakeImage>, _fade: Duration) {
        if let Some(image) = image {
            self.fades.fade_out(id, image, Instant::now());
        }
    }
}

fn fetch(request: &TileRequest) -> glidemap::Result<FakeImage> {
    thread::sleep(Duration::from_millis(20));
    Ok(FakeImage(request.key.clone()))
}

fn main() -> glidemap::Result<()> {
    glidemap::init_logging();

    let mut map = MapBuilder::new()
        .with_profile(MapProfile::Snappy)
        .with_size(1024.0, 768.0)
        .with_view(52.52, 13.405, 11)
        .build(ThreadLoader::new(fetch))?;
    let mut surface = FadingSurface {
        fades: FadeTracker::new(map.config().tile_loading.fade_duration()),
        released: 0,
    };

    let frame = Duration::from_millis(16);
    for i in 0..240 {
        if i == 60 {
            map.set_view(48.8566, 2.3522, 9)?;
        }
        if i == 180 {
            map.handle_input(InputEvent::Wheel { delta: -240.0 });
            map.handle_input(InputEvent::Resize {
                size: Point::new(800.0, 600.0),
            });
        }
        map.tick(&mut surface);
        surface.released += surface.fades.sweep(Instant::now()).len();
        thread::sleep(frame);
    }

    let center = map.center();
    let stats = map.cache().stats();
    println!(
        "center ({:.4}, {:.4}) level {}: {} tracked, {} loaded, {} loading, {} stale answers, {} images released",
        center.lat,
        center.lng,
        map.zoom_level(),
        stats.tracked,
        stats.loaded,
        stats.loading,
        stats.stale_completions,
        surface.released
    );
    Ok(())
}
