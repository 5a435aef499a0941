use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader, RgbaImage};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ThumbnailEncoding;
use crate::error::{ProviderError, Result};

/// Requested thumbnail bounds, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub width: u32,
    pub height: u32,
}

impl SizeHint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Power-of-two subsampling factor for a source of `width` x `height`.
///
/// Thumbnails should not be more than double the requested size: the factor
/// keeps doubling while half of either source dimension, divided by the
/// factor, still reaches the hint on that axis.
pub fn sample_size(width: u32, height: u32, hint: SizeHint) -> u32 {
    let pre_width = width / 2;
    let pre_height = height / 2;
    // A zero hint would never stop the loop
    let hint_width = hint.width.max(1);
    let hint_height = hint.height.max(1);

    let mut sample = 1u32;
    while pre_height / sample >= hint_height || pre_width / sample >= hint_width {
        sample <<= 1;
    }
    sample
}

/// Dimensions of a source after subsampling, never below 1x1
pub fn scaled_dimensions(width: u32, height: u32, sample: u32) -> (u32, u32) {
    ((width / sample).max(1), (height / sample).max(1))
}

/// Pixel storage reused between thumbnail generations.
///
/// `width`/`height` describe the largest bitmap the allocation was sized for,
/// not the bitmap currently held in `pixels`.
#[derive(Debug)]
pub struct DecodeSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodeSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Vec::with_capacity(width as usize * height as usize * 4),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        self.width >= width && self.height >= height
    }
}

/// Slot holding the largest decode surface seen so far.
///
/// Reuse is best-effort: a surface is checked out for the duration of one
/// generation, so concurrent requests simply allocate their own.
#[derive(Debug, Default)]
pub struct ReusableDecodeBuffer {
    slot: Mutex<Option<DecodeSurface>>,
}

impl ReusableDecodeBuffer {
    /// Take the held surface if it is at least `width` x `height`
    pub fn checkout(&self, width: u32, height: u32) -> Option<DecodeSurface> {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|held| held.fits(width, height)) {
            slot.take()
        } else {
            None
        }
    }

    /// Keep `surface` if the slot is empty or it is larger on either axis;
    /// otherwise it is dropped.
    pub fn offer(&self, surface: DecodeSurface) {
        let mut slot = self.slot.lock();
        let replace = match slot.as_ref() {
            None => true,
            Some(held) => held.width < surface.width || held.height < surface.height,
        };
        if replace {
            *slot = Some(surface);
        }
    }

    /// Dimensions of the held surface, if any
    pub fn held_dimensions(&self) -> Option<(u32, u32)> {
        self.slot.lock().as_ref().map(|held| (held.width, held.height))
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

/// Average `sample` x `sample` blocks of `src` into `out` (RGBA8, row-major).
/// `out` keeps its capacity; returns the output dimensions.
fn downsample_into(src: &RgbaImage, sample: u32, out: &mut Vec<u8>) -> (u32, u32) {
    let (src_width, src_height) = src.dimensions();
    let (dst_width, dst_height) = scaled_dimensions(src_width, src_height, sample);

    out.clear();
    out.reserve(dst_width as usize * dst_height as usize * 4);

    for oy in 0..dst_height {
        let y0 = oy * sample;
        let y1 = (y0 + sample).min(src_height);
        for ox in 0..dst_width {
            let x0 = ox * sample;
            let x1 = (x0 + sample).min(src_width);

            let mut acc = [0u64; 4];
            let mut count = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    let pixel = src.get_pixel(x, y).0;
                    for (sum, channel) in acc.iter_mut().zip(pixel) {
                        *sum += channel as u64;
                    }
                    count += 1;
                }
            }
            let count = count.max(1);
            out.extend(acc.iter().map(|sum| (sum / count) as u8));
        }
    }

    (dst_width, dst_height)
}

/// Composite RGBA over white, for encoders without alpha
fn flatten_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let alpha = px[3] as u32;
        for &channel in &px[..3] {
            rgb.push(((channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8);
        }
    }
    rgb
}

/// Result of [`ThumbnailCache::ensure`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedThumbnail {
    pub path: PathBuf,
    /// false when the file was already in the cache
    pub generated: bool,
}

/// On-disk thumbnail cache keyed by source file name.
///
/// A thumbnail is generated on first request and then served as-is: the
/// cache never checks whether the source changed or was deleted.
#[derive(Debug)]
pub struct ThumbnailCache {
    dir: PathBuf,
    encoding: ThumbnailEncoding,
    reuse: ReusableDecodeBuffer,
}

impl ThumbnailCache {
    pub fn new(dir: impl Into<PathBuf>, encoding: ThumbnailEncoding) -> Self {
        Self {
            dir: dir.into(),
            encoding,
            reuse: ReusableDecodeBuffer::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn reuse_buffer(&self) -> &ReusableDecodeBuffer {
        &self.reuse
    }

    /// Cache location for a source file (same file name, cache directory)
    pub fn cache_path(&self, source: &Path) -> Option<PathBuf> {
        source.file_name().map(|name| self.dir.join(name))
    }

    /// Return the cached thumbnail for `source`, generating it first if missing
    pub fn ensure(&self, source: &Path, hint: SizeHint) -> Result<CachedThumbnail> {
        let path = self.cache_path(source).ok_or_else(|| {
            ProviderError::DocumentNotFound(format!(
                "No thumbnail for document with id {}",
                source.display()
            ))
        })?;

        if path.exists() {
            debug!("Thumbnail cache hit: {}", path.display());
            return Ok(CachedThumbnail { path, generated: false });
        }

        fs::create_dir_all(&self.dir)?;
        self.generate(source, &path, hint)?;
        Ok(CachedThumbnail { path, generated: true })
    }

    /// Decode `source`, downsample by the sample factor and encode into `target`.
    ///
    /// `image` has no sampled decode, so the full-resolution frame is always
    /// allocated; `into_rgba8` moves it without a copy when it is already
    /// RGBA8. Only the downsampled output goes through the reuse slot.
    fn generate(&self, source: &Path, target: &Path, hint: SizeHint) -> Result<()> {
        // Bounds first, so the sample factor is known before the full decode
        let (width, height) = ImageReader::open(source)?
            .with_guessed_format()?
            .into_dimensions()?;
        let sample = sample_size(width, height, hint);

        let decoded = ImageReader::open(source)?
            .with_guessed_format()?
            .decode()?
            .into_rgba8();
        let (dst_width, dst_height) =
            scaled_dimensions(decoded.width(), decoded.height(), sample);

        let mut surface = match self.reuse.checkout(dst_width, dst_height) {
            Some(surface) => {
                debug!(
                    "Reusing {}x{} decode surface for {}x{}",
                    surface.width, surface.height, dst_width, dst_height
                );
                surface
            }
            None => DecodeSurface::new(dst_width, dst_height),
        };
        downsample_into(&decoded, sample, &mut surface.pixels);

        let written = self.write_encoded(target, &surface.pixels, dst_width, dst_height);
        self.reuse.offer(surface);
        written?;

        info!(
            "📸 Generated thumbnail: {} ({}x{} -> {}x{}, sample {})",
            target.display(),
            width,
            height,
            dst_width,
            dst_height,
            sample
        );
        Ok(())
    }

    /// Encode into a temporary file next to `target`, then move it into place,
    /// so a failed encode never leaves a partial cache entry behind.
    fn write_encoded(&self, target: &Path, rgba: &[u8], width: u32, height: u32) -> Result<()> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = target.with_file_name(format!(".{}.{}.part", name, uuid::Uuid::new_v4().simple()));

        let result = (|| -> Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            match self.encoding {
                ThumbnailEncoding::Png => {
                    PngEncoder::new(&mut writer).write_image(
                        rgba,
                        width,
                        height,
                        ExtendedColorType::Rgba8,
                    )?;
                }
                ThumbnailEncoding::Jpeg { quality } => {
                    let rgb = flatten_alpha(rgba);
                    JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100)).write_image(
                        &rgb,
                        width,
                        height,
                        ExtendedColorType::Rgb8,
                    )?;
                }
            }
            writer.flush()?;
            drop(writer);
            fs::rename(&tmp, target)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

/// Summary of a warm-up pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmSummary {
    pub generated: usize,
    pub cached: usize,
    pub failed: usize,
}

/// Make sure every source has a cached thumbnail.
/// Runs the decodes one at a time on tokio's blocking pool.
pub async fn warm_thumbnails(
    cache: Arc<ThumbnailCache>,
    sources: Vec<PathBuf>,
    hint: SizeHint,
) -> WarmSummary {
    let mut summary = WarmSummary::default();

    for source in sources {
        let cache = Arc::clone(&cache);
        let shown = source.display().to_string();
        let result = tokio::task::spawn_blocking(move || cache.ensure(&source, hint)).await;

        match result {
            Ok(Ok(thumb)) if thumb.generated => summary.generated += 1,
            Ok(Ok(_)) => summary.cached += 1,
            Ok(Err(e)) => {
                warn!("⚠️  Thumbnail failed for {}: {}", shown, e);
                summary.failed += 1;
            }
            Err(e) => {
                warn!("⚠️  Thumbnail task join error for {}: {}", shown, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "✅ Thumbnail warm-up: {} generated, {} cached, {} failed",
        summary.generated, summary.cached, summary.failed
    );
    summary
}
