//! The scorecard pipeline.
//!
//! One run goes: decode, normalize and crop, binarize and label the score,
//! rebuild the score glyphs, recognize all text fields concurrently, pick
//! the layout, then (with a catalog) identify the song and analyze the play.

pub mod debug;
pub mod format;
pub mod region;

pub use format::{disambiguate, Difficulty, FormatVersion, RawReadings, RecognizedResult};
pub use region::{extract_regions, RegionSet};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Local;
use image::error::{ParameterError, ParameterErrorKind};
use image::{imageops, GrayImage, ImageError, RgbaImage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::score::{analyze, ScoreAnalysis};
use crate::catalog::{identify_song, prepare_cover, CatalogSource, SongMatch};
use crate::config::ReaderConfig;
use crate::error::{ScorecardError, ScorecardResult};
use crate::glyph::{label_components, reconstruct_score, threshold_bright_pixels};
use crate::ocr::{ensure_tesseract, CharSet, Recognizer, RecognizerPool, TesseractEngine};
use self::debug::{save_debug_images, DebugImages};

/// Crops that belong to the layout the scorecard was read with.
#[derive(Clone, Debug)]
pub struct ScorecardCrops {
    pub cover: RgbaImage,
    pub label: RgbaImage,
    pub combo: RgbaImage,
    pub score_raw: RgbaImage,
    /// Rebuilt score canvas; absent when no glyph survived
    pub score: Option<GrayImage>,
}

/// A recognized scorecard.
#[derive(Clone, Debug)]
pub struct Scorecard {
    pub result: RecognizedResult,
    pub readings: RawReadings,
    pub crops: ScorecardCrops,
    pub elapsed: Duration,
}

/// Result of the full pipeline for one image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScorecardReport {
    pub result: RecognizedResult,
    pub readings: RawReadings,
    /// Closest chart of the recognized difficulty, if the tier has any
    pub song: Option<SongMatch>,
    /// Present only when a song was matched
    pub analysis: Option<ScoreAnalysis>,
    /// Why the catalog lookup failed; the recognized result still stands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_error: Option<String>,
    pub elapsed_ms: u64,
}

/// Reads scorecards with a pool of recognizers.
pub struct ScorecardReader {
    config: ReaderConfig,
    pool: RecognizerPool,
    runs: AtomicUsize,
}

impl ScorecardReader {
    /// Builds a reader backed by Tesseract, locating (and if needed
    /// downloading) its trained data first.
    pub fn new(config: ReaderConfig) -> anyhow::Result<Self> {
        let paths = ensure_tesseract(
            config.tesseract_executable.as_deref(),
            config.tessdata_dir.as_deref(),
            &config.language,
        )?;
        let language = config.language.clone();
        Self::with_recognizer(config, move || TesseractEngine::new(&paths, &language))
    }

    /// Builds a reader whose pool workers each get a recognizer from `factory`.
    pub fn with_recognizer<R, F>(config: ReaderConfig, factory: F) -> anyhow::Result<Self>
    where
        R: Recognizer + 'static,
        F: FnMut() -> R,
    {
        let pool = RecognizerPool::new(config.pool_size, config.recognition_timeout(), factory)
            .context("Failed to start recognition workers")?;
        info!("Scorecard reader ready with {} recognizers", pool.size());

        Ok(Self {
            config,
            pool,
            runs: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Reads score, difficulty and combo from an encoded screenshot.
    pub fn recognize_scorecard(&self, bytes: &[u8]) -> ScorecardResult<Scorecard> {
        let started = Instant::now();
        let run = self.runs.fetch_add(1, Ordering::Relaxed);

        let raw = image::load_from_memory(bytes)?.to_rgba8();
        let sync = region::sync_region(raw.width(), raw.height());
        if sync.width == 0 || sync.height == 0 {
            return Err(ScorecardError::Decode(ImageError::Parameter(
                ParameterError::from_kind(ParameterErrorKind::DimensionMismatch),
            )));
        }

        let regions = extract_regions(&raw);

        let ink = threshold_bright_pixels(&regions.score, self.config.binarize_threshold);
        let labels = label_components(&ink);
        debug!("Score region: {} components", labels.component_count());
        let glyphs = reconstruct_score(&labels, &self.config.glyph_params());

        let readings = self.read_fields(&regions, glyphs.as_ref().map(|g| &g.image))?;
        info!("Recognized: {}", readings);

        if let Some(dir) = &self.config.debug_dir {
            let stem = format!("{}_{:03}", Local::now().format("%Y%m%d_%H%M%S"), run);
            let images = DebugImages {
                regions: &regions,
                labels: &labels,
                score: glyphs.as_ref().map(|g| &g.image),
            };
            if let Err(e) = save_debug_images(dir, &stem, &images) {
                warn!("Failed to save debug images: {:#}", e);
            }
        }

        let result = disambiguate(&readings)?;

        let RegionSet {
            cover,
            score,
            modern_label,
            modern_combo,
            legacy_label,
            legacy_combo,
            ..
        } = regions;
        let (label, combo) = match result.format() {
            FormatVersion::Modern => (modern_label, modern_combo),
            FormatVersion::Legacy => (legacy_label, legacy_combo),
        };

        Ok(Scorecard {
            result,
            readings,
            crops: ScorecardCrops {
                cover,
                label,
                combo,
                score_raw: score,
                score: glyphs.map(|g| g.image),
            },
            elapsed: started.elapsed(),
        })
    }

    /// Sends every text field to the pool at once and joins on all of them.
    fn read_fields(
        &self,
        regions: &RegionSet,
        score: Option<&GrayImage>,
    ) -> ScorecardResult<RawReadings> {
        let submit = |img: &RgbaImage, charset| self.pool.submit(imageops::grayscale(img), charset);

        let modern_label = submit(&regions.modern_label, CharSet::Alphabetic)?;
        let modern_combo = submit(&regions.modern_combo, CharSet::Digits)?;
        let legacy_label = submit(&regions.legacy_label, CharSet::Alphabetic)?;
        let legacy_combo = submit(&regions.legacy_combo, CharSet::Digits)?;
        let score = score
            .map(|img| self.pool.submit(img.clone(), CharSet::Digits))
            .transpose()?;

        Ok(RawReadings {
            modern_label: modern_label.wait()?,
            modern_combo: modern_combo.wait()?,
            legacy_label: legacy_label.wait()?,
            legacy_combo: legacy_combo.wait()?,
            score: match score {
                Some(pending) => pending.wait()?,
                None => String::new(),
            },
        })
    }

    /// Finds the chart a recognized scorecard belongs to.
    pub fn identify<C>(&self, scorecard: &Scorecard, catalog: &C) -> ScorecardResult<Option<SongMatch>>
    where
        C: CatalogSource + ?Sized,
    {
        let cover = prepare_cover(&scorecard.crops.cover, self.config.cover_resolution);
        identify_song(
            scorecard.result.difficulty(),
            &cover,
            catalog,
            &self.config.match_options(),
        )
    }

    /// Recognizes, identifies and analyzes one screenshot.
    ///
    /// A tier with no charts is not an error; the report then has neither a
    /// song nor an analysis. Neither is a catalog that cannot be read: the
    /// report keeps the recognized result and carries the catalog error.
    pub fn process<C>(&self, bytes: &[u8], catalog: &C) -> ScorecardResult<ScorecardReport>
    where
        C: CatalogSource + ?Sized,
    {
        let scorecard = self.recognize_scorecard(bytes)?;
        let (song, catalog_error) = match self.identify(&scorecard, catalog) {
            Ok(song) => (song, None),
            Err(e) => {
                warn!("Song lookup failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let result = scorecard.result;
        let analysis = song.as_ref().map(|m| {
            analyze(
                result.score(),
                result.combo(),
                m.entry.chart_constant,
                m.entry.note_count,
            )
        });

        if let Some(a) = &analysis {
            info!(
                "Rating {:.3}, grade {}, {}",
                a.rating, a.grade, a.clear_type
            );
        }

        Ok(ScorecardReport {
            result,
            readings: scorecard.readings,
            song,
            analysis,
            catalog_error,
            elapsed_ms: scorecard.elapsed.as_millis() as u64,
        })
    }

    /// Processes images on at most one thread per recognizer. Results come
    /// back in input order; one failure never affects the others.
    pub fn process_batch<B, C>(&self, images: &[B], catalog: &C) -> Vec<ScorecardResult<ScorecardReport>>
    where
        B: AsRef<[u8]> + Sync,
        C: CatalogSource + Sync + ?Sized,
    {
        let started = Instant::now();
        let threads = self.pool.size().min(images.len());
        let next = AtomicUsize::new(0);
        let mut slots: Vec<Option<ScorecardResult<ScorecardReport>>> =
            images.iter().map(|_| None).collect();

        thread::scope(|s| {
            let next = &next;
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(bytes) = images.get(index) else { break };
                            done.push((index, self.process(bytes.as_ref(), catalog)));
                        }
                        done
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (index, result) in done {
                            slots[index] = Some(result);
                        }
                    }
                    Err(_) => warn!("Batch thread panicked"),
                }
            }
        });

        let results: Vec<_> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(ScorecardError::recognition("pipeline thread panicked")))
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            "Batch of {} done in {:.2}s ({} failed)",
            results.len(),
            started.elapsed().as_secs_f32(),
            failed
        );
        results
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::catalog_entry;
    use super::*;
    use crate::analysis::score::{play_rating, ClearType, Grade};
    use crate::catalog::CatalogEntry;
    use crate::scorecard::region::{crop_region, COVER_REGION, SCORE_REGION};
    use approx::assert_relative_eq;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;
    use tempfile::tempdir;

    /// Answers by crop size, like a real engine reading a real modern card.
    struct FakeRecognizer {
        score: &'static str,
    }

    impl Recognizer for FakeRecognizer {
        fn recognize(&mut self, image: &GrayImage, _charset: CharSet) -> anyhow::Result<String> {
            let text = match image.dimensions() {
                (191, 38) => "FUTURE",
                (106, 35) => "1000",
                (251, 55) | (151, 66) => "",
                _ => self.score,
            };
            Ok(text.to_string())
        }
    }

    /// A fake engine that takes `delay` per call.
    struct SlowFakeRecognizer {
        inner: FakeRecognizer,
        delay: Duration,
    }

    impl Recognizer for SlowFakeRecognizer {
        fn recognize(&mut self, image: &GrayImage, charset: CharSet) -> anyhow::Result<String> {
            thread::sleep(self.delay);
            self.inner.recognize(image, charset)
        }
    }

    /// Records how many lookups run at once.
    #[derive(Default)]
    struct BusyCatalog {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CatalogSource for BusyCatalog {
        fn entries(&self, _difficulty: Option<Difficulty>) -> anyhow::Result<Vec<CatalogEntry>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(40));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn reader(score: &'static str) -> ScorecardReader {
        let config = ReaderConfig {
            pool_size: 2,
            ..ReaderConfig::default()
        };
        ScorecardReader::with_recognizer(config, move || FakeRecognizer { score }).unwrap()
    }

    /// A 1920×1080 modern scorecard: patterned cover, eight bright digit
    /// bars in the score box, dark everywhere else.
    fn scorecard_image() -> RgbaImage {
        let score_x = SCORE_REGION.x..SCORE_REGION.x + SCORE_REGION.width;
        let cover_x = COVER_REGION.x..COVER_REGION.x + COVER_REGION.width;
        let cover_y = COVER_REGION.y..COVER_REGION.y + COVER_REGION.height;

        ImageBuffer::from_fn(1920, 1080, |x, y| {
            if cover_x.contains(&x) && cover_y.contains(&y) {
                return Rgba([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 120, 255]);
            }
            let in_bar = score_x.contains(&x)
                && (SCORE_REGION.y + 15..SCORE_REGION.y + 65).contains(&y)
                && (x - SCORE_REGION.x) % 55 >= 20
                && (x - SCORE_REGION.x) < 55 * 8;
            if in_bar {
                Rgba([250, 250, 250, 255])
            } else {
                Rgba([30, 30, 40, 255])
            }
        })
    }

    fn encode(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    /// Two FUTURE charts; "testsong" uses the screenshot's own cover.
    fn catalog(dir: &std::path::Path, img: &RgbaImage) -> Vec<CatalogEntry> {
        let own = dir.join("testsong.png");
        prepare_cover(&crop_region(img, &COVER_REGION), 128).save(&own).unwrap();

        let other = dir.join("other.png");
        let plain: RgbaImage = ImageBuffer::from_pixel(128, 128, Rgba([200, 200, 10, 255]));
        plain.save(&other).unwrap();

        let mut own_entry = catalog_entry("testsong", Difficulty::Future, own);
        own_entry.chart_constant = 10.7;
        vec![
            catalog_entry("other", Difficulty::Future, other),
            own_entry,
        ]
    }

    #[test]
    fn test_recognize_modern_scorecard() {
        let reader = reader("09876543");
        let scorecard = reader.recognize_scorecard(&encode(&scorecard_image())).unwrap();

        let result = scorecard.result;
        assert_eq!(result.format(), FormatVersion::Modern);
        assert_eq!(result.difficulty(), Difficulty::Future);
        assert_eq!(result.score(), 9_876_543);
        assert_eq!(result.combo(), 1000);

        assert_eq!(scorecard.crops.label.dimensions(), (191, 38));
        assert_eq!(scorecard.crops.combo.dimensions(), (106, 35));
        assert!(scorecard.crops.score.is_some());
    }

    #[test]
    fn test_process_end_to_end() {
        let dir = tempdir().unwrap();
        let img = scorecard_image();
        let catalog = catalog(dir.path(), &img);

        let report = reader("09876543").process(&encode(&img), &catalog).unwrap();

        let song = report.song.unwrap();
        assert_eq!(song.entry.song_id, "testsong");
        assert_eq!(song.diff, 0);

        let analysis = report.analysis.unwrap();
        assert_relative_eq!(analysis.rating, play_rating(9_876_543, 10.7));
        assert_relative_eq!(analysis.rating, 10.7 + 1.0 + (9_876_543.0 - 9_800_000.0) / 200_000.0);
        assert_eq!(analysis.grade, Grade::EX);
        assert_eq!(analysis.clear_type, ClearType::Clear);
    }

    #[test]
    fn test_process_without_charts_for_tier() {
        let img = scorecard_image();
        let catalog: Vec<CatalogEntry> = Vec::new();

        let report = reader("09876543").process(&encode(&img), &catalog).unwrap();
        assert!(report.song.is_none());
        assert!(report.analysis.is_none());
        assert_eq!(report.result.score(), 9_876_543);
    }

    #[test]
    fn test_process_keeps_result_when_cover_unreadable() {
        let dir = tempdir().unwrap();
        let img = scorecard_image();
        let catalog = vec![catalog_entry(
            "missing",
            Difficulty::Future,
            dir.path().join("missing.png"),
        )];

        let report = reader("09876543").process(&encode(&img), &catalog).unwrap();
        assert_eq!(report.result.score(), 9_876_543);
        assert_eq!(report.result.difficulty(), Difficulty::Future);
        assert!(report.song.is_none());
        assert!(report.analysis.is_none());
        assert!(report.catalog_error.unwrap().contains("missing.png"));
    }

    #[test]
    fn test_batch_queue_time_does_not_count_against_timeout() {
        // One slow recognizer serves every image; together they take far
        // longer than the timeout, each call alone does not
        let config = ReaderConfig {
            pool_size: 1,
            recognition_timeout_ms: 250,
            ..ReaderConfig::default()
        };
        let reader = ScorecardReader::with_recognizer(config, || SlowFakeRecognizer {
            inner: FakeRecognizer { score: "09876543" },
            delay: Duration::from_millis(60),
        })
        .unwrap();
        let good = encode(&scorecard_image());
        let images = vec![good.clone(), good.clone(), good];
        let catalog: Vec<CatalogEntry> = Vec::new();

        let results = reader.process_batch(&images, &catalog);
        for result in &results {
            assert_eq!(result.as_ref().unwrap().result.score(), 9_876_543);
        }
    }

    #[test]
    fn test_batch_threads_capped_at_pool_size() {
        let good = encode(&scorecard_image());
        let images = vec![good; 6];
        let catalog = BusyCatalog::default();

        let results = reader("09876543").process_batch(&images, &catalog);
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(catalog.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_bad_score_is_format_error() {
        let reader = reader("9876543");
        let result = reader.recognize_scorecard(&encode(&scorecard_image()));
        match result {
            Err(ScorecardError::UnrecognizedFormat(readings)) => {
                assert_eq!(readings.score, "9876543");
                assert_eq!(readings.modern_label, "FUTURE");
            }
            other => panic!("expected format error, got {:?}", other.map(|s| s.result)),
        }
    }

    #[test]
    fn test_blank_score_region_is_format_error() {
        let img: RgbaImage = ImageBuffer::from_pixel(1920, 1080, Rgba([30, 30, 40, 255]));
        let result = reader("09876543").recognize_scorecard(&encode(&img));
        assert!(matches!(
            result,
            Err(ScorecardError::UnrecognizedFormat(ref r)) if r.score.is_empty()
        ));
    }

    #[test]
    fn test_undecodable_bytes() {
        let result = reader("09876543").recognize_scorecard(b"definitely not an image");
        assert!(matches!(result, Err(ScorecardError::Decode(_))));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dir = tempdir().unwrap();
        let img = scorecard_image();
        let catalog = catalog(dir.path(), &img);
        let good = encode(&img);
        let images = vec![good.clone(), b"garbage".to_vec(), good];

        let results = reader("09876543").process_batch(&images, &catalog);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ScorecardError::Decode(_))));
        assert_eq!(
            results[2].as_ref().unwrap().song.as_ref().unwrap().entry.song_id,
            "testsong"
        );
    }

    #[test]
    fn test_debug_images_written() {
        let dir = tempdir().unwrap();
        let config = ReaderConfig {
            pool_size: 1,
            debug_dir: Some(dir.path().to_path_buf()),
            ..ReaderConfig::default()
        };
        let reader =
            ScorecardReader::with_recognizer(config, || FakeRecognizer { score: "09876543" })
                .unwrap();
        reader.recognize_scorecard(&encode(&scorecard_image())).unwrap();

        let run_dirs: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(run_dirs.len(), 1);
        let run_dir = run_dirs[0].as_ref().unwrap().path();
        assert!(run_dir.join("score_labels.png").exists());
        assert!(run_dir.join("score_processed.png").exists());
    }
}
