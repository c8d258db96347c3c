//! Finds named UI elements on screen, by fixed coordinates or by matching a
//! template image against a screen capture.

use crate::domain::model::{Point, Region};
use crate::domain::ports::ScreenSource;
use crate::utils::error::{AutomationError, Result};
use image::{GrayImage, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub enum ElementSpec {
    Fixed(Point),
    Template {
        path: PathBuf,
        confidence: f32,
        region: Option<Region>,
        offset: (i32, i32),
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl Match {
    pub fn center(&self) -> Point {
        Point::new(
            (self.x + self.width / 2) as i32,
            (self.y + self.height / 2) as i32,
        )
    }
}

/// Best position of `needle` inside `haystack` (optionally restricted to
/// `region`) whose similarity reaches `min_confidence`.
///
/// Similarity is `1 - mean(|a - b|) / 255` over grayscale pixels. Candidates
/// are abandoned as soon as their accumulated difference exceeds the best
/// seen so far, which keeps full-screen searches tractable.
pub fn find_template(
    haystack: &GrayImage,
    needle: &GrayImage,
    region: Option<Region>,
    min_confidence: f32,
) -> Option<Match> {
    let (nw, nh) = needle.dimensions();
    if nw == 0 || nh == 0 {
        return None;
    }

    let area = region
        .unwrap_or_else(|| Region::new(0, 0, haystack.width(), haystack.height()))
        .clamp_to(haystack.width(), haystack.height())?;
    if area.width < nw || area.height < nh {
        return None;
    }

    let pixels = u64::from(nw) * u64::from(nh);
    let max_sad = ((1.0 - f64::from(min_confidence.clamp(0.0, 1.0))) * 255.0 * pixels as f64) as u64;

    let mut best: Option<(u32, u32, u64)> = None;
    let mut budget = max_sad;

    for y in area.y..=(area.y + area.height - nh) {
        for x in area.x..=(area.x + area.width - nw) {
            if let Some(sad) = sad_within(haystack, needle, x, y, budget) {
                let better = best.map(|(_, _, b)| sad < b).unwrap_or(true);
                if better {
                    best = Some((x, y, sad));
                    budget = sad;
                    if sad == 0 {
                        break;
                    }
                }
            }
        }
        if matches!(best, Some((_, _, 0))) {
            break;
        }
    }

    best.map(|(x, y, sad)| Match {
        x,
        y,
        width: nw,
        height: nh,
        confidence: 1.0 - (sad as f64 / (255.0 * pixels as f64)) as f32,
    })
}

fn sad_within(haystack: &GrayImage, needle: &GrayImage, x: u32, y: u32, budget: u64) -> Option<u64> {
    let mut sad = 0u64;
    for ny in 0..needle.height() {
        for nx in 0..needle.width() {
            let a = haystack.get_pixel(x + nx, y + ny).0[0];
            let b = needle.get_pixel(nx, ny).0[0];
            sad += u64::from(a.abs_diff(b));
        }
        if sad > budget {
            return None;
        }
    }
    Some(sad)
}

pub fn to_gray(image: &RgbaImage) -> GrayImage {
    image::DynamicImage::ImageRgba8(image.clone()).to_luma8()
}

/// Resolves element names to screen points for one workflow run.
pub struct ElementLocator {
    elements: HashMap<String, ElementSpec>,
    templates: HashMap<PathBuf, GrayImage>,
    poll_interval: Duration,
    default_timeout: Duration,
}

impl ElementLocator {
    pub fn new(elements: HashMap<String, ElementSpec>) -> Self {
        Self {
            elements,
            templates: HashMap::new(),
            poll_interval: Duration::from_millis(250),
            default_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timing(mut self, poll_interval: Duration, default_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.default_timeout = default_timeout;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn spec(&self, name: &str) -> Result<&ElementSpec> {
        self.elements
            .get(name)
            .ok_or_else(|| AutomationError::UnknownElement {
                name: name.to_string(),
            })
    }

    /// Registers an already decoded template, bypassing the filesystem.
    pub fn preload_template(&mut self, path: PathBuf, image: GrayImage) {
        self.templates.insert(path, image);
    }

    fn template(&mut self, path: &Path) -> Result<&GrayImage> {
        if !self.templates.contains_key(path) {
            tracing::debug!("Loading template {}", path.display());
            let image = image::open(path)?.to_luma8();
            self.templates.insert(path.to_path_buf(), image);
        }
        self.templates
            .get(path)
            .ok_or_else(|| AutomationError::ProcessingError {
                message: format!("template cache miss for {}", path.display()),
            })
    }

    /// One capture, one match attempt. `Ok(None)` when not currently visible.
    pub fn locate_once(&mut self, name: &str, screen: &dyn ScreenSource) -> Result<Option<Point>> {
        match self.spec(name)?.clone() {
            ElementSpec::Fixed(point) => Ok(Some(point)),
            ElementSpec::Template {
                path,
                confidence,
                region,
                offset,
            } => {
                let needle = self.template(&path)?.clone();
                let capture = to_gray(&screen.capture()?);
                let found = find_template(&capture, &needle, region, confidence);
                if let Some(m) = &found {
                    tracing::debug!(
                        element = name,
                        confidence = m.confidence,
                        "Found '{}' at ({}, {})",
                        name,
                        m.x,
                        m.y
                    );
                }
                Ok(found.map(|m| m.center().offset(offset.0, offset.1)))
            }
        }
    }

    /// Polls until the element appears or `timeout` (default when `None`) elapses.
    pub async fn wait_for(
        &mut self,
        name: &str,
        screen: &dyn ScreenSource,
        timeout: Option<Duration>,
    ) -> Result<Point> {
        let timeout = timeout.unwrap_or(self.default_timeout);
        let started = Instant::now();

        loop {
            if let Some(point) = self.locate_once(name, screen)? {
                return Ok(point);
            }
            if started.elapsed() >= timeout {
                return Err(AutomationError::ElementNotFound {
                    element: name.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba};

    fn noise_image(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
            h ^= h >> 13;
            h = h.wrapping_mul(0x5bd1_e995);
            h ^= h >> 15;
            Luma([(h & 0xff) as u8])
        })
    }

    fn crop(image: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        image::imageops::crop_imm(image, x, y, w, h).to_image()
    }

    struct StaticScreen(RgbaImage);

    impl ScreenSource for StaticScreen {
        fn capture(&self) -> Result<RgbaImage> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_exact_match_found() {
        let screen = noise_image(120, 80);
        let needle = crop(&screen, 40, 25, 16, 10);

        let found = find_template(&screen, &needle, None, 0.99).unwrap();
        assert_eq!((found.x, found.y), (40, 25));
        assert!((found.confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(found.center(), Point::new(48, 30));
    }

    #[test]
    fn test_below_confidence_rejected() {
        let screen = GrayImage::from_pixel(60, 60, Luma([0]));
        let needle = GrayImage::from_pixel(8, 8, Luma([200]));
        assert!(find_template(&screen, &needle, None, 0.9).is_none());
        // 1 - 200/255 ~= 0.216
        assert!(find_template(&screen, &needle, None, 0.2).is_some());
    }

    #[test]
    fn test_region_restricts_search() {
        let screen = noise_image(120, 80);
        let needle = crop(&screen, 40, 25, 16, 10);

        let outside = Region::new(70, 0, 50, 80);
        assert!(find_template(&screen, &needle, Some(outside), 0.99).is_none());

        let inside = Region::new(30, 20, 40, 30);
        let found = find_template(&screen, &needle, Some(inside), 0.99).unwrap();
        assert_eq!((found.x, found.y), (40, 25));
    }

    #[test]
    fn test_needle_larger_than_haystack() {
        let screen = noise_image(10, 10);
        let needle = noise_image(20, 5);
        assert!(find_template(&screen, &needle, None, 0.5).is_none());
    }

    #[tokio::test]
    async fn test_locator_resolves_fixed_and_template() {
        let gray = noise_image(100, 60);
        let rgba = RgbaImage::from_fn(100, 60, |x, y| {
            let v = gray.get_pixel(x, y).0[0];
            Rgba([v, v, v, 255])
        });
        let screen = StaticScreen(rgba);

        let mut elements = HashMap::new();
        elements.insert("campo_usuario".to_string(), ElementSpec::Fixed(Point::new(5, 6)));
        elements.insert(
            "botao_entrar".to_string(),
            ElementSpec::Template {
                path: PathBuf::from("botao_entrar.png"),
                confidence: 0.95,
                region: None,
                offset: (2, -1),
            },
        );

        let mut locator = ElementLocator::new(elements);
        locator.preload_template(PathBuf::from("botao_entrar.png"), crop(&gray, 10, 20, 12, 8));

        assert_eq!(
            locator.locate_once("campo_usuario", &screen).unwrap(),
            Some(Point::new(5, 6))
        );
        let point = locator.wait_for("botao_entrar", &screen, None).await.unwrap();
        assert_eq!(point, Point::new(10 + 6 + 2, 20 + 4 - 1));
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let screen = StaticScreen(RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255])));
        let mut elements = HashMap::new();
        elements.insert(
            "aviso".to_string(),
            ElementSpec::Template {
                path: PathBuf::from("aviso.png"),
                confidence: 0.9,
                region: None,
                offset: (0, 0),
            },
        );
        let mut locator = ElementLocator::new(elements)
            .with_timing(Duration::from_millis(5), Duration::from_millis(20));
        locator.preload_template(PathBuf::from("aviso.png"), GrayImage::from_pixel(4, 4, Luma([255])));

        let err = locator.wait_for("aviso", &screen, None).await.unwrap_err();
        assert!(matches!(err, AutomationError::ElementNotFound { timeout_ms: 20, .. }));
        assert!(matches!(
            locator.locate_once("inexistente", &screen),
            Err(AutomationError::UnknownElement { .. })
        ));
    }
}
