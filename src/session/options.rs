use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::encode::sink::ContainerFormat;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::caption::CaptionStyle;
use crate::render::text::{CaptionFonts, FontChoice};

/// How frame production is paced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// One frame per frame interval of the injected clock.
    #[default]
    Realtime,
    /// As fast as rendering allows; for offline encoders.
    Unpaced,
}

/// Knobs of a single generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Output frames per second.
    pub frame_rate: u32,
    /// Length of every caption and story cross-fade, in seconds. Zero disables fades.
    pub transition_secs: f64,
    /// Use the decorative caption typeface instead of the neutral one.
    pub use_decorative_font: bool,
    /// Output dimensions.
    pub canvas: Canvas,
    /// Output container.
    pub format: ContainerFormat,
    /// Frame pacing policy.
    pub pacing: Pacing,
    /// Frames between progress reports.
    pub progress_every_frames: u64,
    /// Caption band appearance.
    pub caption: CaptionStyle,
    /// Colour transparent pixels are flattened onto before encoding, straight RGBA8.
    pub background_rgba: [u8; 4],
    /// Project title; names the artifact.
    pub title: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            transition_secs: 0.5,
            use_decorative_font: false,
            canvas: Canvas::default(),
            format: ContainerFormat::default(),
            pacing: Pacing::default(),
            progress_every_frames: 30,
            caption: CaptionStyle::default(),
            background_rgba: [0, 0, 0, 255],
            title: String::new(),
        }
    }
}

impl GenerateOptions {
    /// Check every field; the first violation is returned.
    pub fn validate(&self) -> ReelResult<()> {
        Fps::whole(self.frame_rate)?;
        if !self.transition_secs.is_finite() || self.transition_secs < 0.0 {
            return Err(ReelError::validation(
                "transition_secs must be finite and >= 0",
            ));
        }
        self.canvas.validate()?;
        if self.progress_every_frames == 0 {
            return Err(ReelError::validation("progress_every_frames must be > 0"));
        }
        self.caption.validate()
    }

    /// Frame rate as an [`Fps`].
    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::whole(self.frame_rate)
    }

    /// Typeface requested by [`GenerateOptions::use_decorative_font`].
    pub fn font_choice(&self) -> FontChoice {
        FontChoice::from_flag(self.use_decorative_font)
    }
}

/// Caption font files configured by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontPaths {
    /// Plain sans-serif face.
    pub neutral: Option<PathBuf>,
    /// Decorative face.
    pub decorative: Option<PathBuf>,
}

impl FontPaths {
    /// Load the configured files, filling missing slots from well-known system locations.
    pub fn load(&self) -> ReelResult<CaptionFonts> {
        let configured =
            CaptionFonts::from_paths(self.neutral.as_deref(), self.decorative.as_deref())?;
        Ok(configured.or(CaptionFonts::discover()))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g. `"info"`, `"storyreel=debug,warn"`). `RUST_LOG` wins when set.
    pub level: String,
    /// Emit structured JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

/// Contents of the optional `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Defaults for every run.
    pub generate: GenerateOptions,
    /// Caption font files.
    pub fonts: FontPaths,
    /// Where artifacts are written. Empty means the working directory.
    pub output_dir: PathBuf,
    /// Logging setup for the binary.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Parse a JSON config file and validate its generation options.
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text).map_err(|e| {
            ReelError::validation(format!("invalid config '{}': {e}", path.display()))
        })?;
        cfg.generate.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/options.rs"]
mod tests;
