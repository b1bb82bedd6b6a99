use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};
use crate::scene::model::{ImageSource, Scene, Story, TransitionStyle};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ProjectDef {
    #[serde(default)]
    pub(crate) title: String,
    pub(crate) stories: Vec<StoryDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoryDef {
    #[serde(default)]
    pub(crate) id: serde_json::Value,
    #[serde(default)]
    pub(crate) transition: Option<TransitionStyle>,
    #[serde(default)]
    pub(crate) images: Vec<SceneDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SceneDef {
    #[serde(default)]
    pub(crate) id: serde_json::Value,
    #[serde(default)]
    pub(crate) text: String,
    #[serde(default, rename = "imageData")]
    pub(crate) image_data: String,
    #[serde(default)]
    pub(crate) duration: Option<serde_json::Value>,
}

/// A titled list of stories, as saved and loaded by the editor.
///
/// The JSON shape is `{title, stories:[{id, transition, images:[{id, text, imageData, duration}]}]}`
/// where `imageData` is a base64 data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Project title, also used to name the rendered artifact.
    pub title: String,
    /// Stories in playback order.
    pub stories: Vec<Story>,
}

impl Project {
    /// Parse a project from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let def: ProjectDef = serde_json::from_reader(r)
            .map_err(|e| ReelError::validation(format!("invalid project file format: {e}")))?;
        Self::from_def(def)
    }

    /// Parse a project from a JSON string.
    pub fn from_json_str(json: &str) -> ReelResult<Self> {
        Self::from_reader(json.as_bytes())
    }

    /// Parse a project from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open project JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    fn from_def(def: ProjectDef) -> ReelResult<Self> {
        if def.title.trim().is_empty() {
            return Err(ReelError::validation(
                "invalid project file format: missing title",
            ));
        }

        let mut stories = Vec::with_capacity(def.stories.len());
        for story_def in def.stories {
            let mut story = Story::new(id_to_string(&story_def.id));
            story.transition = story_def.transition.unwrap_or_default();
            for scene_def in story_def.images {
                if scene_def.image_data.is_empty() {
                    continue;
                }
                let scene_id = id_to_string(&scene_def.id);
                let image = match decode_data_url(&scene_def.image_data) {
                    Ok(image) => image,
                    Err(e) => {
                        tracing::warn!(story = %story.id, scene = %scene_id, "skipping scene: {e}");
                        continue;
                    }
                };
                let duration = scene_def.duration.as_ref().and_then(parse_duration);
                story
                    .scenes
                    .push(Scene::new(scene_id, image, scene_def.text, duration));
            }
            stories.push(story);
        }

        Ok(Self {
            title: def.title,
            stories,
        })
    }

    /// Serialize back into the project file shape.
    pub fn to_json(&self) -> ReelResult<String> {
        let def = ProjectDef {
            title: self.title.clone(),
            stories: self
                .stories
                .iter()
                .map(|story| StoryDef {
                    id: serde_json::Value::String(story.id.clone()),
                    transition: Some(story.transition),
                    images: story
                        .scenes
                        .iter()
                        .map(|scene| SceneDef {
                            id: serde_json::Value::String(scene.id.clone()),
                            text: scene.caption().to_owned(),
                            image_data: encode_data_url(&scene.image),
                            duration: Some(serde_json::Value::from(scene.duration_secs())),
                        })
                        .collect(),
                })
                .collect(),
        };
        serde_json::to_string(&def).map_err(|e| ReelError::serde(format!("project JSON: {e}")))
    }

    /// Write the project JSON to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> ReelResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write project '{}'", path.display()))?;
        Ok(())
    }

    /// Deterministic file stem for artifacts derived from this project.
    pub fn artifact_stem(&self) -> String {
        artifact_stem(&self.title)
    }
}

/// Map a project title to a file stem: non-alphanumerics become `_`, letters are lowercased.
///
/// Empty titles fall back to `video`.
pub fn artifact_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "video".to_owned()
    } else {
        stem
    }
}

fn id_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Interpret a stored duration the way the editor's `parseInt` did.
fn parse_duration(v: &serde_json::Value) -> Option<i64> {
    match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (neg, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let v = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if neg { -v } else { v })
}

fn decode_data_url(data: &str) -> ReelResult<ImageSource> {
    let (media_type, payload) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| ReelError::validation("data URL has no payload separator"))?;
            let mut parts = meta.split(';');
            let media_type = parts.next().filter(|m| !m.is_empty()).map(str::to_owned);
            if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(ReelError::validation("data URL is not base64 encoded"));
            }
            (media_type, payload)
        }
        None => (None, data),
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ReelError::validation(format!("image data is not valid base64: {e}")))?;
    Ok(ImageSource::new(bytes, media_type))
}

fn encode_data_url(image: &ImageSource) -> String {
    let media_type = image.media_type().unwrap_or("application/octet-stream");
    format!("data:{media_type};base64,{}", STANDARD.encode(image.bytes()))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/project.rs"]
mod tests;
