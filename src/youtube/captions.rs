//! yt-dlp metadata and YouTube `json3` caption tracks.

use crate::types::{AppError, Result, TranscriptSegment};
use serde::Deserialize;
use std::collections::HashMap;

/// The subset of `yt-dlp --dump-single-json` output we read
#[derive(Debug, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Seconds; fractional for some extractors
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub subtitles: HashMap<String, Vec<CaptionTrack>>,
    #[serde(default)]
    pub automatic_captions: HashMap<String, Vec<CaptionTrack>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(default)]
    pub ext: Option<String>,
    pub url: String,
}

/// URL of the `json3` track for `language`. Manual subtitles win over
/// automatic captions; an exact language key wins over a regional variant
/// such as `en-US`.
pub fn select_caption_url(info: &VideoInfo, language: &str) -> Option<String> {
    [&info.subtitles, &info.automatic_captions]
        .into_iter()
        .find_map(|tracks| json3_track(tracks, language))
}

fn json3_track(tracks: &HashMap<String, Vec<CaptionTrack>>, language: &str) -> Option<String> {
    let pick = |list: &Vec<CaptionTrack>| {
        list.iter()
            .find(|t| t.ext.as_deref() == Some("json3"))
            .map(|t| t.url.clone())
    };

    if let Some(url) = tracks.get(language).and_then(pick) {
        return Some(url);
    }

    let prefix = format!("{}-", language);
    let mut variants: Vec<&String> = tracks.keys().filter(|k| k.starts_with(&prefix)).collect();
    variants.sort();
    variants
        .into_iter()
        .find_map(|k| tracks.get(k).and_then(pick))
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: Option<f64>,
    #[serde(default)]
    d_duration_ms: Option<f64>,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a `json3` caption document into timed segments. Events without
/// text (window/style events, bare newlines) are dropped.
pub fn parse_json3(body: &str) -> Result<Vec<TranscriptSegment>> {
    let doc: Json3 = serde_json::from_str(body)
        .map_err(|e| AppError::Internal(format!("Invalid caption track: {}", e)))?;

    let segments = doc
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs?
                .into_iter()
                .map(|s| s.utf8)
                .collect::<String>()
                .replace('\n', " ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start: event.t_start_ms.unwrap_or(0.0) / 1000.0,
                duration: event.d_duration_ms.unwrap_or(0.0) / 1000.0,
            })
        })
        .collect();

    Ok(segments)
}

/// Download and parse a caption track
pub async fn fetch_caption_segments(
    http: &reqwest::Client,
    url: &str,
) -> Result<Vec<TranscriptSegment>> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to download captions: {}", e.without_url())))?;

    if !response.status().is_success() {
        return Err(AppError::Internal(format!(
            "Caption download failed with status {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read captions: {}", e)))?;

    parse_json3(&body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(ext: &str, url: &str) -> CaptionTrack {
        CaptionTrack {
            ext: Some(ext.to_string()),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_manual_subtitles_preferred() {
        let mut info = VideoInfo::default();
        info.subtitles
            .insert("en".into(), vec![track("vtt", "manual.vtt"), track("json3", "manual.json3")]);
        info.automatic_captions
            .insert("en".into(), vec![track("json3", "auto.json3")]);

        assert_eq!(select_caption_url(&info, "en").as_deref(), Some("manual.json3"));
    }

    #[test]
    fn test_falls_back_to_automatic_captions() {
        let mut info = VideoInfo::default();
        info.subtitles.insert("de".into(), vec![track("json3", "de.json3")]);
        info.automatic_captions
            .insert("en".into(), vec![track("srv1", "auto.srv1"), track("json3", "auto.json3")]);

        assert_eq!(select_caption_url(&info, "en").as_deref(), Some("auto.json3"));
    }

    #[test]
    fn test_regional_variant_used_when_exact_missing() {
        let mut info = VideoInfo::default();
        info.subtitles.insert("en-US".into(), vec![track("json3", "us.json3")]);
        assert_eq!(select_caption_url(&info, "en").as_deref(), Some("us.json3"));
    }

    #[test]
    fn test_no_json3_track() {
        let mut info = VideoInfo::default();
        info.subtitles.insert("en".into(), vec![track("vtt", "x.vtt")]);
        assert_eq!(select_caption_url(&info, "en"), None);
    }

    #[test]
    fn test_parse_json3() {
        let body = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 90000, "id": 1, "wpWinPosId": 1},
                {"tStartMs": 1200, "dDurationMs": 3400, "segs": [{"utf8": "hello "}, {"utf8": "world"}]},
                {"tStartMs": 4600, "dDurationMs": 10, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 4600, "dDurationMs": 2500, "segs": [{"utf8": "second\nline"}]}
            ]
        }"#;

        let segments = parse_json3(body).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "hello world");
        assert_eq!(segments[0].start, 1.2);
        assert_eq!(segments[0].duration, 3.4);
        assert_eq!(segments[1].text, "second line");
    }

    #[test]
    fn test_parse_json3_rejects_garbage() {
        assert!(parse_json3("<transcript/>").is_err());
    }

    #[test]
    fn test_video_info_tolerates_missing_fields() {
        let info: VideoInfo = serde_json::from_str(r#"{"title": "Lecture 1"}"#).unwrap();
        assert_eq!(info.title.as_deref(), Some("Lecture 1"));
        assert!(info.duration.is_none());
        assert!(info.subtitles.is_empty());
    }
}
