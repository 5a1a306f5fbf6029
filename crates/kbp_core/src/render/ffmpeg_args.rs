//! ffmpeg command options builder.
//!
//! Turns an [`EncodePlan`] into command-line tokens. Progress is requested
//! on stdout as `key=value` lines (`-progress pipe:1`).

use super::plan::{EncodePlan, Quality};

/// Builder for ffmpeg command-line options.
pub struct EncoderArgsBuilder<'a> {
    plan: &'a EncodePlan,
}

impl<'a> EncoderArgsBuilder<'a> {
    pub fn new(plan: &'a EncodePlan) -> Self {
        Self { plan }
    }

    /// Build the complete ffmpeg argument list (without the program name).
    pub fn build(&self) -> Vec<String> {
        let mut tokens: Vec<String> = ["-y", "-hide_banner", "-nostats", "-progress", "pipe:1"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for input in &self.plan.inputs {
            tokens.extend(input.options.iter().cloned());
            tokens.push("-i".to_string());
            tokens.push(input.path.to_string_lossy().to_string());
        }

        let graph = self.plan.graph.serialize();
        if let Some(filter_complex) = graph.filter_complex {
            tokens.push("-filter_complex".to_string());
            tokens.push(filter_complex);
        }
        tokens.push("-map".to_string());
        tokens.push(graph.video_map);
        if let Some(audio_map) = graph.audio_map {
            tokens.push("-map".to_string());
            tokens.push(audio_map);
        }

        self.add_video_options(&mut tokens);
        self.add_audio_options(&mut tokens);

        match self.plan.expected_duration {
            Some(total) => {
                tokens.push("-t".to_string());
                tokens.push(format!("{:.3}", total));
            }
            None => tokens.push("-shortest".to_string()),
        }

        tokens.push(self.plan.output_path.to_string_lossy().to_string());
        tokens
    }

    fn add_video_options(&self, tokens: &mut Vec<String>) {
        let output = &self.plan.output;
        let codec = output.video_codec.as_str();
        tokens.push("-c:v".to_string());
        tokens.push(codec.to_string());

        match output.quality {
            Quality::Level(crf) => {
                tokens.push("-crf".to_string());
                tokens.push(crf.to_string());
                // libvpx only honors crf as constant quality with a zero bitrate
                if codec == "libvpx-vp9" {
                    tokens.push("-b:v".to_string());
                    tokens.push("0".to_string());
                }
            }
            Quality::Lossless => tokens.extend(lossless_flags(codec).iter().map(|s| s.to_string())),
        }

        tokens.push("-pix_fmt".to_string());
        tokens.push(output.pixel_format.clone());
        tokens.push("-r".to_string());
        tokens.push(output.frame_rate.to_string());
    }

    fn add_audio_options(&self, tokens: &mut Vec<String>) {
        match &self.plan.output.audio {
            Some(audio) => {
                tokens.push("-c:a".to_string());
                tokens.push(audio.codec.clone());
                if let Some(bitrate) = &audio.bitrate {
                    tokens.push("-b:a".to_string());
                    tokens.push(bitrate.clone());
                }
            }
            None => tokens.push("-an".to_string()),
        }
    }
}

fn lossless_flags(codec: &str) -> &'static [&'static str] {
    match codec {
        "libx265" => &["-x265-params", "lossless=1"],
        "libvpx-vp9" => &["-lossless", "1"],
        "libaom-av1" => &["-aom-params", "lossless=1"],
        _ => &["-qp", "0"],
    }
}

/// Format tokens for pretty display (one option per line).
pub fn format_tokens_pretty(program: &str, tokens: &[String]) -> String {
    let mut result = format!("{} \\\n", program);
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let is_option = token.starts_with('-') && token.len() > 1;

        // The last token is the output path and always stands alone.
        if is_option && i + 2 < tokens.len() && !tokens[i + 1].starts_with('-') {
            result.push_str(&format!("  {} {} \\\n", token, quote(&tokens[i + 1])));
            i += 2;
        } else {
            result.push_str(&format!("  {} \\\n", quote(token)));
            i += 1;
        }
    }

    result.trim_end_matches([' ', '\\', '\n']).to_string()
}

fn quote(token: &str) -> String {
    if token.is_empty() || token.contains(|c: char| c.is_whitespace() || "'\"[];,\\".contains(c)) {
        format!("'{}'", token.replace('\'', "'\\''"))
    } else {
        token.to_string()
    }
}
